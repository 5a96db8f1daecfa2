//! Nodecanvas core library
//!
//! Runtime for a visual node-graph editor: an entity store holding nodes,
//! ports and connections, a registry of node types, an expression compiler
//! with automatic vectorization over array ports, a per-frame dataflow
//! interpreter, and the interaction state machine that turns pointer input
//! into graph edits. Rendering happens through the [`render::DrawSurface`]
//! trait so the whole pipeline runs headlessly in tests.

pub mod catalog;
pub mod constants;
pub mod editor;
pub mod expr;
pub mod graph;
pub mod interact;
pub mod interpreter;
pub mod render;
pub mod serialize;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use editor::{Editor, FrameInput};
pub use graph::store::{GraphStore, NodeId, PortDirection, PortId};
pub use interpreter::RunReport;
pub use render::{DrawSurface, NullSurface};
pub use serialize::{Autosave, GraphDoc, LoadError};
pub use types::{EvalContext, Evaluator, NodeTypeDef, PortTemplate, TypeRegistry};
pub use value::{PortDataType, Value};
