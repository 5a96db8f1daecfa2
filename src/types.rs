//! Node type registry
//!
//! Holds the catalog of node types offered by the add-node menu and used by
//! the interpreter. Entries are immutable after registration, except for the
//! one-time patch that replaces source expressions with compiled programs.

use crate::expr::{self, Program};
use crate::graph::store::PortDirection;
use crate::value::{PortDataType, Value};
use egui::Color32;
use log::{error, info};

/// Context handed to native evaluation functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext {
    /// Milliseconds since the editor started, advancing every frame
    pub time_ms: f64,
}

/// Signature of a ready-made (non-compiled) evaluation function. Receives
/// resolved input values in input-port order, returns output values in
/// output-port order.
pub type NativeEvalFn = fn(&EvalContext, &[Value]) -> Vec<Value>;

/// How a node type computes its outputs.
#[derive(Debug, Clone)]
pub enum Evaluator {
    /// Pure value source: no inputs consumed, output ports keep whatever
    /// value is stored on them (edited literals included).
    Value,
    /// Native Rust function.
    Native(NativeEvalFn),
    /// Scalar expression awaiting compilation. Nodes of this type are never
    /// ready until [`TypeRegistry::compile_sources`] patches the entry.
    Source(String),
    /// Compiled expression program.
    Compiled(Program),
    /// Compilation failed; nodes of this type never become ready.
    Broken,
}

/// Template for one port in a node type definition.
#[derive(Debug, Clone)]
pub struct PortTemplate {
    pub label: String,
    pub direction: PortDirection,
    pub data_type: PortDataType,
    /// Initial value of the port; inputs without a default are only ready
    /// when connected.
    pub default: Option<Value>,
    /// Whether the interaction layer offers an inline text editor for it.
    pub editor: bool,
}

impl PortTemplate {
    pub fn input(label: &str, data_type: PortDataType, default: Option<Value>) -> Self {
        Self {
            label: label.to_string(),
            direction: PortDirection::Input,
            data_type,
            default,
            editor: false,
        }
    }

    pub fn output(label: &str, data_type: PortDataType, default: Option<Value>) -> Self {
        Self {
            label: label.to_string(),
            direction: PortDirection::Output,
            data_type,
            default,
            editor: false,
        }
    }

    pub fn with_editor(mut self) -> Self {
        self.editor = true;
        self
    }
}

/// Kind of live preview a node type renders below its port rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    None,
    /// Shows the resolved value of the first input port as text.
    Number,
    /// Plots an array-valued first input.
    Plot,
}

impl PreviewKind {
    /// Extra node height reserved for the preview area.
    pub fn height(&self) -> f32 {
        match self {
            PreviewKind::None => 0.0,
            PreviewKind::Number => crate::constants::preview::NUMBER_HEIGHT,
            PreviewKind::Plot => crate::constants::preview::PLOT_HEIGHT,
        }
    }
}

/// Definition of one node type.
#[derive(Debug, Clone)]
pub struct NodeTypeDef {
    /// Stable identifier used in serialized documents
    pub name: String,
    /// Title shown in the node's title bar and the add-node menu
    pub title: String,
    pub color: Color32,
    pub width: f32,
    pub ports: Vec<PortTemplate>,
    pub preview: PreviewKind,
    pub evaluator: Evaluator,
}

impl NodeTypeDef {
    /// Port templates for inputs, in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &PortTemplate> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
    }

    /// Port templates for outputs, in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &PortTemplate> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
    }
}

/// Index of a node type within the registry.
pub type TypeId = usize;

/// Catalog of available node types.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: Vec<NodeTypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type and returns its index.
    pub fn register(&mut self, def: NodeTypeDef) -> TypeId {
        self.types.push(def);
        self.types.len() - 1
    }

    /// Linear lookup by type name. The catalog is small, so no index.
    pub fn get(&self, name: &str) -> Option<(TypeId, &NodeTypeDef)> {
        self.types
            .iter()
            .enumerate()
            .find(|(_, t)| t.name == name)
    }

    pub fn by_id(&self, id: TypeId) -> &NodeTypeDef {
        &self.types[id]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeTypeDef> {
        self.types.iter()
    }

    /// Patches every `Source` entry into `Compiled` (or `Broken` on a
    /// compile error). Run once at startup before the first interpreter
    /// pass; until then, nodes of unpatched types are skipped.
    pub fn compile_sources(&mut self) {
        for def in &mut self.types {
            let source = match &def.evaluator {
                Evaluator::Source(src) => src.clone(),
                _ => continue,
            };
            match expr::compile(&source, &def.ports) {
                Ok(program) => {
                    info!("compiled expression for node type '{}'", def.name);
                    def.evaluator = Evaluator::Compiled(program);
                }
                Err(err) => {
                    error!("node type '{}' failed to compile: {}", def.name, err);
                    def.evaluator = Evaluator::Broken;
                }
            }
        }
    }
}
