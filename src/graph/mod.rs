//! Graph entity storage and layout

pub mod layout;
pub mod store;

pub use store::{GraphStore, NodeId, PortDirection, PortId};
