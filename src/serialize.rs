//! Graph snapshot serialization
//!
//! Saves the graph as a portable JSON document and reconstructs it by type
//! lookup and label matching. Only two kinds of port state are worth
//! persisting: edited output literals and input connections; everything
//! else is restored from the type templates. A version mismatch or a
//! dangling reference aborts the load outright, because a partially wired
//! graph is worse than no graph.

use crate::graph::store::{GraphStore, NodeId, PortDirection};
use crate::types::TypeRegistry;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Document format version this build reads and writes.
pub const DOC_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot load graph: unsupported version {0}")]
    VersionMismatch(u32),
    #[error("cannot load graph: unknown node type '{0}'")]
    UnknownType(String),
    #[error("cannot load graph: reference to unknown node {0}")]
    UnknownNode(usize),
    #[error("cannot load graph: node {node} has no port labeled '{label}'")]
    UnknownPort { node: usize, label: String },
    #[error("cannot load graph: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reference to an upstream output port, by node id and port label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRef {
    #[serde(rename = "nodeId")]
    pub node_id: usize,
    pub label: String,
}

/// One serialized port: either an edited literal on an output, or a
/// connected input. Defaulted, unconnected ports are omitted entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortDoc {
    Connected {
        label: String,
        #[serde(rename = "connectedTo")]
        connected_to: ConnectionRef,
    },
    Literal {
        label: String,
        value: Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoc {
    pub id: usize,
    #[serde(rename = "type")]
    pub type_name: String,
    pub x: f32,
    pub y: f32,
    pub ports: Vec<PortDoc>,
}

/// The persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDoc {
    pub version: u32,
    pub nodes: Vec<NodeDoc>,
}

/// Snapshots the live graph into a document.
pub fn save(store: &GraphStore, registry: &TypeRegistry) -> GraphDoc {
    let mut nodes = Vec::new();

    for node in store.live_nodes() {
        let def = registry.by_id(store.node_type_id(node));
        let mut ports = Vec::new();

        for port in store.node_ports(node) {
            let template = &def.ports[store.port_order(port)];
            match store.port_direction(port) {
                PortDirection::Output if template.editor => {
                    // Only literals the user actually changed are saved
                    if let Some(value) = store.port_value(port) {
                        if template.default.as_ref() != Some(value) {
                            ports.push(PortDoc::Literal {
                                label: template.label.clone(),
                                value: value.clone(),
                            });
                        }
                    }
                }
                PortDirection::Input => {
                    if let Some(upstream) = store.connected_to(port) {
                        ports.push(PortDoc::Connected {
                            label: template.label.clone(),
                            connected_to: ConnectionRef {
                                node_id: store.port_owner(upstream),
                                label: store.port_label(upstream).to_string(),
                            },
                        });
                    }
                }
                _ => {}
            }
        }

        let pos = store.node_pos(node);
        nodes.push(NodeDoc {
            id: node,
            type_name: def.name.clone(),
            x: pos.x,
            y: pos.y,
            ports,
        });
    }

    GraphDoc {
        version: DOC_VERSION,
        nodes,
    }
}

/// Reconstructs a graph from a document. Returns a fresh store so a failed
/// load never leaves a half-built graph behind.
pub fn load(doc: &GraphDoc, registry: &TypeRegistry) -> Result<GraphStore, LoadError> {
    if doc.version != DOC_VERSION {
        return Err(LoadError::VersionMismatch(doc.version));
    }

    let mut store = GraphStore::new();
    let mut id_map: HashMap<usize, NodeId> = HashMap::new();

    // Nodes first, so connections can refer to any of them
    for node_doc in &doc.nodes {
        let (type_id, def) = registry
            .get(&node_doc.type_name)
            .ok_or_else(|| LoadError::UnknownType(node_doc.type_name.clone()))?;
        let node = store.add_node(type_id, def, node_doc.x, node_doc.y);
        id_map.insert(node_doc.id, node);
    }

    // Then wire connections and restore literals by label matching
    for node_doc in &doc.nodes {
        let node = id_map[&node_doc.id];
        for port_doc in &node_doc.ports {
            match port_doc {
                PortDoc::Connected {
                    label,
                    connected_to,
                } => {
                    let input = store.find_port_by_label(node, label).ok_or_else(|| {
                        LoadError::UnknownPort {
                            node: node_doc.id,
                            label: label.clone(),
                        }
                    })?;
                    let upstream_node = *id_map
                        .get(&connected_to.node_id)
                        .ok_or(LoadError::UnknownNode(connected_to.node_id))?;
                    let upstream = store
                        .find_port_by_label(upstream_node, &connected_to.label)
                        .ok_or_else(|| LoadError::UnknownPort {
                            node: connected_to.node_id,
                            label: connected_to.label.clone(),
                        })?;
                    store.connect(upstream, input);
                }
                PortDoc::Literal { label, value } => {
                    let port = store.find_port_by_label(node, label).ok_or_else(|| {
                        LoadError::UnknownPort {
                            node: node_doc.id,
                            label: label.clone(),
                        }
                    })?;
                    let coerced = value.clone().coerce_to(store.port_data_type(port));
                    store.set_port_value(port, coerced);
                }
            }
        }
    }

    Ok(store)
}

/// Serializes the graph to a pretty JSON string.
pub fn save_string(store: &GraphStore, registry: &TypeRegistry) -> String {
    serde_json::to_string_pretty(&save(store, registry))
        .expect("graph document serialization cannot fail")
}

/// Parses and reconstructs a graph from a JSON string.
pub fn load_string(json: &str, registry: &TypeRegistry) -> Result<GraphStore, LoadError> {
    let doc: GraphDoc = serde_json::from_str(json)?;
    load(&doc, registry)
}

/// Timer gate for periodic saving: at most one save per interval. The host
/// calls [`Autosave::due`] once per qualifying frame and saves when it
/// returns true.
#[derive(Debug)]
pub struct Autosave {
    last_save: Option<Instant>,
    interval: Duration,
}

impl Autosave {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(
            crate::constants::autosave::INTERVAL_MS,
        ))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            last_save: None,
            interval,
        }
    }

    pub fn due(&mut self) -> bool {
        let now = Instant::now();
        match self.last_save {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_save = Some(now);
                true
            }
        }
    }
}

impl Default for Autosave {
    fn default() -> Self {
        Self::new()
    }
}
