//! Graph entity store
//!
//! Nodes and ports live in structure-of-arrays arenas keyed by stable
//! integer ids, with free-list reuse on deletion. Connections are not a
//! separate entity: an input port holds at most one upstream port reference
//! (`connected_to`) and an output port counts its downstream fan-out. That
//! keeps lookup trivial at the cost of a scan when enumerating every edge
//! touching a node.
//!
//! All lookups are linear scans; the store is not built for large graphs.

use crate::types::{NodeTypeDef, TypeId};
use crate::value::{PortDataType, Value};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Unique identifier for a node
pub type NodeId = usize;

/// Unique identifier for a port
pub type PortId = usize;

/// Direction of a port. Never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Structure-of-arrays storage for the whole graph.
#[derive(Debug, Default)]
pub struct GraphStore {
    // Node arrays, all indexed by NodeId
    node_alive: Vec<bool>,
    node_type: Vec<TypeId>,
    node_x: Vec<f32>,
    node_y: Vec<f32>,
    node_w: Vec<f32>,
    node_h: Vec<f32>,
    free_nodes: BinaryHeap<Reverse<NodeId>>,

    // Port arrays, all indexed by PortId
    port_alive: Vec<bool>,
    port_node: Vec<NodeId>,
    port_order: Vec<usize>,
    port_dir: Vec<PortDirection>,
    port_label: Vec<String>,
    port_type: Vec<PortDataType>,
    port_value: Vec<Option<Value>>,
    port_x: Vec<f32>,
    port_y: Vec<f32>,
    port_connected_to: Vec<Option<PortId>>,
    port_num_connections: Vec<u32>,
    free_ports: BinaryHeap<Reverse<PortId>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Node lifecycle ---------------------------------------------------

    /// Returns the smallest previously-freed node id, or grows the arrays
    /// by one row.
    pub fn allocate_node(&mut self) -> NodeId {
        if let Some(Reverse(id)) = self.free_nodes.pop() {
            self.node_alive[id] = true;
            return id;
        }
        let id = self.node_alive.len();
        self.node_alive.push(true);
        self.node_type.push(0);
        self.node_x.push(0.0);
        self.node_y.push(0.0);
        self.node_w.push(0.0);
        self.node_h.push(0.0);
        id
    }

    /// Places a node of the given type and instantiates one port per port
    /// template. Height follows from the title bar, the port rows and the
    /// type's preview area.
    pub fn add_node(&mut self, type_id: TypeId, def: &NodeTypeDef, x: f32, y: f32) -> NodeId {
        let id = self.allocate_node();
        self.node_type[id] = type_id;
        self.node_x[id] = x;
        self.node_y[id] = y;
        self.node_w[id] = def.width;
        self.node_h[id] = crate::constants::node::TITLE_HEIGHT
            + def.ports.len() as f32 * crate::constants::node::PORT_ROW_HEIGHT
            + def.preview.height();

        for (order, template) in def.ports.iter().enumerate() {
            self.add_port(
                id,
                order,
                template.direction,
                &template.label,
                template.data_type,
                template.default.clone(),
            );
        }

        debug!("added node {} of type '{}'", id, def.name);
        id
    }

    /// Marks the node deleted, severs every connection where it is source
    /// or destination, and frees its ports. Its id is reused by the next
    /// allocation.
    pub fn delete_node(&mut self, node: NodeId) {
        if !self.is_node_alive(node) {
            return;
        }

        // Detach every live input port fed by one of this node's outputs
        for port in 0..self.port_alive.len() {
            if !self.port_alive[port] {
                continue;
            }
            if let Some(upstream) = self.port_connected_to[port] {
                if self.port_node[upstream] == node {
                    self.disconnect(upstream, port);
                }
            }
        }

        // Free the node's own ports, detaching their upstream edges first
        for port in self.node_ports(node) {
            if let Some(upstream) = self.port_connected_to[port] {
                self.disconnect(upstream, port);
            }
            self.port_alive[port] = false;
            self.free_ports.push(Reverse(port));
        }

        self.node_alive[node] = false;
        self.free_nodes.push(Reverse(node));
        debug!("deleted node {}", node);
    }

    pub fn is_node_alive(&self, node: NodeId) -> bool {
        node < self.node_alive.len() && self.node_alive[node]
    }

    /// Live node ids in ascending order.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_alive.len()).filter(|&id| self.node_alive[id])
    }

    pub fn live_node_count(&self) -> usize {
        self.node_alive.iter().filter(|alive| **alive).count()
    }

    /// Upper bound over all node ids ever allocated (dead rows included).
    pub fn node_capacity(&self) -> usize {
        self.node_alive.len()
    }

    // Port lifecycle ---------------------------------------------------

    fn allocate_port(&mut self) -> PortId {
        if let Some(Reverse(id)) = self.free_ports.pop() {
            self.port_alive[id] = true;
            return id;
        }
        let id = self.port_alive.len();
        self.port_alive.push(true);
        self.port_node.push(0);
        self.port_order.push(0);
        self.port_dir.push(PortDirection::Input);
        self.port_label.push(String::new());
        self.port_type.push(PortDataType::Float32);
        self.port_value.push(None);
        self.port_x.push(0.0);
        self.port_y.push(0.0);
        self.port_connected_to.push(None);
        self.port_num_connections.push(0);
        id
    }

    pub fn add_port(
        &mut self,
        node: NodeId,
        order: usize,
        direction: PortDirection,
        label: &str,
        data_type: PortDataType,
        default: Option<Value>,
    ) -> PortId {
        let id = self.allocate_port();
        self.port_node[id] = node;
        self.port_order[id] = order;
        self.port_dir[id] = direction;
        self.port_label[id] = label.to_string();
        self.port_type[id] = data_type;
        self.port_value[id] = default;
        self.port_x[id] = 0.0;
        self.port_y[id] = 0.0;
        self.port_connected_to[id] = None;
        self.port_num_connections[id] = 0;
        id
    }

    /// Ports of a node in declaration order. Linear scan over all ports.
    pub fn node_ports(&self, node: NodeId) -> Vec<PortId> {
        let mut result: Vec<PortId> = (0..self.port_alive.len())
            .filter(|&p| self.port_alive[p] && self.port_node[p] == node)
            .collect();
        result.sort_by_key(|&p| self.port_order[p]);
        result
    }

    /// Linear scan restricted to the node's ports.
    pub fn find_port_by_label(&self, node: NodeId, label: &str) -> Option<PortId> {
        self.node_ports(node)
            .into_iter()
            .find(|&p| self.port_label[p] == label)
    }

    /// Resolved value of a named port: the connected upstream output's value
    /// if the port is a connected input, else the port's own value.
    pub fn get_port_value(&self, node: NodeId, label: &str) -> Option<&Value> {
        let port = self.find_port_by_label(node, label)?;
        let source = match self.port_connected_to[port] {
            Some(upstream) if self.port_dir[port] == PortDirection::Input => upstream,
            _ => port,
        };
        self.port_value[source].as_ref()
    }

    // Connections ------------------------------------------------------

    /// Shallow compatibility check: opposite directions only, no type
    /// matching. Matches the editor's permissive connect behavior.
    pub fn ports_compatible(&self, a: PortId, b: PortId) -> bool {
        self.port_dir[a] != self.port_dir[b]
    }

    /// Attaches an edge between two ports, either order. Silently refuses
    /// same-direction pairs and self-loops; an already-connected input has
    /// its previous edge detached first, so an input never holds two
    /// sources.
    pub fn connect(&mut self, a: PortId, b: PortId) {
        let (from, to) = if self.port_dir[a] == PortDirection::Output {
            (a, b)
        } else {
            (b, a)
        };
        if self.port_dir[from] != PortDirection::Output
            || self.port_dir[to] != PortDirection::Input
        {
            debug!("refusing connection between same-direction ports {} and {}", a, b);
            return;
        }
        if self.port_node[from] == self.port_node[to] {
            debug!("refusing self-connection on node {}", self.port_node[from]);
            return;
        }
        if let Some(previous) = self.port_connected_to[to] {
            self.disconnect(previous, to);
        }
        self.port_connected_to[to] = Some(from);
        self.port_num_connections[from] += 1;
    }

    /// Removes the edge, if exactly this edge exists.
    pub fn disconnect(&mut self, from: PortId, to: PortId) {
        if self.port_connected_to[to] == Some(from) {
            self.port_connected_to[to] = None;
            self.port_num_connections[from] =
                self.port_num_connections[from].saturating_sub(1);
        }
    }

    // Accessors --------------------------------------------------------

    pub fn node_type_id(&self, node: NodeId) -> TypeId {
        self.node_type[node]
    }

    pub fn node_pos(&self, node: NodeId) -> egui::Pos2 {
        egui::Pos2::new(self.node_x[node], self.node_y[node])
    }

    pub fn set_node_pos(&mut self, node: NodeId, pos: egui::Pos2) {
        self.node_x[node] = pos.x;
        self.node_y[node] = pos.y;
    }

    pub fn node_size(&self, node: NodeId) -> egui::Vec2 {
        egui::Vec2::new(self.node_w[node], self.node_h[node])
    }

    pub fn node_rect(&self, node: NodeId) -> egui::Rect {
        egui::Rect::from_min_size(self.node_pos(node), self.node_size(node))
    }

    pub fn is_port_alive(&self, port: PortId) -> bool {
        port < self.port_alive.len() && self.port_alive[port]
    }

    /// Live port ids in ascending order.
    pub fn live_ports(&self) -> impl Iterator<Item = PortId> + '_ {
        (0..self.port_alive.len()).filter(|&id| self.port_alive[id])
    }

    pub fn port_owner(&self, port: PortId) -> NodeId {
        self.port_node[port]
    }

    pub fn port_direction(&self, port: PortId) -> PortDirection {
        self.port_dir[port]
    }

    pub fn port_order(&self, port: PortId) -> usize {
        self.port_order[port]
    }

    pub fn port_label(&self, port: PortId) -> &str {
        &self.port_label[port]
    }

    pub fn port_data_type(&self, port: PortId) -> PortDataType {
        self.port_type[port]
    }

    pub fn port_value(&self, port: PortId) -> Option<&Value> {
        self.port_value[port].as_ref()
    }

    pub fn set_port_value(&mut self, port: PortId, value: Value) {
        self.port_value[port] = Some(value);
    }

    pub fn port_pos(&self, port: PortId) -> egui::Pos2 {
        egui::Pos2::new(self.port_x[port], self.port_y[port])
    }

    /// Set during the layout pass.
    pub fn set_port_pos(&mut self, port: PortId, pos: egui::Pos2) {
        self.port_x[port] = pos.x;
        self.port_y[port] = pos.y;
    }

    pub fn connected_to(&self, port: PortId) -> Option<PortId> {
        self.port_connected_to[port]
    }

    pub fn num_connections(&self, port: PortId) -> u32 {
        self.port_num_connections[port]
    }
}
