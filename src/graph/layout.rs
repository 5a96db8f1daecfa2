//! Per-frame layout pass
//!
//! Recomputes every port's pin position from its owning node's current
//! position. Inputs pin to the left edge, outputs to the right edge, one
//! row per port below the title bar.

use super::store::{GraphStore, PortDirection};
use crate::constants::node as metrics;
use egui::Pos2;

/// Positions every live port of every live node.
pub fn layout_ports(store: &mut GraphStore) {
    let nodes: Vec<_> = store.live_nodes().collect();
    for node in nodes {
        let pos = store.node_pos(node);
        let width = store.node_size(node).x;
        for (row, port) in store.node_ports(node).into_iter().enumerate() {
            let py = pos.y
                + metrics::TITLE_HEIGHT
                + row as f32 * metrics::PORT_ROW_HEIGHT
                + 7.0;
            let px = match store.port_direction(port) {
                PortDirection::Input => pos.x + metrics::INPUT_PIN_INSET,
                PortDirection::Output => pos.x + width - metrics::OUTPUT_PIN_INSET,
            };
            store.set_port_pos(
                port,
                Pos2::new(
                    px + metrics::PIN_CENTER_OFFSET[0],
                    py + metrics::PIN_CENTER_OFFSET[1],
                ),
            );
        }
    }
}

/// Top-left corner of the pin sprite for a port, derived back from the
/// stored pin center.
pub fn pin_corner(store: &GraphStore, port: usize) -> Pos2 {
    let center = store.port_pos(port);
    Pos2::new(
        center.x - metrics::PIN_CENTER_OFFSET[0],
        center.y - metrics::PIN_CENTER_OFFSET[1],
    )
}
