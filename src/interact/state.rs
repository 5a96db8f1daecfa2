//! Interaction state machine
//!
//! Translates raw pointer and keyboard state plus the previous frame's
//! hit-test result into graph mutations, one discrete operation at a time.
//! Dragging and connecting are exclusive operations; inline editing is a
//! sub-state that owns keyboard focus but coexists with the idle state.

use super::hit::{HitTarget, HitTester};
use crate::graph::store::{GraphStore, NodeId, PortDirection, PortId};
use crate::value::Value;
use egui::Pos2;
use log::debug;

/// Pointer and keyboard state for one frame. `mouse_down` / `mouse_up` are
/// edge events (true only on the frame they happen), not button level.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    pub mouse: Pos2,
    pub mouse_down: bool,
    pub mouse_up: bool,
    pub delete_pressed: bool,
}

/// The current exclusive operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Idle,
    Dragging {
        node: NodeId,
        start_node: Pos2,
        start_mouse: Pos2,
    },
    Connecting {
        /// Fixed endpoint of the in-progress wire; the other end follows
        /// the pointer until release.
        anchor: PortId,
    },
}

/// Inline editor sub-state for one port.
#[derive(Debug, Clone)]
pub struct EditState {
    pub port: PortId,
    pub buffer: String,
}

#[derive(Debug)]
pub struct InteractionState {
    pub operation: Operation,
    pub editing: Option<EditState>,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            operation: Operation::Idle,
            editing: None,
        }
    }
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the state machine by one frame, mutating the store as the
    /// user's gesture dictates.
    pub fn update(&mut self, input: &FrameInput, hits: &mut HitTester, store: &mut GraphStore) {
        self.update_editing(input, hits, store);

        if self.operation == Operation::Idle {
            self.check_start_connecting(input, hits, store);
        }
        if self.operation == Operation::Idle {
            self.check_start_dragging(input, hits, store);
        }

        match self.operation {
            Operation::Dragging { .. } => self.drag(input, store),
            Operation::Connecting { .. } => {
                self.retarget_hover(hits, store);
                self.finish_connecting(input, hits, store);
            }
            Operation::Idle => {
                if input.delete_pressed {
                    if let Some(HitTarget::Node(node)) = hits.result().map(|h| h.target) {
                        store.delete_node(node);
                        hits.clear_result();
                        // The editor may have belonged to a deleted port
                        if let Some(edit) = &self.editing {
                            if !store.is_port_alive(edit.port) {
                                self.editing = None;
                            }
                        }
                    }
                }
            }
        }
    }

    // Editing ----------------------------------------------------------

    fn update_editing(&mut self, input: &FrameInput, hits: &HitTester, store: &mut GraphStore) {
        if input.mouse_down {
            match hits.result().map(|h| h.target) {
                Some(HitTarget::Editor(port)) => {
                    let editing_other = self
                        .editing
                        .as_ref()
                        .map(|e| e.port != port)
                        .unwrap_or(false);
                    if editing_other {
                        self.commit_editing(store);
                    }
                }
                _ => self.commit_editing(store),
            }
        }
        if input.mouse_up {
            if let Some(HitTarget::Editor(port)) = hits.result().map(|h| h.target) {
                if self.editing.is_none() && store.is_port_alive(port) {
                    let buffer = store
                        .port_value(port)
                        .map(Value::display)
                        .unwrap_or_default();
                    self.editing = Some(EditState { port, buffer });
                }
            }
        }
    }

    /// Closes the active editor, parsing its text back into the port's
    /// declared type. Text that fails to parse is dropped silently and the
    /// previous value stays.
    pub fn commit_editing(&mut self, store: &mut GraphStore) {
        let Some(edit) = self.editing.take() else {
            return;
        };
        if !store.is_port_alive(edit.port) {
            return;
        }
        match Value::parse_typed(&edit.buffer, store.port_data_type(edit.port)) {
            Some(value) => store.set_port_value(edit.port, value),
            None => debug!(
                "discarding unparsable edit '{}' on port {}",
                edit.buffer, edit.port
            ),
        }
    }

    // Connecting -------------------------------------------------------

    fn check_start_connecting(
        &mut self,
        input: &FrameInput,
        hits: &HitTester,
        store: &mut GraphStore,
    ) {
        if !input.mouse_down {
            return;
        }
        let Some(HitTarget::Port(port)) = hits.result().map(|h| h.target) else {
            return;
        };

        // Grabbing a connected input picks the existing wire up: the edge
        // is detached and its source end becomes the anchor.
        let anchor = match store.connected_to(port) {
            Some(upstream) if store.port_direction(port) == PortDirection::Input => {
                store.disconnect(upstream, port);
                upstream
            }
            _ => port,
        };
        self.operation = Operation::Connecting { anchor };
    }

    /// While connecting, a hovered node body stands in for its single
    /// compatible port. More than one compatible port is ambiguous and
    /// counts as no match.
    fn retarget_hover(&mut self, hits: &mut HitTester, store: &GraphStore) {
        let Operation::Connecting { anchor } = self.operation else {
            return;
        };
        match hits.result().map(|h| h.target) {
            Some(HitTarget::Port(_)) | None => {}
            Some(HitTarget::Node(node)) => {
                let mut compatible = None;
                for port in store.node_ports(node) {
                    if store.ports_compatible(port, anchor) {
                        if compatible.is_some() {
                            compatible = None;
                            break;
                        }
                        compatible = Some(port);
                    }
                }
                match compatible {
                    Some(port) => hits.retarget(HitTarget::Port(port)),
                    None => hits.clear_result(),
                }
            }
            Some(_) => hits.clear_result(),
        }
    }

    fn finish_connecting(
        &mut self,
        input: &FrameInput,
        hits: &HitTester,
        store: &mut GraphStore,
    ) {
        let Operation::Connecting { anchor } = self.operation else {
            return;
        };
        if !input.mouse_up {
            return;
        }
        if let Some(HitTarget::Port(target)) = hits.result().map(|h| h.target) {
            if store.ports_compatible(anchor, target) {
                store.connect(anchor, target);
            }
        }
        // Incompatible or empty drops discard the tentative wire silently
        self.operation = Operation::Idle;
    }

    // Dragging ---------------------------------------------------------

    fn check_start_dragging(
        &mut self,
        input: &FrameInput,
        hits: &HitTester,
        store: &GraphStore,
    ) {
        if !input.mouse_down {
            return;
        }
        let Some(HitTarget::Node(node)) = hits.result().map(|h| h.target) else {
            return;
        };
        self.operation = Operation::Dragging {
            node,
            start_node: store.node_pos(node),
            start_mouse: input.mouse,
        };
    }

    fn drag(&mut self, input: &FrameInput, store: &mut GraphStore) {
        let Operation::Dragging {
            node,
            start_node,
            start_mouse,
        } = self.operation
        else {
            return;
        };
        if store.is_node_alive(node) {
            store.set_node_pos(node, start_node + (input.mouse - start_mouse));
        }
        if input.mouse_up {
            self.operation = Operation::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::types::TypeRegistry;
    use egui::{Rect, Vec2};

    fn setup() -> (GraphStore, TypeRegistry, InteractionState, HitTester) {
        (
            GraphStore::new(),
            catalog::builtin_registry(),
            InteractionState::new(),
            HitTester::new(),
        )
    }

    fn add(store: &mut GraphStore, registry: &TypeRegistry, name: &str, x: f32, y: f32) -> NodeId {
        let (type_id, def) = registry.get(name).unwrap();
        store.add_node(type_id, def, x, y)
    }

    /// Simulates last frame's draw pass having recorded `target` under the
    /// pointer, then starts the next frame at `mouse`.
    fn hover(hits: &mut HitTester, mouse: Pos2, target: Option<HitTarget>) {
        hits.new_frame(mouse);
        if let Some(target) = target {
            hits.record(target, Rect::from_center_size(mouse, Vec2::new(10.0, 10.0)));
        }
        hits.new_frame(mouse);
    }

    #[test]
    fn test_drag_commits_relative_offset() {
        let (mut store, registry, mut state, mut hits) = setup();
        let node = add(&mut store, &registry, "number", 10.0, 10.0);

        hover(&mut hits, Pos2::new(50.0, 20.0), Some(HitTarget::Node(node)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(50.0, 20.0),
                mouse_down: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert!(matches!(state.operation, Operation::Dragging { .. }));

        state.update(
            &FrameInput {
                mouse: Pos2::new(80.0, 45.0),
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        state.update(
            &FrameInput {
                mouse: Pos2::new(80.0, 45.0),
                mouse_up: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert_eq!(state.operation, Operation::Idle);
        assert_eq!(store.node_pos(node), Pos2::new(40.0, 35.0));
    }

    #[test]
    fn test_connect_two_ports() {
        let (mut store, registry, mut state, mut hits) = setup();
        let number = add(&mut store, &registry, "number", 10.0, 10.0);
        let display = add(&mut store, &registry, "displayNumber", 300.0, 120.0);
        let out = store.find_port_by_label(number, "value").unwrap();
        let input = store.find_port_by_label(display, "value").unwrap();

        hover(&mut hits, Pos2::new(100.0, 50.0), Some(HitTarget::Port(out)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(100.0, 50.0),
                mouse_down: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert_eq!(state.operation, Operation::Connecting { anchor: out });

        hover(&mut hits, Pos2::new(305.0, 160.0), Some(HitTarget::Port(input)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(305.0, 160.0),
                mouse_up: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert_eq!(state.operation, Operation::Idle);
        assert_eq!(store.connected_to(input), Some(out));
    }

    #[test]
    fn test_grabbing_connected_input_picks_up_wire() {
        let (mut store, registry, mut state, mut hits) = setup();
        let number = add(&mut store, &registry, "number", 10.0, 10.0);
        let display = add(&mut store, &registry, "displayNumber", 300.0, 120.0);
        let out = store.find_port_by_label(number, "value").unwrap();
        let input = store.find_port_by_label(display, "value").unwrap();
        store.connect(out, input);

        hover(&mut hits, Pos2::new(305.0, 160.0), Some(HitTarget::Port(input)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(305.0, 160.0),
                mouse_down: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );

        // The edge is detached and the wire dangles from its source end
        assert_eq!(state.operation, Operation::Connecting { anchor: out });
        assert_eq!(store.connected_to(input), None);

        // Releasing over nothing discards the wire
        hover(&mut hits, Pos2::new(500.0, 400.0), None);
        state.update(
            &FrameInput {
                mouse: Pos2::new(500.0, 400.0),
                mouse_up: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert_eq!(state.operation, Operation::Idle);
        assert_eq!(store.connected_to(input), None);
    }

    #[test]
    fn test_node_body_stands_in_for_single_compatible_port() {
        let (mut store, registry, mut state, mut hits) = setup();
        let number = add(&mut store, &registry, "number", 10.0, 10.0);
        let display = add(&mut store, &registry, "displayNumber", 300.0, 120.0);
        let out = store.find_port_by_label(number, "value").unwrap();
        let input = store.find_port_by_label(display, "value").unwrap();

        hover(&mut hits, Pos2::new(100.0, 50.0), Some(HitTarget::Port(out)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(100.0, 50.0),
                mouse_down: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );

        // Hovering the display node's body: it has exactly one input port
        hover(&mut hits, Pos2::new(350.0, 150.0), Some(HitTarget::Node(display)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(350.0, 150.0),
                mouse_up: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert_eq!(store.connected_to(input), Some(out));
    }

    #[test]
    fn test_ambiguous_node_body_refuses_connection() {
        let (mut store, registry, mut state, mut hits) = setup();
        let number = add(&mut store, &registry, "number", 10.0, 10.0);
        let adder = add(&mut store, &registry, "add", 300.0, 120.0);
        let out = store.find_port_by_label(number, "value").unwrap();

        hover(&mut hits, Pos2::new(100.0, 50.0), Some(HitTarget::Port(out)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(100.0, 50.0),
                mouse_down: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );

        // The add node has two compatible inputs: ambiguous, so no edge
        hover(&mut hits, Pos2::new(350.0, 150.0), Some(HitTarget::Node(adder)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(350.0, 150.0),
                mouse_up: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        let a = store.find_port_by_label(adder, "a").unwrap();
        let b = store.find_port_by_label(adder, "b").unwrap();
        assert_eq!(store.connected_to(a), None);
        assert_eq!(store.connected_to(b), None);
        assert_eq!(store.num_connections(out), 0);
    }

    #[test]
    fn test_delete_key_removes_hot_node() {
        let (mut store, registry, mut state, mut hits) = setup();
        let number = add(&mut store, &registry, "number", 10.0, 10.0);
        let display = add(&mut store, &registry, "displayNumber", 300.0, 120.0);
        let out = store.find_port_by_label(number, "value").unwrap();
        let input = store.find_port_by_label(display, "value").unwrap();
        store.connect(out, input);

        hover(&mut hits, Pos2::new(50.0, 30.0), Some(HitTarget::Node(number)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(50.0, 30.0),
                delete_pressed: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert!(!store.is_node_alive(number));
        assert_eq!(store.connected_to(input), None);
    }

    #[test]
    fn test_edit_open_commit_and_parse_fallback() {
        let (mut store, registry, mut state, mut hits) = setup();
        let number = add(&mut store, &registry, "number", 10.0, 10.0);
        let out = store.find_port_by_label(number, "value").unwrap();
        store.set_port_value(out, Value::Float(5.0));

        // Pointer-up over the editor region opens it
        hover(&mut hits, Pos2::new(60.0, 47.0), Some(HitTarget::Editor(out)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(60.0, 47.0),
                mouse_up: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert_eq!(state.editing.as_ref().map(|e| e.port), Some(out));
        assert_eq!(state.editing.as_ref().unwrap().buffer, "5");

        // Typed text commits on close
        state.editing.as_mut().unwrap().buffer = "7.5".to_string();
        hover(&mut hits, Pos2::new(500.0, 400.0), None);
        state.update(
            &FrameInput {
                mouse: Pos2::new(500.0, 400.0),
                mouse_down: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert!(state.editing.is_none());
        assert_eq!(store.port_value(out), Some(&Value::Float(7.5)));

        // Unparsable text falls back to the previous value silently
        hover(&mut hits, Pos2::new(60.0, 47.0), Some(HitTarget::Editor(out)));
        state.update(
            &FrameInput {
                mouse: Pos2::new(60.0, 47.0),
                mouse_up: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        state.editing.as_mut().unwrap().buffer = "not a number".to_string();
        hover(&mut hits, Pos2::new(500.0, 400.0), None);
        state.update(
            &FrameInput {
                mouse: Pos2::new(500.0, 400.0),
                mouse_down: true,
                ..Default::default()
            },
            &mut hits,
            &mut store,
        );
        assert!(state.editing.is_none());
        assert_eq!(store.port_value(out), Some(&Value::Float(7.5)));
    }
}
