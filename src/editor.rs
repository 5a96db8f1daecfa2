//! Editor facade
//!
//! Owns the graph, the type registry and all per-frame machinery, and runs
//! one complete frame per [`Editor::tick`]: resolve last frame's hit
//! candidates, apply the interaction state machine, lay out pins, evaluate
//! the dataflow and draw. The host supplies pointer input and a
//! [`DrawSurface`] and does nothing else.

use crate::graph::layout;
use crate::graph::store::{GraphStore, NodeId};
use crate::interact::hit::{HitTarget, HitTester};
use crate::interact::state::{InteractionState, Operation};
use crate::interpreter::{self, RunReport};
use crate::render::{self, DrawSurface, MenuState};
use crate::serialize::{self, LoadError};
use crate::types::{EvalContext, TypeRegistry};
use egui::Vec2;
use log::info;
use std::time::Instant;

pub use crate::interact::state::FrameInput;

pub struct Editor {
    store: GraphStore,
    registry: TypeRegistry,
    state: InteractionState,
    hits: HitTester,
    menu: MenuState,
    report: RunReport,
    start: Instant,
}

impl Editor {
    pub fn new(mut registry: TypeRegistry) -> Self {
        registry.compile_sources();
        Self {
            store: GraphStore::new(),
            registry,
            state: InteractionState::new(),
            hits: HitTester::new(),
            menu: MenuState::default(),
            report: RunReport::default(),
            start: Instant::now(),
        }
    }

    /// Milliseconds since the editor was created. Drives the `time` node
    /// and the wire marker animation.
    pub fn time_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Evaluation report from the most recent tick.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Adds a node by type name. Returns `None` for an unregistered name.
    pub fn add_node(&mut self, name: &str, x: f32, y: f32) -> Option<NodeId> {
        let (type_id, def) = self.registry.get(name)?;
        Some(self.store.add_node(type_id, def, x, y))
    }

    /// Live text buffer of the open inline editor, if any.
    pub fn edit_buffer(&self) -> Option<&str> {
        self.state.editing.as_ref().map(|e| e.buffer.as_str())
    }

    /// Replaces the open inline editor's text. The host's text widget
    /// feeds keystrokes through here.
    pub fn set_edit_buffer(&mut self, text: &str) {
        if let Some(edit) = &mut self.state.editing {
            edit.buffer = text.to_string();
        }
    }

    /// Appends a character to the add-node menu's search filter.
    pub fn push_menu_char(&mut self, c: char) {
        if self.menu.open {
            self.menu.filter.push(c);
        }
    }

    pub fn pop_menu_char(&mut self) {
        self.menu.filter.pop();
    }

    pub fn save_string(&self) -> String {
        serialize::save_string(&self.store, &self.registry)
    }

    /// Replaces the graph with one loaded from JSON. On failure the current
    /// graph is left untouched.
    pub fn load_string(&mut self, json: &str) -> Result<(), LoadError> {
        let store = serialize::load_string(json, &self.registry)?;
        self.store = store;
        self.state = InteractionState::new();
        self.hits.clear_result();
        info!("loaded graph with {} nodes", self.store.live_node_count());
        Ok(())
    }

    /// Runs one frame: input, layout, evaluation, drawing.
    pub fn tick(&mut self, input: &FrameInput, surface: &mut dyn DrawSurface, canvas_size: Vec2) {
        self.hits.new_frame(input.mouse);

        let idle_before = self.state.operation == Operation::Idle;
        self.update_menu(input, idle_before);
        self.state.update(input, &mut self.hits, &mut self.store);

        layout::layout_ports(&mut self.store);

        let ctx = EvalContext {
            time_ms: self.time_ms(),
        };
        self.report = interpreter::run(&mut self.store, &self.registry, &ctx);

        render::draw_grid(surface, canvas_size);
        render::draw_connections(
            &self.store,
            &self.state,
            &self.hits,
            surface,
            ctx.time_ms,
        );
        render::draw_nodes(
            &self.store,
            &self.registry,
            &self.state,
            &mut self.hits,
            &self.report,
            surface,
        );
        render::draw_menu(&self.menu, &self.registry, &mut self.hits, surface);
    }

    /// Opens the add-node menu on an empty-canvas click and places a node
    /// when one of its rows is clicked.
    fn update_menu(&mut self, input: &FrameInput, idle_before: bool) {
        if !input.mouse_up {
            return;
        }
        if self.menu.open {
            if let Some(HitTarget::MenuItem(index)) = self.hits.result().map(|h| h.target) {
                let def = self.registry.by_id(index);
                let name = def.name.clone();
                self.add_node(&name, self.menu.pos.x, self.menu.pos.y);
                info!("menu added node '{}'", name);
            }
            self.menu.open = false;
            self.menu.filter.clear();
            return;
        }
        // A release that ends a drag or a wire gesture never opens the menu
        if idle_before && self.state.editing.is_none() && self.hits.result().is_none() {
            self.menu.open = true;
            self.menu.pos = input.mouse;
            self.menu.filter.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::render::NullSurface;
    use crate::value::Value;
    use egui::Pos2;

    const CANVAS: Vec2 = Vec2::new(800.0, 600.0);

    fn tick(editor: &mut Editor, input: FrameInput) {
        editor.tick(&input, &mut NullSurface, CANVAS);
    }

    fn idle_frame(editor: &mut Editor) {
        tick(
            editor,
            FrameInput {
                mouse: Pos2::new(-100.0, -100.0),
                ..Default::default()
            },
        );
    }

    #[test]
    fn test_number_flows_to_display() {
        let mut editor = Editor::new(catalog::builtin_registry());
        let number = editor.add_node("number", 10.0, 10.0).unwrap();
        let display = editor.add_node("displayNumber", 300.0, 120.0).unwrap();

        let out = editor.store().find_port_by_label(number, "value").unwrap();
        let input = editor.store().find_port_by_label(display, "value").unwrap();
        editor.store_mut().set_port_value(out, Value::Float(5.0));
        editor.store_mut().connect(out, input);

        idle_frame(&mut editor);
        assert!(editor.report().is_evaluated(display));
        assert_eq!(
            editor.store().get_port_value(display, "value"),
            Some(&Value::Float(5.0))
        );

        // Changing the literal propagates on the next frame
        editor.store_mut().set_port_value(out, Value::Float(7.0));
        idle_frame(&mut editor);
        assert_eq!(
            editor.store().get_port_value(display, "value"),
            Some(&Value::Float(7.0))
        );
    }

    #[test]
    fn test_empty_canvas_click_opens_menu_and_places_node() {
        let mut editor = Editor::new(catalog::builtin_registry());

        // Click on empty canvas: press, then release
        let spot = Pos2::new(400.0, 300.0);
        tick(
            &mut editor,
            FrameInput {
                mouse: spot,
                mouse_down: true,
                ..Default::default()
            },
        );
        tick(
            &mut editor,
            FrameInput {
                mouse: spot,
                mouse_up: true,
                ..Default::default()
            },
        );
        assert!(editor.menu.open);
        assert_eq!(editor.menu.pos, spot);

        // Hover the first menu row long enough for the hit to resolve,
        // then click it
        let first_row = Pos2::new(
            spot.x + 10.0,
            spot.y + crate::constants::menu::ROW_HEIGHT + 5.0,
        );
        tick(
            &mut editor,
            FrameInput {
                mouse: first_row,
                ..Default::default()
            },
        );
        tick(
            &mut editor,
            FrameInput {
                mouse: first_row,
                mouse_up: true,
                ..Default::default()
            },
        );
        assert!(!editor.menu.open);
        assert_eq!(editor.store().live_node_count(), 1);
    }

    #[test]
    fn test_failed_load_keeps_current_graph() {
        let mut editor = Editor::new(catalog::builtin_registry());
        editor.add_node("number", 10.0, 10.0).unwrap();

        assert!(editor.load_string("{\"version\":99,\"nodes\":[]}").is_err());
        assert_eq!(editor.store().live_node_count(), 1);
    }

    #[test]
    fn test_save_load_round_trip_through_editor() {
        let mut editor = Editor::new(catalog::builtin_registry());
        let number = editor.add_node("number", 10.0, 10.0).unwrap();
        let display = editor.add_node("displayNumber", 300.0, 120.0).unwrap();
        let out = editor.store().find_port_by_label(number, "value").unwrap();
        let input = editor.store().find_port_by_label(display, "value").unwrap();
        editor.store_mut().set_port_value(out, Value::Float(42.0));
        editor.store_mut().connect(out, input);

        let json = editor.save_string();
        let mut other = Editor::new(catalog::builtin_registry());
        other.load_string(&json).unwrap();

        idle_frame(&mut other);
        assert_eq!(
            other.store().get_port_value(display, "value"),
            Some(&Value::Float(42.0))
        );
    }
}
