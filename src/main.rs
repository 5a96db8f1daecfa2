//! Headless demo
//!
//! Builds the classic two-sources-two-displays graph, runs a few frames
//! through the full pipeline on a [`NullSurface`] and logs the resolved
//! values, then prints the autosaved document.

use egui::Vec2;
use log::info;
use nodecanvas::{Autosave, Editor, FrameInput, NullSurface, Value};

fn main() {
    env_logger::init();

    let mut editor = Editor::new(nodecanvas::catalog::builtin_registry());
    let mut autosave = Autosave::new();

    let first = editor.add_node("number", 10.0, 10.0).expect("builtin type");
    let second = editor.add_node("number", 10.0, 100.0).expect("builtin type");
    let display_a = editor
        .add_node("displayNumber", 300.0, 120.0)
        .expect("builtin type");
    let display_b = editor
        .add_node("displayNumber", 200.0, 220.0)
        .expect("builtin type");

    {
        let store = editor.store_mut();
        let out_first = store.find_port_by_label(first, "value").expect("port");
        let out_second = store.find_port_by_label(second, "value").expect("port");
        let in_a = store.find_port_by_label(display_a, "value").expect("port");
        let in_b = store.find_port_by_label(display_b, "value").expect("port");
        store.set_port_value(out_first, Value::Float(5.0));
        store.set_port_value(out_second, Value::Float(12.0));
        store.connect(out_first, in_a);
        store.connect(out_second, in_b);
    }

    let canvas = Vec2::new(800.0, 600.0);
    let mut surface = NullSurface;
    for frame in 0..5 {
        editor.tick(&FrameInput::default(), &mut surface, canvas);
        info!(
            "frame {}: evaluated {} nodes in {} passes",
            frame,
            editor.report().num_evaluated,
            editor.report().passes
        );
    }

    for (name, display) in [("a", display_a), ("b", display_b)] {
        let value = editor.store().get_port_value(display, "value");
        info!("display {}: {:?}", name, value);
    }

    if autosave.due() {
        println!("{}", editor.save_string());
    }
}
