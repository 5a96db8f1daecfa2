//! Built-in node type catalog
//!
//! The types offered by a fresh editor: literal sources, display sinks and
//! a handful of expression-compiled arithmetic types over array ports.

use crate::types::{
    EvalContext, Evaluator, NodeTypeDef, PortTemplate, PreviewKind, TypeRegistry,
};
use crate::value::{PortDataType, Value};
use egui::Color32;

fn time_eval(ctx: &EvalContext, _inputs: &[Value]) -> Vec<Value> {
    vec![Value::Float(ctx.time_ms as f32)]
}

fn ramp_eval(_ctx: &EvalContext, inputs: &[Value]) -> Vec<Value> {
    let count = inputs
        .first()
        .and_then(Value::as_f32)
        .unwrap_or(0.0)
        .max(0.0) as usize;
    vec![Value::FloatArray((0..count).map(|i| i as f32).collect())]
}

/// Registry with every built-in type registered and all source expressions
/// compiled.
pub fn builtin_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();

    registry.register(NodeTypeDef {
        name: "number".to_string(),
        title: "Number".to_string(),
        color: Color32::from_rgb(0xcc, 0xe0, 0x0e),
        width: 100.0,
        ports: vec![PortTemplate::output(
            "value",
            PortDataType::Float32,
            Some(Value::Float(0.0)),
        )
        .with_editor()],
        preview: PreviewKind::None,
        evaluator: Evaluator::Value,
    });

    registry.register(NodeTypeDef {
        name: "displayNumber".to_string(),
        title: "Display".to_string(),
        color: Color32::from_rgb(0xe0, 0xcc, 0x0e),
        width: 120.0,
        ports: vec![PortTemplate::input("value", PortDataType::Float32, None)],
        preview: PreviewKind::Number,
        evaluator: Evaluator::Value,
    });

    registry.register(NodeTypeDef {
        name: "time".to_string(),
        title: "Time".to_string(),
        color: Color32::from_rgb(0x0e, 0xcc, 0xe0),
        width: 100.0,
        ports: vec![PortTemplate::output("ms", PortDataType::Float32, None)],
        preview: PreviewKind::None,
        evaluator: Evaluator::Native(time_eval),
    });

    registry.register(NodeTypeDef {
        name: "ramp".to_string(),
        title: "Ramp".to_string(),
        color: Color32::from_rgb(0x8e, 0xe0, 0x4e),
        width: 110.0,
        ports: vec![
            PortTemplate::input("count", PortDataType::Float32, Some(Value::Float(8.0)))
                .with_editor(),
            PortTemplate::output("values", PortDataType::Float32Array, None),
        ],
        preview: PreviewKind::None,
        evaluator: Evaluator::Native(ramp_eval),
    });

    registry.register(NodeTypeDef {
        name: "add".to_string(),
        title: "Add".to_string(),
        color: Color32::from_rgb(0xe0, 0x8e, 0x2e),
        width: 100.0,
        ports: vec![
            PortTemplate::input("a", PortDataType::Float32Array, Some(Value::Float(0.0))),
            PortTemplate::input("b", PortDataType::Float32Array, Some(Value::Float(0.0))),
            PortTemplate::output("c", PortDataType::Float32Array, None),
        ],
        preview: PreviewKind::None,
        evaluator: Evaluator::Source("c = a + b;".to_string()),
    });

    registry.register(NodeTypeDef {
        name: "multiply".to_string(),
        title: "Multiply".to_string(),
        color: Color32::from_rgb(0xe0, 0x6e, 0x2e),
        width: 100.0,
        ports: vec![
            PortTemplate::input("a", PortDataType::Float32Array, Some(Value::Float(0.0))),
            PortTemplate::input("b", PortDataType::Float32Array, Some(Value::Float(1.0))),
            PortTemplate::output("c", PortDataType::Float32Array, None),
        ],
        preview: PreviewKind::None,
        evaluator: Evaluator::Source("c = a * b;".to_string()),
    });

    registry.register(NodeTypeDef {
        name: "sine".to_string(),
        title: "Sine".to_string(),
        color: Color32::from_rgb(0xbe, 0x4e, 0xe0),
        width: 100.0,
        ports: vec![
            PortTemplate::input("x", PortDataType::Float32Array, Some(Value::Float(0.0))),
            PortTemplate::output("y", PortDataType::Float32Array, None),
        ],
        preview: PreviewKind::Plot,
        evaluator: Evaluator::Source("y = sin(x);".to_string()),
    });

    registry.compile_sources();
    registry
}
