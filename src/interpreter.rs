//! Dataflow evaluation engine
//!
//! Evaluates every node whose inputs are fully resolved, propagates values
//! along connections, and repeats until a full pass makes no progress. The
//! pass count is capped at the live node count, so a connection cycle leaves
//! its nodes permanently un-evaluated instead of hanging the frame.
//!
//! Evaluation is from scratch every call: no dirty tracking, no memoization.
//! A frame-varying source (like the `time` node) is simply re-read each run.

use crate::graph::store::{GraphStore, NodeId, PortDirection};
use crate::types::{EvalContext, Evaluator, TypeRegistry};
use crate::value::Value;
use log::warn;

/// Outcome of one interpreter run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    evaluated: Vec<bool>,
    pub num_evaluated: usize,
    pub passes: usize,
}

impl RunReport {
    /// Whether the node finished evaluation this run. False for nodes on a
    /// cycle, behind a cycle, or of a type with no usable evaluator; their
    /// previews show a not-ready sentinel.
    pub fn is_evaluated(&self, node: NodeId) -> bool {
        self.evaluated.get(node).copied().unwrap_or(false)
    }
}

/// Runs the interpreter to its fixed point for this frame.
pub fn run(store: &mut GraphStore, registry: &TypeRegistry, ctx: &EvalContext) -> RunReport {
    let mut report = RunReport {
        evaluated: vec![false; store.node_capacity()],
        num_evaluated: 0,
        passes: 0,
    };

    let live_count = store.live_node_count();
    let max_passes = live_count.max(1);

    for _ in 0..max_passes {
        report.passes += 1;
        let mut progressed = false;

        let nodes: Vec<NodeId> = store.live_nodes().collect();
        for node in nodes {
            if report.evaluated[node] {
                continue;
            }
            if try_evaluate(store, registry, ctx, node, &report.evaluated) {
                report.evaluated[node] = true;
                report.num_evaluated += 1;
                progressed = true;
            }
        }

        if !progressed || report.num_evaluated == live_count {
            break;
        }
    }

    report
}

/// Attempts to evaluate a single node; returns true if it is now evaluated.
fn try_evaluate(
    store: &mut GraphStore,
    registry: &TypeRegistry,
    ctx: &EvalContext,
    node: NodeId,
    evaluated: &[bool],
) -> bool {
    let def = registry.by_id(store.node_type_id(node));

    // A type whose expression has not been compiled (or failed to) never
    // becomes ready; its nodes are skipped every pass.
    if matches!(def.evaluator, Evaluator::Source(_) | Evaluator::Broken) {
        return false;
    }

    // Ready iff every input is either fed by an already-evaluated node or
    // unconnected with a usable default.
    let ports = store.node_ports(node);
    let mut inputs: Vec<Value> = Vec::new();
    for &port in &ports {
        if store.port_direction(port) != PortDirection::Input {
            continue;
        }
        match store.connected_to(port) {
            Some(upstream) => {
                if !evaluated[store.port_owner(upstream)] {
                    return false;
                }
                match store.port_value(upstream) {
                    Some(value) => inputs.push(value.clone()),
                    None => return false,
                }
            }
            None => match store.port_value(port) {
                Some(value) => inputs.push(value.clone()),
                None => return false,
            },
        }
    }

    let outputs = match &def.evaluator {
        // Pure value source: stored output values pass through untouched.
        Evaluator::Value => return true,
        Evaluator::Native(f) => f(ctx, &inputs),
        Evaluator::Compiled(program) => match program.run(&inputs) {
            Ok(outputs) => outputs,
            Err(err) => {
                warn!("node {} ('{}') failed to evaluate: {}", node, def.name, err);
                return false;
            }
        },
        Evaluator::Source(_) | Evaluator::Broken => unreachable!(),
    };

    // Write results back onto output ports in declaration order.
    let output_ports: Vec<_> = ports
        .iter()
        .copied()
        .filter(|&p| store.port_direction(p) == PortDirection::Output)
        .collect();
    for (port, value) in output_ports.into_iter().zip(outputs) {
        store.set_port_value(port, value);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::graph::store::PortId;
    use crate::types::{NodeTypeDef, PortTemplate, PreviewKind, TypeRegistry};
    use crate::value::PortDataType;
    use egui::Color32;

    fn add(store: &mut GraphStore, registry: &TypeRegistry, name: &str) -> NodeId {
        let (type_id, def) = registry.get(name).unwrap();
        store.add_node(type_id, def, 0.0, 0.0)
    }

    fn port(store: &GraphStore, node: NodeId, label: &str) -> PortId {
        store.find_port_by_label(node, label).unwrap()
    }

    #[test]
    fn test_number_feeds_display() {
        let registry = catalog::builtin_registry();
        let mut store = GraphStore::new();
        let number = add(&mut store, &registry, "number");
        let display = add(&mut store, &registry, "displayNumber");

        store.set_port_value(port(&store, number, "value"), Value::Float(5.0));
        store.connect(
            port(&store, number, "value"),
            port(&store, display, "value"),
        );

        let report = run(&mut store, &registry, &EvalContext::default());
        assert!(report.is_evaluated(display));
        assert_eq!(
            store.get_port_value(display, "value"),
            Some(&Value::Float(5.0))
        );

        // No dirty marking needed: editing the literal and re-running is
        // enough to propagate the new value.
        store.set_port_value(port(&store, number, "value"), Value::Float(7.0));
        run(&mut store, &registry, &EvalContext::default());
        assert_eq!(
            store.get_port_value(display, "value"),
            Some(&Value::Float(7.0))
        );
    }

    #[test]
    fn test_diamond_evaluates_every_node_once() {
        let registry = catalog::builtin_registry();
        let mut store = GraphStore::new();
        let source = add(&mut store, &registry, "number");
        let left = add(&mut store, &registry, "add");
        let right = add(&mut store, &registry, "multiply");
        let join = add(&mut store, &registry, "add");

        store.set_port_value(port(&store, source, "value"), Value::Float(2.0));
        let out = port(&store, source, "value");
        store.connect(out, port(&store, left, "a"));
        store.connect(out, port(&store, right, "a"));
        store.set_port_value(port(&store, right, "b"), Value::Float(3.0));
        store.connect(port(&store, left, "c"), port(&store, join, "a"));
        store.connect(port(&store, right, "c"), port(&store, join, "b"));

        let report = run(&mut store, &registry, &EvalContext::default());
        assert_eq!(report.num_evaluated, 4);
        // left: 2 + 0, right: 2 * 3, join: 2 + 6
        assert_eq!(store.get_port_value(join, "c"), Some(&Value::Float(8.0)));
    }

    #[test]
    fn test_cycle_contained_within_pass_cap() {
        let registry = catalog::builtin_registry();
        let mut store = GraphStore::new();
        let a = add(&mut store, &registry, "add");
        let b = add(&mut store, &registry, "add");

        store.connect(port(&store, a, "c"), port(&store, b, "a"));
        store.connect(port(&store, b, "c"), port(&store, a, "a"));

        let report = run(&mut store, &registry, &EvalContext::default());
        assert!(!report.is_evaluated(a));
        assert!(!report.is_evaluated(b));
        assert!(report.passes <= store.live_node_count().max(1));
    }

    #[test]
    fn test_unpatched_source_type_is_skipped() {
        let mut registry = TypeRegistry::new();
        registry.register(NodeTypeDef {
            name: "pending".to_string(),
            title: "Pending".to_string(),
            color: Color32::from_rgb(60, 60, 60),
            width: 100.0,
            ports: vec![PortTemplate::output("y", PortDataType::Float32, None)],
            preview: PreviewKind::None,
            evaluator: crate::types::Evaluator::Source("y = 1;".to_string()),
        });
        // compile_sources deliberately not called
        let mut store = GraphStore::new();
        let node = add(&mut store, &registry, "pending");

        let report = run(&mut store, &registry, &EvalContext::default());
        assert!(!report.is_evaluated(node));

        registry.compile_sources();
        let report = run(&mut store, &registry, &EvalContext::default());
        assert!(report.is_evaluated(node));
        assert_eq!(store.get_port_value(node, "y"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn test_vectorized_chain_through_graph() {
        let registry = catalog::builtin_registry();
        let mut store = GraphStore::new();
        let ramp = add(&mut store, &registry, "ramp");
        let scale = add(&mut store, &registry, "multiply");

        store.set_port_value(port(&store, ramp, "count"), Value::Float(3.0));
        store.connect(port(&store, ramp, "values"), port(&store, scale, "a"));
        store.set_port_value(port(&store, scale, "b"), Value::Float(2.0));

        run(&mut store, &registry, &EvalContext::default());
        assert_eq!(
            store.get_port_value(scale, "c"),
            Some(&Value::FloatArray(vec![0.0, 2.0, 4.0]))
        );
    }
}
