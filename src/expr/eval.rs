//! Evaluation of compiled expression programs
//!
//! Two paths: scalar (one evaluation with plain floats) and vectorized
//! (one evaluation per index over the longest input array, scalars and
//! shorter arrays wrapping around via modulo indexing).

use super::{Assign, BinOp, EvalError, Expr, Program, UnaryOp};
use crate::value::Value;
use std::collections::HashMap;

/// Arity of a built-in function, or `None` if the name is unknown.
pub(crate) fn function_arity(name: &str) -> Option<usize> {
    match name {
        "sin" | "cos" | "tan" | "sqrt" | "abs" | "floor" | "ceil" | "round" => Some(1),
        "min" | "max" | "pow" => Some(2),
        "clamp" => Some(3),
        _ => None,
    }
}

fn apply_function(name: &str, args: &[f32]) -> f32 {
    match (name, args) {
        ("sin", [x]) => x.sin(),
        ("cos", [x]) => x.cos(),
        ("tan", [x]) => x.tan(),
        ("sqrt", [x]) => x.sqrt(),
        ("abs", [x]) => x.abs(),
        ("floor", [x]) => x.floor(),
        ("ceil", [x]) => x.ceil(),
        ("round", [x]) => x.round(),
        ("min", [a, b]) => a.min(*b),
        ("max", [a, b]) => a.max(*b),
        ("pow", [a, b]) => a.powf(*b),
        ("clamp", [x, lo, hi]) => x.clamp(*lo, *hi),
        _ => f32::NAN,
    }
}

fn eval_expr(expr: &Expr, env: &HashMap<String, f32>) -> Result<f32, EvalError> {
    match expr {
        Expr::Number(value, _) => Ok(*value),
        Expr::Var(name, span) => env.get(name).copied().ok_or(EvalError::UnknownVariable {
            name: name.clone(),
            span: *span,
        }),
        Expr::Unary(UnaryOp::Neg, inner, _) => Ok(-eval_expr(inner, env)?),
        Expr::Binary(op, left, right, _) => {
            let l = eval_expr(left, env)?;
            let r = eval_expr(right, env)?;
            Ok(match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Rem => l % r,
            })
        }
        Expr::Call(name, args, span) => {
            let expected = function_arity(name).unwrap_or(0);
            if args.len() != expected {
                return Err(EvalError::WrongArgCount {
                    name: name.clone(),
                    span: *span,
                    expected,
                    got: args.len(),
                });
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, env)?);
            }
            Ok(apply_function(name, &values))
        }
    }
}

fn run_statements(
    statements: &[Assign],
    env: &mut HashMap<String, f32>,
) -> Result<(), EvalError> {
    for statement in statements {
        let value = eval_expr(&statement.value, env)?;
        env.insert(statement.target.clone(), value);
    }
    Ok(())
}

fn collect_outputs(
    program: &Program,
    env: &HashMap<String, f32>,
) -> Result<Vec<f32>, EvalError> {
    program
        .output_names()
        .iter()
        .map(|name| {
            env.get(name).copied().ok_or_else(|| EvalError::MissingOutput {
                name: name.clone(),
            })
        })
        .collect()
}

pub(crate) fn run_scalar(program: &Program, inputs: &[Value]) -> Result<Vec<Value>, EvalError> {
    let mut env = HashMap::new();
    for (name, value) in program.input_names().iter().zip(inputs) {
        let scalar = value
            .as_f32()
            .ok_or_else(|| EvalError::NotScalar { name: name.clone() })?;
        env.insert(name.clone(), scalar);
    }

    run_statements(program.statements(), &mut env)?;
    Ok(collect_outputs(program, &env)?
        .into_iter()
        .map(Value::Float)
        .collect())
}

pub(crate) fn run_vectorized(
    program: &Program,
    inputs: &[Value],
) -> Result<Vec<Value>, EvalError> {
    // Iteration length is the longest input, minimum 1 so a node with no
    // inputs still evaluates once.
    let len = inputs
        .iter()
        .map(Value::broadcast_len)
        .max()
        .unwrap_or(1)
        .max(1);

    let names = program.input_names();
    let mut buffers: Vec<Vec<f32>> =
        vec![vec![0.0; len]; program.output_names().len()];
    let mut env = HashMap::new();

    for index in 0..len {
        env.clear();
        for (name, value) in names.iter().zip(inputs) {
            let scalar = value.element_wrapped(index).ok_or_else(|| {
                if value.broadcast_len() == 0 {
                    EvalError::EmptyInput { name: name.clone() }
                } else {
                    EvalError::NotScalar { name: name.clone() }
                }
            })?;
            env.insert(name.clone(), scalar);
        }

        run_statements(program.statements(), &mut env)?;

        let outputs = collect_outputs(program, &env)?;
        for (buffer, value) in buffers.iter_mut().zip(outputs) {
            buffer[index] = value;
        }
    }

    // A length-1 result collapses back to a bare scalar.
    Ok(buffers
        .into_iter()
        .map(|buffer| {
            if buffer.len() == 1 {
                Value::Float(buffer[0])
            } else {
                Value::FloatArray(buffer)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::compile;
    use crate::types::PortTemplate;
    use crate::value::PortDataType;

    #[test]
    fn test_functions_and_precedence() {
        let ports = vec![
            PortTemplate::input("x", PortDataType::Float32, Some(Value::Float(0.0))),
            PortTemplate::output("y", PortDataType::Float32, None),
        ];
        let program = compile("y = max(x, 2) * 3 + 1;", &ports).unwrap();
        let result = program.run(&[Value::Float(5.0)]).unwrap();
        assert_eq!(result, vec![Value::Float(16.0)]);
    }

    #[test]
    fn test_uint_array_inputs_coerce_to_float() {
        let ports = vec![
            PortTemplate::input("n", PortDataType::UInt32Array, None),
            PortTemplate::output("y", PortDataType::Float32Array, None),
        ];
        let program = compile("y = n * 2;", &ports).unwrap();
        let result = program.run(&[Value::UIntArray(vec![1, 2, 3])]).unwrap();
        assert_eq!(result, vec![Value::FloatArray(vec![2.0, 4.0, 6.0])]);
    }

    #[test]
    fn test_empty_array_input_errors() {
        let ports = vec![
            PortTemplate::input("a", PortDataType::Float32Array, None),
            PortTemplate::output("c", PortDataType::Float32Array, None),
        ];
        let program = compile("c = a;", &ports).unwrap();
        let err = program.run(&[Value::FloatArray(vec![])]).unwrap_err();
        assert!(matches!(err, EvalError::EmptyInput { .. }));
    }

    #[test]
    fn test_wrong_arity_reported_with_span() {
        let ports = vec![
            PortTemplate::input("x", PortDataType::Float32, Some(Value::Float(0.0))),
            PortTemplate::output("y", PortDataType::Float32, None),
        ];
        let program = compile("y = sin(x, x);", &ports).unwrap();
        let err = program.run(&[Value::Float(0.0)]).unwrap_err();
        assert!(matches!(err, EvalError::WrongArgCount { expected: 1, .. }));
    }
}
