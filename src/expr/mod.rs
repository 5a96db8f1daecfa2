//! Expression compiler
//!
//! Turns a node type's scalar source expression (e.g. `c = a + b;`) plus its
//! port list into a [`Program`] the interpreter can invoke. When any port is
//! array-typed the program runs in vectorized mode, broadcasting scalar
//! inputs over the longest input array with modulo wraparound; otherwise it
//! evaluates once with plain scalars.

mod eval;
mod parser;

use crate::graph::store::PortDirection;
use crate::types::PortTemplate;
use crate::value::Value;
use thiserror::Error;

/// Position in the author's source expression. Carried on every AST node so
/// runtime failures report the original line, not the evaluation machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

/// Expression tree node.
#[derive(Debug, Clone)]
pub enum Expr {
    Number(f32, Span),
    Var(String, Span),
    Unary(UnaryOp, Box<Expr>, Span),
    Binary(BinOp, Box<Expr>, Box<Expr>, Span),
    Call(String, Vec<Expr>, Span),
}

/// One `target = expr;` statement.
#[derive(Debug, Clone)]
pub struct Assign {
    pub target: String,
    pub value: Expr,
    pub span: Span,
}

/// Errors produced while compiling an expression.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },
    #[error("malformed number '{text}' at {span}")]
    BadNumber { text: String, span: Span },
    #[error("expected {what} at {span}")]
    Expected { what: &'static str, span: Span },
    #[error("unexpected end of source while parsing {what}")]
    UnexpectedEnd { what: &'static str },
    #[error("unknown function '{name}' at {span}")]
    UnknownFunction { name: String, span: Span },
}

/// Errors produced while running a compiled program. All carry the span of
/// the offending piece of the original expression.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown variable '{name}' at {span}")]
    UnknownVariable { name: String, span: Span },
    #[error("function '{name}' at {span} takes {expected} argument(s), got {got}")]
    WrongArgCount {
        name: String,
        span: Span,
        expected: usize,
        got: usize,
    },
    #[error("input '{name}' has no scalar value")]
    NotScalar { name: String },
    #[error("input '{name}' is empty")]
    EmptyInput { name: String },
    #[error("output '{name}' was never assigned")]
    MissingOutput { name: String },
}

/// Compiled evaluation program for one node type.
#[derive(Debug, Clone)]
pub struct Program {
    statements: Vec<Assign>,
    /// Input port names, in port-declaration order
    inputs: Vec<String>,
    /// Output port names, in port-declaration order
    outputs: Vec<String>,
    /// True iff any port of the type is array-valued
    vectorized: bool,
}

impl Program {
    pub fn is_vectorized(&self) -> bool {
        self.vectorized
    }

    /// Runs the program against resolved input values (one per input port,
    /// in port order) and returns one value per output port, in port order.
    pub fn run(&self, inputs: &[Value]) -> Result<Vec<Value>, EvalError> {
        if self.vectorized {
            eval::run_vectorized(self, inputs)
        } else {
            eval::run_scalar(self, inputs)
        }
    }

    pub(crate) fn statements(&self) -> &[Assign] {
        &self.statements
    }

    pub(crate) fn input_names(&self) -> &[String] {
        &self.inputs
    }

    pub(crate) fn output_names(&self) -> &[String] {
        &self.outputs
    }
}

fn check_functions(expr: &Expr) -> Result<(), CompileError> {
    match expr {
        Expr::Number(..) | Expr::Var(..) => Ok(()),
        Expr::Unary(_, inner, _) => check_functions(inner),
        Expr::Binary(_, left, right, _) => {
            check_functions(left)?;
            check_functions(right)
        }
        Expr::Call(name, args, span) => {
            if eval::function_arity(name).is_none() {
                return Err(CompileError::UnknownFunction {
                    name: name.clone(),
                    span: *span,
                });
            }
            for arg in args {
                check_functions(arg)?;
            }
            Ok(())
        }
    }
}

/// Compiles a source expression against the node type's port list.
pub fn compile(source: &str, ports: &[PortTemplate]) -> Result<Program, CompileError> {
    let statements = parser::parse(source)?;
    for statement in &statements {
        check_functions(&statement.value)?;
    }

    let vectorized = ports.iter().any(|p| p.data_type.is_array());
    let inputs = ports
        .iter()
        .filter(|p| p.direction == PortDirection::Input)
        .map(|p| p.label.clone())
        .collect();
    let outputs = ports
        .iter()
        .filter(|p| p.direction == PortDirection::Output)
        .map(|p| p.label.clone())
        .collect();

    Ok(Program {
        statements,
        inputs,
        outputs,
        vectorized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PortDataType;

    fn ports(array: bool) -> Vec<PortTemplate> {
        let dt = if array {
            PortDataType::Float32Array
        } else {
            PortDataType::Float32
        };
        vec![
            PortTemplate::input("a", dt, Some(Value::Float(0.0))),
            PortTemplate::input("b", dt, Some(Value::Float(0.0))),
            PortTemplate::output("c", dt, None),
        ]
    }

    #[test]
    fn test_scalar_program() {
        let program = compile("c = a + b;", &ports(false)).unwrap();
        assert!(!program.is_vectorized());
        let result = program
            .run(&[Value::Float(2.0), Value::Float(3.0)])
            .unwrap();
        assert_eq!(result, vec![Value::Float(5.0)]);
    }

    #[test]
    fn test_vectorized_broadcast() {
        let program = compile("c = a + b;", &ports(true)).unwrap();
        let result = program
            .run(&[
                Value::FloatArray(vec![1.0, 2.0, 3.0]),
                Value::Float(10.0),
            ])
            .unwrap();
        assert_eq!(result, vec![Value::FloatArray(vec![11.0, 12.0, 13.0])]);
    }

    #[test]
    fn test_modulo_wrap_of_shorter_array() {
        let program = compile("c = a + b;", &ports(true)).unwrap();
        let result = program
            .run(&[
                Value::FloatArray(vec![1.0, 2.0, 3.0, 4.0]),
                Value::FloatArray(vec![10.0, 20.0]),
            ])
            .unwrap();
        assert_eq!(
            result,
            vec![Value::FloatArray(vec![11.0, 22.0, 13.0, 24.0])]
        );
    }

    #[test]
    fn test_scalar_collapse() {
        // Two scalar inputs through the vectorized path collapse back to a
        // bare scalar, not a length-1 array.
        let program = compile("c = a + b;", &ports(true)).unwrap();
        let result = program
            .run(&[Value::Float(2.0), Value::Float(3.0)])
            .unwrap();
        assert_eq!(result, vec![Value::Float(5.0)]);
    }

    #[test]
    fn test_unknown_function_rejected_at_compile() {
        let err = compile("c = frobnicate(a);", &ports(false)).unwrap_err();
        assert!(matches!(err, CompileError::UnknownFunction { .. }));
    }

    #[test]
    fn test_runtime_error_points_at_source_line() {
        let program = compile("tmp = a * 2;\nc = tmp + missing;", &ports(false)).unwrap();
        let err = program
            .run(&[Value::Float(1.0), Value::Float(1.0)])
            .unwrap_err();
        match err {
            EvalError::UnknownVariable { name, span } => {
                assert_eq!(name, "missing");
                assert_eq!(span.line, 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
