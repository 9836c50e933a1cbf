use miette::Diagnostic;
use thiserror::Error;
use crate::parser::{Expr, Op};

#[derive(Diagnostic, Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("divide by zero")]
    DivideByZero,

    #[error("integer overflow evaluating {left} {op} {right}")]
    #[diagnostic(help("results must fit in a signed 64-bit integer"))]
    Overflow { op: Op, left: i64, right: i64 },
}

/// What a combining function sees of the node it is reducing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Literal(i64),
    Binary(Op),
}

enum Step<'e> {
    Visit(&'e Expr),
    Combine(Op),
}

/// Reduces `expr` bottom-up.
///
/// Children are folded first (left, then right) and `combine` is called with
/// the node's kind and the already-reduced child values, which are `None` for
/// a leaf. The first error aborts the whole fold.
///
/// The walk keeps its own work stack, so tree depth is not limited by the
/// call stack.
pub fn fold<R, F>(expr: &Expr, combine: &mut F) -> Result<R, EvalError>
where
    F: FnMut(NodeKind, Option<R>, Option<R>) -> Result<R, EvalError>,
{
    let mut work = vec![Step::Visit(expr)];
    let mut values: Vec<R> = Vec::new();

    while let Some(step) = work.pop() {
        match step {
            Step::Visit(Expr::Literal(n)) => {
                values.push(combine(NodeKind::Literal(*n), None, None)?);
            }
            Step::Visit(Expr::Binary { op, left, right }) => {
                work.push(Step::Combine(*op));
                work.push(Step::Visit(right.as_ref()));
                work.push(Step::Visit(left.as_ref()));
            }
            Step::Combine(op) => {
                let right = values.pop();
                let left = values.pop();
                values.push(combine(NodeKind::Binary(op), left, right)?);
            }
        }
    }

    match (values.pop(), values.is_empty()) {
        (Some(result), true) => Ok(result),
        _ => unreachable!("fold must leave exactly one value"),
    }
}

fn operands<R>(op: Op, left: Option<R>, right: Option<R>) -> (R, R) {
    match (left, right) {
        (Some(left), Some(right)) => (left, right),
        _ => unreachable!("binary `{op}` folded without both operands"),
    }
}

/// Integer arithmetic. Division truncates toward zero.
pub fn arithmetic(
    node: NodeKind,
    left: Option<i64>,
    right: Option<i64>,
) -> Result<i64, EvalError> {
    let op = match node {
        NodeKind::Literal(n) => return Ok(n),
        NodeKind::Binary(op) => op,
    };
    let (a, b) = operands(op, left, right);

    let result = match op {
        Op::Add => a.checked_add(b),
        Op::Sub => a.checked_sub(b),
        Op::Mul => a.checked_mul(b),
        Op::Div if b == 0 => return Err(EvalError::DivideByZero),
        Op::Div => a.checked_div(b),
    };

    result.ok_or(EvalError::Overflow {
        op,
        left: a,
        right: b,
    })
}

/// Postfix (reverse Polish): `a b +`.
pub fn postfix(
    node: NodeKind,
    left: Option<String>,
    right: Option<String>,
) -> Result<String, EvalError> {
    match node {
        NodeKind::Literal(n) => Ok(n.to_string()),
        NodeKind::Binary(op) => {
            let (a, b) = operands(op, left, right);
            Ok(format!("{a} {b} {op}"))
        }
    }
}

/// Parenthesized prefix: `(+ a b)`.
pub fn prefix(
    node: NodeKind,
    left: Option<String>,
    right: Option<String>,
) -> Result<String, EvalError> {
    match node {
        NodeKind::Literal(n) => Ok(n.to_string()),
        NodeKind::Binary(op) => {
            let (a, b) = operands(op, left, right);
            Ok(format!("({op} {a} {b})"))
        }
    }
}

pub fn evaluate(expr: &Expr) -> Result<i64, EvalError> {
    fold(expr, &mut arithmetic)
}

pub fn to_postfix(expr: &Expr) -> Result<String, EvalError> {
    fold(expr, &mut postfix)
}

pub fn to_prefix(expr: &Expr) -> Result<String, EvalError> {
    fold(expr, &mut prefix)
}
