//! Expression evaluation.
//!
//! Evaluation is backend work: the reference in-memory backend drives it
//! once per row while filtering, joining, and projecting. The caller
//! supplies an [`EvalScope`] that resolves column paths, runs subqueries,
//! and (during aggregation) overrides whole sub-expressions with
//! precomputed values.

use crate::access::Value;
use crate::error::{QueryError, QueryResult};
use crate::expression::operator::{BinaryOperator, UnaryOperator};
use crate::expression::{Expression, Path};
use crate::query::plan::Plan;
use anyhow::anyhow;
use std::cmp::Ordering;

/// Environment an expression is evaluated in
pub trait EvalScope {
    /// Short-circuit a whole node with a precomputed value. The aggregation
    /// stage uses this to substitute group keys and aggregate results.
    fn resolve_node(&mut self, _expr: &Expression) -> Option<Value> {
        None
    }

    /// Resolve a column path to the current row's value
    fn column(&mut self, path: &Path) -> QueryResult<Value>;

    /// Execute a subquery plan, returning its single select column
    fn subquery(&mut self, plan: &Plan) -> QueryResult<Vec<Value>>;
}

fn eval_error(message: String) -> QueryError {
    QueryError::Execution(anyhow!(message))
}

/// Evaluate an expression within a scope
pub fn evaluate(expr: &Expression, scope: &mut dyn EvalScope) -> QueryResult<Value> {
    if let Some(value) = scope.resolve_node(expr) {
        return Ok(value);
    }

    match expr {
        Expression::Constant(value) => Ok(value.clone()),

        Expression::Column(path) => scope.column(path),

        Expression::UnaryOp { op, operand } => {
            let operand = evaluate(operand, scope)?;
            evaluate_unary(*op, operand)
        }

        Expression::BinaryOp { op, left, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            evaluate_binary(*op, left, right)
        }

        Expression::Aggregate { kind, .. } => Err(eval_error(format!(
            "aggregate '{}' evaluated outside an aggregation context",
            kind.name()
        ))),

        Expression::Case {
            branches,
            otherwise,
        } => {
            for (condition, result) in branches {
                // NULL conditions are false, as in WHERE
                if matches!(evaluate(condition, scope)?, Value::Bool(true)) {
                    return evaluate(result, scope);
                }
            }
            evaluate(otherwise, scope)
        }

        Expression::In { needle, list } => {
            let needle = evaluate(needle, scope)?;
            if needle.is_null() {
                return Ok(Value::Null);
            }
            let mut saw_null = false;
            for item in list {
                let candidates = match item {
                    Expression::Subquery(plan) => scope.subquery(plan)?,
                    other => vec![evaluate(other, scope)?],
                };
                for candidate in candidates {
                    if candidate.is_null() {
                        saw_null = true;
                    } else if needle.compare(&candidate) == Some(Ordering::Equal) {
                        return Ok(Value::Bool(true));
                    }
                }
            }
            // Three-valued logic: a NULL member makes a miss unknowable
            if saw_null {
                Ok(Value::Null)
            } else {
                Ok(Value::Bool(false))
            }
        }

        Expression::Subquery(plan) => {
            let mut values = scope.subquery(plan)?;
            match values.len() {
                0 => Ok(Value::Null),
                1 => Ok(values.swap_remove(0)),
                n => Err(eval_error(format!("scalar subquery returned {n} rows"))),
            }
        }

        Expression::Function { name, args } => {
            let mut evaluated = Vec::with_capacity(args.len());
            for arg in args {
                evaluated.push(evaluate(arg, scope)?);
            }
            evaluate_function(name, &evaluated)
        }
    }
}

fn evaluate_unary(op: UnaryOperator, operand: Value) -> QueryResult<Value> {
    match op {
        UnaryOperator::Not => match operand {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(eval_error(format!("cannot negate {other:?}"))),
        },

        UnaryOperator::Neg => match operand {
            Value::Null => Ok(Value::Null),
            Value::Int(i) => Ok(Value::Int(-i)),
            Value::Double(d) => Ok(Value::Double(-d)),
            other => Err(eval_error(format!("cannot negate {other:?}"))),
        },

        UnaryOperator::IsNull => Ok(Value::Bool(operand.is_null())),

        UnaryOperator::IsNotNull => Ok(Value::Bool(!operand.is_null())),

        UnaryOperator::ToText => match operand {
            Value::Null => Ok(Value::Null),
            other => Ok(Value::Text(other.render())),
        },
    }
}

fn evaluate_binary(op: BinaryOperator, left: Value, right: Value) -> QueryResult<Value> {
    // NULL propagation: three-valued logic for AND/OR, NULL otherwise
    if left.is_null() || right.is_null() {
        return match op {
            BinaryOperator::And => match (&left, &right) {
                (Value::Bool(false), _) | (_, Value::Bool(false)) => Ok(Value::Bool(false)),
                _ => Ok(Value::Null),
            },
            BinaryOperator::Or => match (&left, &right) {
                (Value::Bool(true), _) | (_, Value::Bool(true)) => Ok(Value::Bool(true)),
                _ => Ok(Value::Null),
            },
            _ => Ok(Value::Null),
        };
    }

    match op {
        BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div => {
            evaluate_arithmetic(op, left, right)
        }

        BinaryOperator::Eq => compare_with(op, left, right, |cmp| cmp == Ordering::Equal),
        BinaryOperator::Ne => compare_with(op, left, right, |cmp| cmp != Ordering::Equal),
        BinaryOperator::Lt => compare_with(op, left, right, |cmp| cmp == Ordering::Less),
        BinaryOperator::Le => compare_with(op, left, right, |cmp| cmp != Ordering::Greater),
        BinaryOperator::Gt => compare_with(op, left, right, |cmp| cmp == Ordering::Greater),
        BinaryOperator::Ge => compare_with(op, left, right, |cmp| cmp != Ordering::Less),

        BinaryOperator::And => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a && b)),
            (l, r) => Err(eval_error(format!("'and' over {l:?} and {r:?}"))),
        },

        BinaryOperator::Or => match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a || b)),
            (l, r) => Err(eval_error(format!("'or' over {l:?} and {r:?}"))),
        },

        BinaryOperator::Concat => match (left, right) {
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{a}{b}"))),
            (l, r) => Err(eval_error(format!("cannot concat {l:?} and {r:?}"))),
        },

        BinaryOperator::Like => match (left, right) {
            (Value::Text(text), Value::Text(pattern)) => {
                Ok(Value::Bool(like_match(&text, &pattern)))
            }
            (l, r) => Err(eval_error(format!("'like' over {l:?} and {r:?}"))),
        },
    }
}

fn evaluate_arithmetic(op: BinaryOperator, left: Value, right: Value) -> QueryResult<Value> {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinaryOperator::Add => Ok(Value::Int(a.wrapping_add(*b))),
            BinaryOperator::Sub => Ok(Value::Int(a.wrapping_sub(*b))),
            BinaryOperator::Mul => Ok(Value::Int(a.wrapping_mul(*b))),
            BinaryOperator::Div => {
                if *b == 0 {
                    Err(eval_error("division by zero".to_string()))
                } else {
                    Ok(Value::Int(a / b))
                }
            }
            _ => unreachable!("arithmetic operator expected"),
        },
        _ => {
            let (a, b) = match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(eval_error(format!(
                        "arithmetic over {left:?} and {right:?}"
                    )))
                }
            };
            match op {
                BinaryOperator::Add => Ok(Value::Double(a + b)),
                BinaryOperator::Sub => Ok(Value::Double(a - b)),
                BinaryOperator::Mul => Ok(Value::Double(a * b)),
                BinaryOperator::Div => {
                    if b == 0.0 {
                        Err(eval_error("division by zero".to_string()))
                    } else {
                        Ok(Value::Double(a / b))
                    }
                }
                _ => unreachable!("arithmetic operator expected"),
            }
        }
    }
}

fn compare_with(
    op: BinaryOperator,
    left: Value,
    right: Value,
    accept: impl FnOnce(Ordering) -> bool,
) -> QueryResult<Value> {
    match left.compare(&right) {
        Some(ordering) => Ok(Value::Bool(accept(ordering))),
        None => Err(eval_error(format!(
            "operator '{}' cannot compare {left:?} and {right:?}",
            op.as_str()
        ))),
    }
}

fn evaluate_function(name: &str, args: &[Value]) -> QueryResult<Value> {
    match (name, args) {
        (_, [Value::Null]) => Ok(Value::Null),
        ("upper", [Value::Text(s)]) => Ok(Value::Text(s.to_uppercase())),
        ("lower", [Value::Text(s)]) => Ok(Value::Text(s.to_lowercase())),
        ("length", [Value::Text(s)]) => Ok(Value::Int(s.chars().count() as i64)),
        _ => Err(eval_error(format!(
            "function '{name}' is not applicable to {args:?}"
        ))),
    }
}

/// SQL LIKE matching: `%` matches any run, `_` matches one character
pub fn like_match(text: &str, pattern: &str) -> bool {
    fn matches(text: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some((&'%', rest)) => {
                (0..=text.len()).any(|skip| matches(&text[skip..], rest))
            }
            Some((&'_', rest)) => match text.split_first() {
                Some((_, text_rest)) => matches(text_rest, rest),
                None => false,
            },
            Some((ch, rest)) => match text.split_first() {
                Some((t, text_rest)) => t == ch && matches(text_rest, rest),
                None => false,
            },
        }
    }
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    matches(&text, &pattern)
}
