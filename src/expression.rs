//! Typed expression model.
//!
//! This module provides:
//! - Schema-validated navigation paths
//! - The expression AST and its checked construction surface
//! - Construction-time and plan-time type checking
//! - Row-context evaluation (used by backends)

pub mod eval;
pub mod expr;
pub mod operator;
pub mod path;
pub mod type_checker;

pub use eval::{evaluate, like_match, EvalScope};
pub use expr::{CaseBuilder, CaseWhen, Expression, MatchBuilder, MatchWhen};
pub use operator::{AggregateKind, BinaryOperator, UnaryOperator};
pub use path::{EntityRef, NavRef, Path, PathKind};
pub use type_checker::TypeChecker;
