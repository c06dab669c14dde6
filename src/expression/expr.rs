//! Expression AST definitions.
//!
//! Expressions are immutable trees built through checked constructors: an
//! operator applied to incompatible operand kinds fails with a type-mismatch
//! error at construction time, never at execution. Equality and hashing are
//! structural, which lets result tuples be addressed by the expression that
//! produced a column and lets plans deduplicate repeated select items.

use crate::access::{DataType, Value};
use crate::error::{QueryError, QueryResult};
use crate::expression::operator::{AggregateKind, BinaryOperator, UnaryOperator};
use crate::expression::path::Path;
use crate::query::plan::{OrderSpec, Plan, SortOrder};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expression tree node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    /// Literal constant value
    Constant(Value),

    /// Schema-validated column reference
    Column(Path),

    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Aggregate combinator; `operand` is None for whole-row count
    Aggregate {
        kind: AggregateKind,
        operand: Option<Box<Expression>>,
        alias: Option<String>,
    },

    /// Searched CASE: ordered (condition, result) branches plus a default
    Case {
        branches: Vec<(Expression, Expression)>,
        otherwise: Box<Expression>,
    },

    /// Membership test; list entries may include subqueries, which
    /// contribute their whole result set
    In {
        needle: Box<Expression>,
        list: Vec<Expression>,
    },

    /// Scalar or set-valued subquery over a frozen plan
    Subquery(Box<Plan>),

    /// Named scalar function (`upper`, `lower`, `length`)
    Function { name: String, args: Vec<Expression> },
}

impl Expression {
    /// Create a constant expression
    pub fn constant(value: impl Into<Value>) -> Self {
        Expression::Constant(value.into())
    }

    /// Create a NULL constant
    pub fn null() -> Self {
        Expression::Constant(Value::Null)
    }

    /// Static output type of this expression, when it can be determined.
    /// `None` means "unknown" (NULL literals and expressions over them).
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Expression::Constant(value) => value.data_type(),
            Expression::Column(path) => path.data_type(),
            Expression::UnaryOp { op, operand } => match operand.data_type() {
                Some(t) => op.output_type(t),
                // NULL operand: NULL checks and casts still have fixed types
                None => match op {
                    UnaryOperator::IsNull | UnaryOperator::IsNotNull => Some(DataType::Bool),
                    UnaryOperator::ToText => Some(DataType::Text),
                    _ => None,
                },
            },
            Expression::BinaryOp { op, left, right } => {
                match (left.data_type(), right.data_type()) {
                    (Some(l), Some(r)) => op.output_type(l, r),
                    _ => None,
                }
            }
            Expression::Aggregate { kind, operand, .. } => {
                kind.output_type(operand.as_ref().and_then(|e| e.data_type()))
            }
            Expression::Case {
                branches,
                otherwise,
            } => branches
                .iter()
                .find_map(|(_, result)| result.data_type())
                .or_else(|| otherwise.data_type()),
            Expression::In { .. } => Some(DataType::Bool),
            Expression::Subquery(plan) => plan.selects().first().and_then(|e| e.data_type()),
            Expression::Function { name, .. } => match name.as_str() {
                "upper" | "lower" => Some(DataType::Text),
                "length" => Some(DataType::Int),
                _ => None,
            },
        }
    }

    fn binary(op: BinaryOperator, left: Expression, right: Expression) -> QueryResult<Self> {
        if let (Some(l), Some(r)) = (left.data_type(), right.data_type()) {
            if op.output_type(l, r).is_none() {
                return Err(QueryError::TypeMismatch(format!(
                    "operator '{}' cannot be applied to {l} and {r}",
                    op.as_str()
                )));
            }
        }
        Ok(Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn unary(op: UnaryOperator, operand: Expression) -> QueryResult<Self> {
        if let Some(t) = operand.data_type() {
            if op.output_type(t).is_none() {
                return Err(QueryError::TypeMismatch(format!(
                    "operator '{}' cannot be applied to {t}",
                    op.as_str()
                )));
            }
        }
        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn eq(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Eq, self, other.into())
    }

    pub fn ne(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Ne, self, other.into())
    }

    pub fn lt(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Lt, self, other.into())
    }

    pub fn le(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Le, self, other.into())
    }

    pub fn gt(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Gt, self, other.into())
    }

    pub fn ge(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Ge, self, other.into())
    }

    pub fn and(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::And, self, other.into())
    }

    pub fn or(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Or, self, other.into())
    }

    pub fn not(self) -> QueryResult<Self> {
        Self::unary(UnaryOperator::Not, self)
    }

    pub fn add(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Add, self, other.into())
    }

    pub fn sub(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Sub, self, other.into())
    }

    pub fn mul(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Mul, self, other.into())
    }

    pub fn div(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Div, self, other.into())
    }

    pub fn neg(self) -> QueryResult<Self> {
        Self::unary(UnaryOperator::Neg, self)
    }

    pub fn concat(self, other: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Concat, self, other.into())
    }

    /// Render this expression's value as text
    pub fn string_value(self) -> Self {
        Expression::UnaryOp {
            op: UnaryOperator::ToText,
            operand: Box::new(self),
        }
    }

    /// SQL LIKE with `%` and `_` wildcards
    pub fn like(self, pattern: impl Into<Expression>) -> QueryResult<Self> {
        Self::binary(BinaryOperator::Like, self, pattern.into())
    }

    /// Substring containment, expressed as LIKE `%needle%`
    pub fn contains(self, needle: &str) -> QueryResult<Self> {
        self.like(format!("%{needle}%").as_str())
    }

    /// Prefix match, expressed as LIKE `needle%`
    pub fn starts_with(self, prefix: &str) -> QueryResult<Self> {
        self.like(format!("{prefix}%").as_str())
    }

    pub fn is_null(self) -> Self {
        Expression::UnaryOp {
            op: UnaryOperator::IsNull,
            operand: Box::new(self),
        }
    }

    pub fn is_not_null(self) -> Self {
        Expression::UnaryOp {
            op: UnaryOperator::IsNotNull,
            operand: Box::new(self),
        }
    }

    /// Membership in an explicit value list
    pub fn in_list(self, list: Vec<Expression>) -> QueryResult<Self> {
        for item in &list {
            if let (Some(l), Some(r)) = (self.data_type(), item.data_type()) {
                if BinaryOperator::Eq.output_type(l, r).is_none() {
                    return Err(QueryError::TypeMismatch(format!(
                        "'in' list entry of type {r} is not comparable with {l}"
                    )));
                }
            }
        }
        Ok(Expression::In {
            needle: Box::new(self),
            list,
        })
    }

    /// Membership in a single-column subquery's result set
    pub fn in_subquery(self, plan: Plan) -> QueryResult<Self> {
        let subquery = Expression::subquery(plan)?;
        self.in_list(vec![subquery])
    }

    /// Whole-row count
    pub fn count() -> Self {
        Expression::Aggregate {
            kind: AggregateKind::Count,
            operand: None,
            alias: None,
        }
    }

    fn aggregate(kind: AggregateKind, operand: Expression) -> QueryResult<Self> {
        let operand_type = operand.data_type();
        if kind.output_type(operand_type).is_none() {
            return Err(QueryError::TypeMismatch(format!(
                "aggregate '{}' cannot be applied to {}",
                kind.name(),
                operand_type.map_or_else(|| "null".to_string(), |t| t.to_string())
            )));
        }
        Ok(Expression::Aggregate {
            kind,
            operand: Some(Box::new(operand)),
            alias: None,
        })
    }

    pub fn count_of(operand: Expression) -> QueryResult<Self> {
        Self::aggregate(AggregateKind::Count, operand)
    }

    pub fn sum(operand: Expression) -> QueryResult<Self> {
        Self::aggregate(AggregateKind::Sum, operand)
    }

    pub fn avg(operand: Expression) -> QueryResult<Self> {
        Self::aggregate(AggregateKind::Avg, operand)
    }

    pub fn max(operand: Expression) -> QueryResult<Self> {
        Self::aggregate(AggregateKind::Max, operand)
    }

    pub fn min(operand: Expression) -> QueryResult<Self> {
        Self::aggregate(AggregateKind::Min, operand)
    }

    /// Declare an alias for an aggregate select item. Result tuples can then
    /// be addressed either by the aliased expression or by the alias string.
    pub fn named(self, alias: impl Into<String>) -> QueryResult<Self> {
        match self {
            Expression::Aggregate { kind, operand, .. } => Ok(Expression::Aggregate {
                kind,
                operand,
                alias: Some(alias.into()),
            }),
            other => Err(QueryError::Plan(format!(
                "alias can only be declared on aggregate expressions, not on '{other}'"
            ))),
        }
    }

    /// Scalar subquery over a frozen plan; the plan must select exactly one
    /// expression.
    pub fn subquery(plan: Plan) -> QueryResult<Self> {
        if plan.selects().len() != 1 {
            return Err(QueryError::Plan(format!(
                "subquery must select exactly one expression, got {}",
                plan.selects().len()
            )));
        }
        Ok(Expression::Subquery(Box::new(plan)))
    }

    /// Named scalar function call
    pub fn function(name: &str, args: Vec<Expression>) -> QueryResult<Self> {
        match name {
            "upper" | "lower" | "length" => {
                if args.len() != 1 {
                    return Err(QueryError::TypeMismatch(format!(
                        "function '{name}' expects 1 argument, got {}",
                        args.len()
                    )));
                }
                if let Some(t) = args[0].data_type() {
                    if t != DataType::Text {
                        return Err(QueryError::TypeMismatch(format!(
                            "function '{name}' expects a text argument, got {t}"
                        )));
                    }
                }
            }
            _ => {
                return Err(QueryError::TypeMismatch(format!(
                    "unknown function '{name}'"
                )))
            }
        }
        Ok(Expression::Function {
            name: name.to_string(),
            args,
        })
    }

    /// Start a searched CASE expression
    pub fn case() -> CaseBuilder {
        CaseBuilder {
            branches: Vec::new(),
        }
    }

    /// Start a simple CASE over a scrutinee value
    /// (`match_value(age).when(19).then(1).otherwise(2)`)
    pub fn match_value(scrutinee: Expression) -> MatchBuilder {
        MatchBuilder {
            scrutinee,
            branches: Vec::new(),
        }
    }

    /// Ascending order over this expression
    pub fn asc(&self) -> OrderSpec {
        OrderSpec::new(self.clone(), SortOrder::Asc)
    }

    /// Descending order over this expression
    pub fn desc(&self) -> OrderSpec {
        OrderSpec::new(self.clone(), SortOrder::Desc)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expression::Aggregate { .. })
    }

    /// Whether any aggregate node occurs in this tree. Subqueries are not
    /// descended into; their aggregates belong to their own plan.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate { .. } => true,
            Expression::Constant(_) | Expression::Column(_) | Expression::Subquery(_) => false,
            Expression::UnaryOp { operand, .. } => operand.contains_aggregate(),
            Expression::BinaryOp { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expression::Case {
                branches,
                otherwise,
            } => {
                branches
                    .iter()
                    .any(|(c, r)| c.contains_aggregate() || r.contains_aggregate())
                    || otherwise.contains_aggregate()
            }
            Expression::In { needle, list } => {
                needle.contains_aggregate() || list.iter().any(|e| e.contains_aggregate())
            }
            Expression::Function { args, .. } => args.iter().any(|e| e.contains_aggregate()),
        }
    }

    /// Collect every distinct aggregate node in this tree, in first-seen order
    pub fn collect_aggregates<'a>(&'a self, out: &mut Vec<&'a Expression>) {
        match self {
            Expression::Aggregate { .. } => {
                if !out.iter().any(|seen| *seen == self) {
                    out.push(self);
                }
            }
            Expression::Constant(_) | Expression::Column(_) | Expression::Subquery(_) => {}
            Expression::UnaryOp { operand, .. } => operand.collect_aggregates(out),
            Expression::BinaryOp { left, right, .. } => {
                left.collect_aggregates(out);
                right.collect_aggregates(out);
            }
            Expression::Case {
                branches,
                otherwise,
            } => {
                for (condition, result) in branches {
                    condition.collect_aggregates(out);
                    result.collect_aggregates(out);
                }
                otherwise.collect_aggregates(out);
            }
            Expression::In { needle, list } => {
                needle.collect_aggregates(out);
                for item in list {
                    item.collect_aggregates(out);
                }
            }
            Expression::Function { args, .. } => {
                for arg in args {
                    arg.collect_aggregates(out);
                }
            }
        }
    }

    /// Visit every column path in this tree. Subqueries are not descended
    /// into; their paths resolve against their own aliases.
    pub fn visit_paths(&self, visit: &mut dyn FnMut(&Path)) {
        match self {
            Expression::Column(path) => visit(path),
            Expression::Constant(_) | Expression::Subquery(_) => {}
            Expression::UnaryOp { operand, .. } => operand.visit_paths(visit),
            Expression::BinaryOp { left, right, .. } => {
                left.visit_paths(visit);
                right.visit_paths(visit);
            }
            Expression::Aggregate { operand, .. } => {
                if let Some(operand) = operand {
                    operand.visit_paths(visit);
                }
            }
            Expression::Case {
                branches,
                otherwise,
            } => {
                for (condition, result) in branches {
                    condition.visit_paths(visit);
                    result.visit_paths(visit);
                }
                otherwise.visit_paths(visit);
            }
            Expression::In { needle, list } => {
                needle.visit_paths(visit);
                for item in list {
                    item.visit_paths(visit);
                }
            }
            Expression::Function { args, .. } => {
                for arg in args {
                    arg.visit_paths(visit);
                }
            }
        }
    }

    /// Rewrite every column path in this tree. Used by plan building to
    /// rebase navigation paths onto join aliases.
    pub fn map_paths(
        self,
        rewrite: &mut dyn FnMut(Path) -> QueryResult<Path>,
    ) -> QueryResult<Expression> {
        Ok(match self {
            Expression::Column(path) => Expression::Column(rewrite(path)?),
            expr @ (Expression::Constant(_) | Expression::Subquery(_)) => expr,
            Expression::UnaryOp { op, operand } => Expression::UnaryOp {
                op,
                operand: Box::new(operand.map_paths(rewrite)?),
            },
            Expression::BinaryOp { op, left, right } => Expression::BinaryOp {
                op,
                left: Box::new(left.map_paths(rewrite)?),
                right: Box::new(right.map_paths(rewrite)?),
            },
            Expression::Aggregate {
                kind,
                operand,
                alias,
            } => Expression::Aggregate {
                kind,
                operand: match operand {
                    Some(operand) => Some(Box::new(operand.map_paths(rewrite)?)),
                    None => None,
                },
                alias,
            },
            Expression::Case {
                branches,
                otherwise,
            } => Expression::Case {
                branches: branches
                    .into_iter()
                    .map(|(c, r)| Ok((c.map_paths(rewrite)?, r.map_paths(rewrite)?)))
                    .collect::<QueryResult<Vec<_>>>()?,
                otherwise: Box::new(otherwise.map_paths(rewrite)?),
            },
            Expression::In { needle, list } => Expression::In {
                needle: Box::new(needle.map_paths(rewrite)?),
                list: list
                    .into_iter()
                    .map(|e| e.map_paths(rewrite))
                    .collect::<QueryResult<Vec<_>>>()?,
            },
            Expression::Function { name, args } => Expression::Function {
                name,
                args: args
                    .into_iter()
                    .map(|e| e.map_paths(rewrite))
                    .collect::<QueryResult<Vec<_>>>()?,
            },
        })
    }

    /// Display label used for result-tuple columns: the declared alias for
    /// aggregates, otherwise the rendered expression.
    pub fn label(&self) -> String {
        if let Expression::Aggregate {
            alias: Some(alias), ..
        } = self
        {
            return alias.clone();
        }
        self.to_string()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => write!(f, "{}", value.render()),
            Expression::Column(path) => write!(f, "{path}"),
            Expression::UnaryOp { op, operand } => match op {
                UnaryOperator::IsNull | UnaryOperator::IsNotNull => {
                    write!(f, "{operand} {}", op.as_str())
                }
                UnaryOperator::ToText => write!(f, "string({operand})"),
                _ => write!(f, "{}({operand})", op.as_str()),
            },
            Expression::BinaryOp { op, left, right } => {
                write!(f, "({left} {} {right})", op.as_str())
            }
            Expression::Aggregate { kind, operand, .. } => match operand {
                Some(operand) => write!(f, "{}({operand})", kind.name()),
                None => write!(f, "{}(*)", kind.name()),
            },
            Expression::Case { branches, .. } => write!(f, "case[{}]", branches.len()),
            Expression::In { needle, .. } => write!(f, "{needle} in (...)"),
            Expression::Subquery(_) => write!(f, "(subquery)"),
            Expression::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Constant(value)
    }
}

impl From<Path> for Expression {
    fn from(path: Path) -> Self {
        Expression::Column(path)
    }
}

macro_rules! constant_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Expression {
            fn from(value: $ty) -> Self {
                Expression::Constant(value.into())
            }
        })*
    };
}

constant_from!(bool, i32, i64, f64, &str, String);

/// Common result-type of two CASE branches
fn merge_branch_types(
    current: Option<DataType>,
    next: Option<DataType>,
) -> QueryResult<Option<DataType>> {
    match (current, next) {
        (Some(a), Some(b)) if a == b => Ok(Some(a)),
        (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => Ok(Some(DataType::Double)),
        (Some(a), Some(b)) => Err(QueryError::TypeMismatch(format!(
            "case branches disagree on result type: {a} vs {b}"
        ))),
        (Some(a), None) | (None, Some(a)) => Ok(Some(a)),
        (None, None) => Ok(None),
    }
}

/// Builder for searched CASE expressions
#[derive(Debug, Clone)]
pub struct CaseBuilder {
    branches: Vec<(Expression, Expression)>,
}

impl CaseBuilder {
    /// Add a branch condition; must be boolean-typed
    pub fn when(self, condition: Expression) -> QueryResult<CaseWhen> {
        match condition.data_type() {
            Some(DataType::Bool) | None => Ok(CaseWhen {
                branches: self.branches,
                condition,
            }),
            Some(other) => Err(QueryError::TypeMismatch(format!(
                "case condition must be boolean, got {other}"
            ))),
        }
    }
}

/// A CASE branch whose condition is set and is waiting for its result
#[derive(Debug, Clone)]
pub struct CaseWhen {
    branches: Vec<(Expression, Expression)>,
    condition: Expression,
}

impl CaseWhen {
    pub fn then(mut self, result: impl Into<Expression>) -> CaseBuilder {
        self.branches.push((self.condition, result.into()));
        CaseBuilder {
            branches: self.branches,
        }
    }
}

impl CaseBuilder {
    /// Close the CASE with a default result
    pub fn otherwise(self, default: impl Into<Expression>) -> QueryResult<Expression> {
        if self.branches.is_empty() {
            return Err(QueryError::Plan(
                "case expression needs at least one when/then branch".to_string(),
            ));
        }
        let default = default.into();
        let mut result_type = default.data_type();
        for (_, result) in &self.branches {
            result_type = merge_branch_types(result_type, result.data_type())?;
        }
        Ok(Expression::Case {
            branches: self.branches,
            otherwise: Box::new(default),
        })
    }
}

/// Builder for simple CASE expressions, lowered to equality branches
#[derive(Debug, Clone)]
pub struct MatchBuilder {
    scrutinee: Expression,
    branches: Vec<(Expression, Expression)>,
}

impl MatchBuilder {
    pub fn when(self, value: impl Into<Expression>) -> QueryResult<MatchWhen> {
        let condition = self.scrutinee.clone().eq(value)?;
        Ok(MatchWhen {
            scrutinee: self.scrutinee,
            branches: self.branches,
            condition,
        })
    }

    pub fn otherwise(self, default: impl Into<Expression>) -> QueryResult<Expression> {
        CaseBuilder {
            branches: self.branches,
        }
        .otherwise(default)
    }
}

#[derive(Debug, Clone)]
pub struct MatchWhen {
    scrutinee: Expression,
    branches: Vec<(Expression, Expression)>,
    condition: Expression,
}

impl MatchWhen {
    pub fn then(mut self, result: impl Into<Expression>) -> MatchBuilder {
        self.branches.push((self.condition, result.into()));
        MatchBuilder {
            scrutinee: self.scrutinee,
            branches: self.branches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_conversions() {
        assert_eq!(
            Expression::from(42),
            Expression::Constant(Value::Int(42))
        );
        assert_eq!(
            Expression::from("hi"),
            Expression::Constant(Value::Text("hi".to_string()))
        );
        assert_eq!(Expression::null(), Expression::Constant(Value::Null));
    }

    #[test]
    fn test_checked_arithmetic_construction() {
        let sum = Expression::from(1).add(2).unwrap();
        assert_eq!(sum.data_type(), Some(DataType::Int));

        let mixed = Expression::from(1).add(2.5).unwrap();
        assert_eq!(mixed.data_type(), Some(DataType::Double));

        assert!(matches!(
            Expression::from(1).add("two"),
            Err(QueryError::TypeMismatch(_))
        ));
        assert!(matches!(
            Expression::from("a").lt(1),
            Err(QueryError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_null_operands_defer_to_runtime() {
        // NULL has no static type; construction lets it through
        let expr = Expression::from(1).add(Expression::null()).unwrap();
        assert_eq!(expr.data_type(), None);
    }

    #[test]
    fn test_concat_and_string_value() {
        let expr = Expression::from("a")
            .concat(Expression::from(5).string_value())
            .unwrap();
        assert_eq!(expr.data_type(), Some(DataType::Text));

        assert!(matches!(
            Expression::from("a").concat(5),
            Err(QueryError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_aggregate_construction() {
        let count = Expression::count();
        assert_eq!(count.data_type(), Some(DataType::Int));

        let avg = Expression::avg(Expression::from(1)).unwrap();
        assert_eq!(avg.data_type(), Some(DataType::Double));

        assert!(matches!(
            Expression::sum(Expression::from("a")),
            Err(QueryError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_aggregate_alias() {
        let avg = Expression::avg(Expression::from(1))
            .unwrap()
            .named("ageAvg")
            .unwrap();
        assert_eq!(avg.label(), "ageAvg");

        assert!(Expression::from(1).named("x").is_err());
    }

    #[test]
    fn test_case_builder() {
        let case = Expression::case()
            .when(Expression::from(true))
            .unwrap()
            .then("adult")
            .otherwise("minor")
            .unwrap();
        assert_eq!(case.data_type(), Some(DataType::Text));

        // Non-boolean condition rejected
        assert!(Expression::case().when(Expression::from(1)).is_err());

        // Branch results must agree
        let disagreeing = Expression::case()
            .when(Expression::from(true))
            .unwrap()
            .then("adult")
            .otherwise(2);
        assert!(matches!(disagreeing, Err(QueryError::TypeMismatch(_))));
    }

    #[test]
    fn test_match_builder_lowers_to_case() {
        let expr = Expression::match_value(Expression::from(19))
            .when(19)
            .unwrap()
            .then(1)
            .otherwise(2)
            .unwrap();
        match expr {
            Expression::Case { branches, .. } => assert_eq!(branches.len(), 1),
            other => panic!("expected case, got {other:?}"),
        }
    }

    #[test]
    fn test_in_list_type_check() {
        let expr = Expression::from(1).in_list(vec![Expression::from(2)]).unwrap();
        assert_eq!(expr.data_type(), Some(DataType::Bool));

        assert!(matches!(
            Expression::from(1).in_list(vec![Expression::from("a")]),
            Err(QueryError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_contains_aggregate_sees_through_operators() {
        let nested = Expression::avg(Expression::from(1)).unwrap().add(1).unwrap();
        assert!(nested.contains_aggregate());
        assert!(!nested.is_aggregate());

        let mut found = Vec::new();
        nested.collect_aggregates(&mut found);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_structural_equality() {
        let a = Expression::from(1).add(2).unwrap();
        let b = Expression::from(1).add(2).unwrap();
        let c = Expression::from(2).add(1).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
