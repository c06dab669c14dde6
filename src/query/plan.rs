//! Frozen query plans.
//!
//! A `Plan` is the immutable output of [`QueryBuilder::build`]: sources,
//! joins, filter, select list, grouping, ordering, and the paging window.
//! Once frozen it is a plain value: safe to share between threads, reuse
//! across repeated executions, and embed in subquery expressions.
//!
//! [`QueryBuilder::build`]: crate::query::QueryBuilder::build

use crate::expression::{Expression, Path};
use serde::{Deserialize, Serialize};

/// Sort direction for one ORDER BY entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// NULL placement for one ORDER BY entry.
///
/// `Default` defers to the executing backend's convention; `First`/`Last`
/// must be honored exactly, independent of that convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullOrder {
    Default,
    First,
    Last,
}

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderSpec {
    pub expr: Expression,
    pub order: SortOrder,
    pub nulls: NullOrder,
}

impl OrderSpec {
    pub fn new(expr: Expression, order: SortOrder) -> Self {
        Self {
            expr,
            order,
            nulls: NullOrder::Default,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullOrder::First;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullOrder::Last;
        self
    }
}

/// How a join clause combines its target with the rows built so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    /// Cross product narrowed by WHERE predicates. Risks cartesian blow-up,
    /// so it is only reachable through the explicit multi-source `from`.
    Theta,
}

/// What a join clause targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinTarget {
    /// A declared relationship off an already-bound alias
    Relationship(Path),
    /// A bare entity (theta joins)
    Entity(String),
}

/// One join clause in a frozen plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinClause {
    pub target: JoinTarget,
    pub entity: String,
    pub alias: String,
    pub kind: JoinKind,
    /// Extra ON predicate. Relationship joins always keep their natural
    /// equality; this is AND-ed on top of it.
    pub on: Option<Expression>,
    /// Materialize the joined entity together with its owner
    pub fetch: bool,
}

/// The root FROM entry of a plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceClause {
    pub entity: String,
    pub alias: String,
}

/// One SET entry of a bulk update: a column path and the expression whose
/// value it receives (evaluated against the pre-update row).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub column: Path,
    pub value: Expression,
}

impl Assignment {
    pub fn new(column: Path, value: impl Into<Expression>) -> crate::error::QueryResult<Self> {
        let value = value.into();
        if let (Some(target), Some(actual)) = (column.data_type(), value.data_type()) {
            let compatible = target == actual || (target.is_numeric() && actual.is_numeric());
            if !compatible {
                return Err(crate::error::QueryError::TypeMismatch(format!(
                    "cannot assign {actual} value to {target} column '{column}'"
                )));
            }
        }
        Ok(Self { column, value })
    }
}

/// An immutable, validated query description
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plan {
    pub(crate) source: SourceClause,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) filter: Option<Expression>,
    pub(crate) selects: Vec<Expression>,
    pub(crate) group_by: Vec<Expression>,
    pub(crate) order_by: Vec<OrderSpec>,
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
}

impl Plan {
    pub fn source(&self) -> &SourceClause {
        &self.source
    }

    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    pub fn filter(&self) -> Option<&Expression> {
        self.filter.as_ref()
    }

    pub fn selects(&self) -> &[Expression] {
        &self.selects
    }

    pub fn group_by(&self) -> &[Expression] {
        &self.group_by
    }

    pub fn order_by(&self) -> &[OrderSpec] {
        &self.order_by
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Every alias bound by this plan, source first
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.source.alias.as_str())
            .chain(self.joins.iter().map(|j| j.alias.as_str()))
    }

    /// Whether this plan aggregates (grouped, or aggregate select items)
    pub fn is_aggregating(&self) -> bool {
        !self.group_by.is_empty() || self.selects.iter().any(|e| e.contains_aggregate())
    }

    /// Count-only variant: same WHERE/JOIN context, whole-row count, no
    /// ordering or paging. Only meaningful for non-grouped plans.
    pub fn count_variant(&self) -> Plan {
        Plan {
            source: self.source.clone(),
            joins: self.joins.clone(),
            filter: self.filter.clone(),
            selects: vec![Expression::count()],
            group_by: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Same plan without ordering and paging
    pub(crate) fn unpaged(&self) -> Plan {
        let mut plan = self.clone();
        plan.order_by = Vec::new();
        plan.offset = None;
        plan.limit = None;
        plan
    }

    /// Same plan with the limit replaced
    pub(crate) fn with_limit(&self, limit: u64) -> Plan {
        let mut plan = self.clone();
        plan.limit = Some(limit);
        plan
    }
}
