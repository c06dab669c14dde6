//! Query construction: the fluent builder and the frozen plan it produces.

pub mod builder;
pub mod plan;

pub use builder::QueryBuilder;
pub use plan::{
    Assignment, JoinClause, JoinKind, JoinTarget, NullOrder, OrderSpec, Plan, SortOrder,
    SourceClause,
};
