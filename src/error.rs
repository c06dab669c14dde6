//! Error taxonomy for query construction and execution.
//!
//! Every failure mode has a dedicated variant so callers can match on the
//! phase that produced it: schema lookup, expression construction, plan
//! building, or execution. Construction-time errors are raised before any
//! request reaches the data source; `Execution` is the only variant that
//! wraps a backend failure, and it always carries the original cause.

use thiserror::Error;

/// Errors raised by the query layer.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Unknown entity, column, or relationship.
    #[error("schema error: {0}")]
    Schema(String),

    /// Operator or binding applied to incompatible value kinds.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Builder misuse: call ordering, duplicate sources, duplicate aliases.
    #[error("plan error: {0}")]
    Plan(String),

    /// A path in the plan does not resolve against any bound alias.
    #[error("unresolved alias '{alias}': {reason}")]
    UnresolvedAlias { alias: String, reason: String },

    /// Select expressions inconsistent with the GROUP BY list.
    #[error("invalid aggregation: {0}")]
    InvalidAggregation(String),

    /// Negative offset or limit.
    #[error("value out of range: {0}")]
    Range(String),

    /// `fetch_one` observed more than one row.
    #[error("expected at most one result, got {0}")]
    TooManyResults(usize),

    /// Failure surfaced by the data-source collaborator during translation
    /// or execution. Never retried here; the cause is attached unchanged.
    #[error("execution failed: {0}")]
    Execution(anyhow::Error),
}

impl From<anyhow::Error> for QueryError {
    fn from(err: anyhow::Error) -> Self {
        QueryError::Execution(err)
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::Schema("unknown column 'nickname' on entity 'Member'".to_string());
        assert_eq!(
            err.to_string(),
            "schema error: unknown column 'nickname' on entity 'Member'"
        );

        let err = QueryError::UnresolvedAlias {
            alias: "team".to_string(),
            reason: "alias is not bound by from() or join()".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unresolved alias 'team': alias is not bound by from() or join()"
        );

        let err = QueryError::TooManyResults(3);
        assert_eq!(err.to_string(), "expected at most one result, got 3");
    }

    #[test]
    fn test_execution_wraps_cause() {
        let cause = anyhow::anyhow!("connection reset");
        let err: QueryError = cause.into();
        assert!(matches!(err, QueryError::Execution(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
