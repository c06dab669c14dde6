//! Incremental predicate composition.
//!
//! `PredicateBuilder` folds optional conditions under AND/OR with
//! "no predicate" as the identity element: an absent operand leaves the
//! accumulated predicate unchanged, and an absent accumulator adopts the
//! new operand. Call sites can therefore pass search filters that return
//! `None` when a field is unset, without any null-checking of their own.

use crate::error::QueryResult;
use crate::expression::Expression;

/// Accumulator for dynamically assembled boolean predicates
#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder {
    current: Option<Expression>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// AND a possibly-absent condition onto the accumulated predicate
    pub fn and(&mut self, predicate: impl Into<Option<Expression>>) -> QueryResult<&mut Self> {
        self.current = match (self.current.take(), predicate.into()) {
            (None, next) => next,
            (existing, None) => existing,
            (Some(existing), Some(next)) => Some(existing.and(next)?),
        };
        Ok(self)
    }

    /// OR a possibly-absent condition onto the accumulated predicate
    pub fn or(&mut self, predicate: impl Into<Option<Expression>>) -> QueryResult<&mut Self> {
        self.current = match (self.current.take(), predicate.into()) {
            (None, next) => next,
            (existing, None) => existing,
            (Some(existing), Some(next)) => Some(existing.or(next)?),
        };
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// The accumulated predicate, if any condition was ever present
    pub fn build(self) -> Option<Expression> {
        self.current
    }
}

impl From<PredicateBuilder> for Option<Expression> {
    fn from(builder: PredicateBuilder) -> Self {
        builder.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;

    fn condition(n: i64) -> Expression {
        Expression::from(n).eq(n).unwrap()
    }

    #[test]
    fn test_absent_is_identity() {
        // and(None) on empty stays empty
        let mut builder = PredicateBuilder::new();
        builder.and(None).unwrap();
        assert!(builder.is_empty());
        assert_eq!(builder.build(), None);

        // and(None) after a condition leaves it unchanged
        let mut builder = PredicateBuilder::new();
        builder.and(condition(1)).unwrap();
        builder.and(None).unwrap();
        assert_eq!(builder.build(), Some(condition(1)));

        // first present operand becomes the predicate
        let mut builder = PredicateBuilder::new();
        builder.or(None).unwrap();
        builder.or(condition(2)).unwrap();
        assert_eq!(builder.build(), Some(condition(2)));
    }

    #[test]
    fn test_present_operands_fold() {
        let mut builder = PredicateBuilder::new();
        builder.and(condition(1)).unwrap();
        builder.and(condition(2)).unwrap();
        let expected = condition(1).and(condition(2)).unwrap();
        assert_eq!(builder.build(), Some(expected));
    }

    #[test]
    fn test_mixed_and_or() {
        let mut builder = PredicateBuilder::new();
        builder.and(condition(1)).unwrap();
        builder.or(condition(2)).unwrap();
        let expected = condition(1).or(condition(2)).unwrap();
        assert_eq!(builder.build(), Some(expected));
    }

    #[test]
    fn test_non_boolean_operand_rejected() {
        let mut builder = PredicateBuilder::new();
        builder.and(condition(1)).unwrap();
        assert!(builder.and(Expression::from(5)).is_err());
    }
}
