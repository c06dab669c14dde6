//! Plan-level type checking.
//!
//! Individual operators are already checked when expressions are
//! constructed. What remains at `build()` time is context: every path must
//! resolve against an alias the plan actually binds, predicates must be
//! boolean, and ORDER BY entries must be comparable.

use crate::access::DataType;
use crate::error::{QueryError, QueryResult};
use crate::expression::{Expression, Path};
use crate::schema::EntitySchema;
use std::collections::HashMap;
use std::sync::Arc;

/// Type checker over the aliases a plan binds
pub struct TypeChecker<'a> {
    aliases: &'a HashMap<String, Arc<EntitySchema>>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(aliases: &'a HashMap<String, Arc<EntitySchema>>) -> Self {
        Self { aliases }
    }

    /// Verify that a single-segment column path resolves against its alias
    fn check_path(&self, path: &Path) -> QueryResult<()> {
        let schema = self.aliases.get(path.root()).ok_or_else(|| {
            QueryError::UnresolvedAlias {
                alias: path.root().to_string(),
                reason: "alias is not bound by from() or join()".to_string(),
            }
        })?;
        // Multi-segment navigation is rebased onto join aliases before
        // checking; anything left over has no join to resolve through.
        if path.segments().len() != 1 {
            return Err(QueryError::UnresolvedAlias {
                alias: path.root().to_string(),
                reason: format!("navigation path '{path}' has no matching join clause"),
            });
        }
        let column = &path.segments()[0];
        if schema.column(column).is_none() {
            return Err(QueryError::Schema(format!(
                "unknown column '{}' on entity '{}'",
                column, schema.name
            )));
        }
        Ok(())
    }

    /// Check every path in an expression tree against the bound aliases
    pub fn check(&self, expr: &Expression) -> QueryResult<()> {
        let mut result = Ok(());
        expr.visit_paths(&mut |path| {
            if result.is_ok() {
                result = self.check_path(path);
            }
        });
        result
    }

    /// Check an expression used as a filter or join predicate: paths must
    /// resolve and the expression must be boolean (or NULL-typed).
    pub fn check_predicate(&self, expr: &Expression) -> QueryResult<()> {
        self.check(expr)?;
        match expr.data_type() {
            Some(DataType::Bool) | None => Ok(()),
            Some(other) => Err(QueryError::TypeMismatch(format!(
                "predicate must be boolean, got {other}"
            ))),
        }
    }

    /// Check an ORDER BY expression. Every concrete value type orders, so
    /// only path resolution is verified here.
    pub fn check_orderable(&self, expr: &Expression) -> QueryResult<()> {
        self.check(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::EntityRef;
    use crate::schema::{Catalog, ColumnDef, EntitySchema};

    fn aliases() -> (Catalog, HashMap<String, Arc<EntitySchema>>) {
        let catalog = Catalog::new();
        let schema = catalog
            .register(
                EntitySchema::new("Member")
                    .with_column(ColumnDef::new("username", DataType::Text))
                    .with_column(ColumnDef::new("age", DataType::Int)),
            )
            .unwrap();
        let mut map = HashMap::new();
        map.insert("member".to_string(), schema);
        (catalog, map)
    }

    #[test]
    fn test_bound_alias_passes() {
        let (catalog, aliases) = aliases();
        let member = EntityRef::new(&catalog, "Member", "member").unwrap();
        let checker = TypeChecker::new(&aliases);

        let predicate = member.column("age").unwrap().ge(25).unwrap();
        checker.check_predicate(&predicate).unwrap();
    }

    #[test]
    fn test_unbound_alias_fails() {
        let (catalog, aliases) = aliases();
        let other = EntityRef::new(&catalog, "Member", "other").unwrap();
        let checker = TypeChecker::new(&aliases);

        let predicate = other.column("age").unwrap().ge(25).unwrap();
        assert!(matches!(
            checker.check_predicate(&predicate),
            Err(QueryError::UnresolvedAlias { .. })
        ));
    }

    #[test]
    fn test_non_boolean_predicate_fails() {
        let (catalog, aliases) = aliases();
        let member = EntityRef::new(&catalog, "Member", "member").unwrap();
        let checker = TypeChecker::new(&aliases);

        let not_a_predicate = member.column("age").unwrap();
        assert!(matches!(
            checker.check_predicate(&not_a_predicate),
            Err(QueryError::TypeMismatch(_))
        ));
    }
}
