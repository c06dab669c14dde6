//! Schema registry.
//!
//! The catalog owns every registered entity schema for the lifetime of the
//! process. It is cheap to clone (all clones share the same registry) and
//! safe to read from any thread.

use crate::error::{QueryError, QueryResult};
use crate::schema::EntitySchema;
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

/// Process-lifetime registry of entity schemas
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: Arc<DashMap<String, Arc<EntitySchema>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema. Registering the same entity name twice is an error;
    /// schemas are immutable once published.
    pub fn register(&self, schema: EntitySchema) -> QueryResult<Arc<EntitySchema>> {
        if self.schemas.contains_key(&schema.name) {
            return Err(QueryError::Schema(format!(
                "entity '{}' is already registered",
                schema.name
            )));
        }
        debug!(
            "registering entity '{}' ({} columns, {} relationships)",
            schema.name,
            schema.columns.len(),
            schema.relationships.len()
        );
        let shared = Arc::new(schema);
        self.schemas.insert(shared.name.clone(), shared.clone());
        Ok(shared)
    }

    /// Resolve an entity schema by name
    pub fn resolve(&self, entity: &str) -> QueryResult<Arc<EntitySchema>> {
        self.schemas
            .get(entity)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| QueryError::Schema(format!("unknown entity '{entity}'")))
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.schemas.contains_key(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    #[test]
    fn test_register_and_resolve() {
        let catalog = Catalog::new();
        catalog.register(EntitySchema::new("Member")).unwrap();

        assert!(catalog.contains("Member"));
        assert_eq!(catalog.resolve("Member").unwrap().name, "Member");
        assert!(matches!(
            catalog.resolve("Unknown"),
            Err(QueryError::Schema(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let catalog = Catalog::new();
        catalog.register(EntitySchema::new("Member")).unwrap();
        assert!(matches!(
            catalog.register(EntitySchema::new("Member")),
            Err(QueryError::Schema(_))
        ));
    }

    #[test]
    fn test_clones_share_registry() {
        let catalog = Catalog::new();
        let clone = catalog.clone();
        catalog.register(EntitySchema::new("Team")).unwrap();
        assert!(clone.contains("Team"));
    }
}
