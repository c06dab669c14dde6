//! Entity schema descriptors.
//!
//! An `EntitySchema` is the static description of a logical table: its name,
//! ordered typed columns, and the relationships reachable from it. Schemas
//! are built once at process start, registered in the catalog, and shared
//! read-only by every query afterwards.

use crate::access::DataType;
use serde::{Deserialize, Serialize};

/// Cardinality of a relationship as seen from the declaring entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    ManyToOne,
    OneToMany,
}

/// A typed column on an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A named relationship to another entity.
///
/// `local_column`/`remote_column` carry the natural join condition: the
/// owning side holds the foreign key in `local_column`, pointing at the
/// target's `remote_column`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub target: String,
    pub cardinality: Cardinality,
    pub owning: bool,
    pub local_column: String,
    pub remote_column: String,
}

impl Relationship {
    pub fn many_to_one(
        name: impl Into<String>,
        target: impl Into<String>,
        local_column: impl Into<String>,
        remote_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::ManyToOne,
            owning: true,
            local_column: local_column.into(),
            remote_column: remote_column.into(),
        }
    }

    pub fn one_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        local_column: impl Into<String>,
        remote_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            cardinality: Cardinality::OneToMany,
            owning: false,
            local_column: local_column.into(),
            remote_column: remote_column.into(),
        }
    }
}

/// Static description of a logical table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub relationships: Vec<Relationship>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a relationship by name
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_schema() -> EntitySchema {
        EntitySchema::new("Member")
            .with_column(ColumnDef::new("id", DataType::Int))
            .with_column(ColumnDef::new("username", DataType::Text))
            .with_column(ColumnDef::new("age", DataType::Int))
            .with_column(ColumnDef::new("team_id", DataType::Int).nullable())
            .with_relationship(Relationship::many_to_one("team", "Team", "team_id", "id"))
    }

    #[test]
    fn test_column_lookup() {
        let schema = member_schema();
        assert_eq!(schema.column("age").unwrap().data_type, DataType::Int);
        assert!(schema.column("team_id").unwrap().nullable);
        assert!(schema.column("nickname").is_none());
    }

    #[test]
    fn test_relationship_lookup() {
        let schema = member_schema();
        let rel = schema.relationship("team").unwrap();
        assert_eq!(rel.target, "Team");
        assert_eq!(rel.cardinality, Cardinality::ManyToOne);
        assert!(rel.owning);
        assert_eq!(rel.local_column, "team_id");
        assert_eq!(rel.remote_column, "id");
        assert!(schema.relationship("members").is_none());
    }
}
