//! Schema-validated navigation paths.
//!
//! A `Path` addresses a column or relationship reachable from a root alias,
//! e.g. `member.age` or `member.team.name`. Paths are pure addressing: they
//! never hold data, and equality is structural over the root alias and the
//! navigation chain. They can only be produced through [`EntityRef`] /
//! [`NavRef`], which check every step against the entity schema; an invalid
//! navigation fails with a `SchemaError` before any plan exists.

use crate::access::DataType;
use crate::error::{QueryError, QueryResult};
use crate::expression::Expression;
use crate::schema::{Catalog, EntitySchema};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// What the final navigation step addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PathKind {
    /// A typed column
    Column(DataType),
    /// A relationship; `target` is the entity it leads to
    Relationship { target: String },
}

/// A reference chain from a root alias through relationships to a column
/// or relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    root: String,
    segments: Vec<String>,
    kind: PathKind,
}

impl Path {
    pub(crate) fn new(root: impl Into<String>, segments: Vec<String>, kind: PathKind) -> Self {
        Self {
            root: root.into(),
            segments,
            kind,
        }
    }

    /// The root alias this path starts from
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Navigation steps after the root alias
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn kind(&self) -> &PathKind {
        &self.kind
    }

    /// The column type, if this path addresses a column
    pub fn data_type(&self) -> Option<DataType> {
        match &self.kind {
            PathKind::Column(data_type) => Some(*data_type),
            PathKind::Relationship { .. } => None,
        }
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self.kind, PathKind::Relationship { .. })
    }

    /// The final column name, if this path addresses a column
    pub fn column_name(&self) -> Option<&str> {
        match self.kind {
            PathKind::Column(_) => self.segments.last().map(String::as_str),
            PathKind::Relationship { .. } => None,
        }
    }
}

// Equality and hashing are structural over (root, segments); the cached
// kind is derived from the schema and carries no extra identity.
impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.segments == other.segments
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
        self.segments.hash(state);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

/// An aliased root entity: the starting point for building paths.
#[derive(Debug, Clone)]
pub struct EntityRef {
    catalog: Catalog,
    schema: Arc<EntitySchema>,
    alias: String,
}

impl EntityRef {
    /// Bind an entity to an alias. Fails with a schema error if the entity
    /// is not registered.
    pub fn new(catalog: &Catalog, entity: &str, alias: &str) -> QueryResult<Self> {
        let schema = catalog.resolve(entity)?;
        Ok(Self {
            catalog: catalog.clone(),
            schema,
            alias: alias.to_string(),
        })
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn entity(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// A column path off this alias
    pub fn path(&self, column: &str) -> QueryResult<Path> {
        let def = self.schema.column(column).ok_or_else(|| {
            QueryError::Schema(format!(
                "unknown column '{}' on entity '{}'",
                column, self.schema.name
            ))
        })?;
        Ok(Path::new(
            self.alias.clone(),
            vec![column.to_string()],
            PathKind::Column(def.data_type),
        ))
    }

    /// A column off this alias, as an expression
    pub fn column(&self, column: &str) -> QueryResult<Expression> {
        Ok(Expression::Column(self.path(column)?))
    }

    /// A relationship path off this alias (the target of a `join` call)
    pub fn rel(&self, relationship: &str) -> QueryResult<Path> {
        let rel = self.schema.relationship(relationship).ok_or_else(|| {
            QueryError::Schema(format!(
                "unknown relationship '{}' on entity '{}'",
                relationship, self.schema.name
            ))
        })?;
        Ok(Path::new(
            self.alias.clone(),
            vec![relationship.to_string()],
            PathKind::Relationship {
                target: rel.target.clone(),
            },
        ))
    }

    /// Navigate through a relationship, yielding a reference the target's
    /// columns can be addressed from (`member.nav("team")?.column("name")?`).
    pub fn nav(&self, relationship: &str) -> QueryResult<NavRef> {
        let rel = self.schema.relationship(relationship).ok_or_else(|| {
            QueryError::Schema(format!(
                "unknown relationship '{}' on entity '{}'",
                relationship, self.schema.name
            ))
        })?;
        let target = self.catalog.resolve(&rel.target)?;
        Ok(NavRef {
            catalog: self.catalog.clone(),
            schema: target,
            root: self.alias.clone(),
            segments: vec![relationship.to_string()],
        })
    }
}

/// A partially navigated path: a relationship chain waiting for its final
/// column step.
#[derive(Debug, Clone)]
pub struct NavRef {
    catalog: Catalog,
    schema: Arc<EntitySchema>,
    root: String,
    segments: Vec<String>,
}

impl NavRef {
    /// The entity the navigation currently points at
    pub fn entity(&self) -> &str {
        &self.schema.name
    }

    pub fn path(&self, column: &str) -> QueryResult<Path> {
        let def = self.schema.column(column).ok_or_else(|| {
            QueryError::Schema(format!(
                "unknown column '{}' on entity '{}'",
                column, self.schema.name
            ))
        })?;
        let mut segments = self.segments.clone();
        segments.push(column.to_string());
        Ok(Path::new(
            self.root.clone(),
            segments,
            PathKind::Column(def.data_type),
        ))
    }

    pub fn column(&self, column: &str) -> QueryResult<Expression> {
        Ok(Expression::Column(self.path(column)?))
    }

    pub fn nav(&self, relationship: &str) -> QueryResult<NavRef> {
        let rel = self.schema.relationship(relationship).ok_or_else(|| {
            QueryError::Schema(format!(
                "unknown relationship '{}' on entity '{}'",
                relationship, self.schema.name
            ))
        })?;
        let target = self.catalog.resolve(&rel.target)?;
        let mut segments = self.segments.clone();
        segments.push(relationship.to_string());
        Ok(NavRef {
            catalog: self.catalog.clone(),
            schema: target,
            root: self.root.clone(),
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, EntitySchema, Relationship};

    fn test_catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .register(
                EntitySchema::new("Member")
                    .with_column(ColumnDef::new("id", DataType::Int))
                    .with_column(ColumnDef::new("username", DataType::Text))
                    .with_column(ColumnDef::new("age", DataType::Int))
                    .with_column(ColumnDef::new("team_id", DataType::Int).nullable())
                    .with_relationship(Relationship::many_to_one("team", "Team", "team_id", "id")),
            )
            .unwrap();
        catalog
            .register(
                EntitySchema::new("Team")
                    .with_column(ColumnDef::new("id", DataType::Int))
                    .with_column(ColumnDef::new("name", DataType::Text)),
            )
            .unwrap();
        catalog
    }

    #[test]
    fn test_column_path_carries_type() {
        let catalog = test_catalog();
        let member = EntityRef::new(&catalog, "Member", "member").unwrap();

        let age = member.path("age").unwrap();
        assert_eq!(age.root(), "member");
        assert_eq!(age.segments(), ["age"]);
        assert_eq!(age.data_type(), Some(DataType::Int));
        assert_eq!(age.column_name(), Some("age"));
        assert_eq!(age.to_string(), "member.age");
    }

    #[test]
    fn test_unknown_column_fails_fast() {
        let catalog = test_catalog();
        let member = EntityRef::new(&catalog, "Member", "member").unwrap();
        assert!(matches!(
            member.path("nickname"),
            Err(QueryError::Schema(_))
        ));
    }

    #[test]
    fn test_navigation_path() {
        let catalog = test_catalog();
        let member = EntityRef::new(&catalog, "Member", "member").unwrap();

        let team_name = member.nav("team").unwrap().path("name").unwrap();
        assert_eq!(team_name.root(), "member");
        assert_eq!(team_name.segments(), ["team", "name"]);
        assert_eq!(team_name.data_type(), Some(DataType::Text));

        assert!(member.nav("teams").is_err());
        assert!(member.nav("team").unwrap().path("title").is_err());
    }

    #[test]
    fn test_relationship_path() {
        let catalog = test_catalog();
        let member = EntityRef::new(&catalog, "Member", "member").unwrap();

        let rel = member.rel("team").unwrap();
        assert!(rel.is_relationship());
        assert_eq!(rel.data_type(), None);
        assert_eq!(rel.to_string(), "member.team");
    }

    #[test]
    fn test_structural_equality_ignores_kind_cache() {
        let catalog = test_catalog();
        let m1 = EntityRef::new(&catalog, "Member", "m").unwrap();
        let m2 = EntityRef::new(&catalog, "Member", "m").unwrap();
        assert_eq!(m1.path("age").unwrap(), m2.path("age").unwrap());

        let other = EntityRef::new(&catalog, "Member", "sub").unwrap();
        assert_ne!(m1.path("age").unwrap(), other.path("age").unwrap());
    }
}
