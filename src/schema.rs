//! Entity schemas and the catalog that registers them.

pub mod catalog;
pub mod entity;

pub use catalog::Catalog;
pub use entity::{Cardinality, ColumnDef, EntitySchema, Relationship};
