//! relq: a typed query-building and execution layer over tabular data
//! sources.
//!
//! Queries are described as validated expression trees against registered
//! entity schemas, frozen into immutable [`Plan`]s, and executed through a
//! pluggable [`Backend`]. Construction fails fast: unknown columns,
//! mismatched operand types, and malformed plans are rejected before any
//! request reaches the data source.
//!
//! ```
//! use relq::access::{DataType, Value};
//! use relq::executor::QueryExecutor;
//! use relq::expression::EntityRef;
//! use relq::query::QueryBuilder;
//! use relq::schema::{Catalog, ColumnDef, EntitySchema};
//! use relq::source::MemBackend;
//! use std::sync::Arc;
//!
//! # fn main() -> relq::error::QueryResult<()> {
//! let catalog = Catalog::new();
//! catalog.register(
//!     EntitySchema::new("Member")
//!         .with_column(ColumnDef::new("username", DataType::Text))
//!         .with_column(ColumnDef::new("age", DataType::Int)),
//! )?;
//!
//! let backend = Arc::new(MemBackend::new(catalog.clone()));
//! backend.insert("Member", vec![Value::from("ada"), Value::from(36)])?;
//! backend.insert("Member", vec![Value::from("grace"), Value::from(45)])?;
//!
//! let member = EntityRef::new(&catalog, "Member", "member")?;
//! let plan = QueryBuilder::new()
//!     .from(&member)?
//!     .filter(member.column("age")?.ge(40)?)?
//!     .build()?;
//!
//! let executor = QueryExecutor::new(backend);
//! let rows = executor.fetch(&plan)?;
//! assert_eq!(rows.len(), 1);
//! assert_eq!(
//!     rows[0].get(&member.column("username")?),
//!     Some(&Value::from("grace"))
//! );
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod error;
pub mod executor;
pub mod expression;
pub mod predicate;
pub mod projection;
pub mod query;
pub mod schema;
pub mod source;

pub use access::{DataType, Value};
pub use error::{QueryError, QueryResult};
pub use executor::{Page, QueryExecutor};
pub use expression::{EntityRef, Expression, Path};
pub use predicate::PredicateBuilder;
pub use projection::{ApplyColumn, FromRow, TupleRow, WriteColumn};
pub use query::{Assignment, NullOrder, Plan, QueryBuilder, SortOrder};
pub use schema::{Catalog, ColumnDef, EntitySchema, Relationship};
pub use source::{Backend, MemBackend};
