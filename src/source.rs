//! The data-source collaborator boundary.
//!
//! The query layer issues logical operations only; everything that touches
//! actual storage goes through the [`Backend`] trait. `translate` is where
//! a frozen [`Plan`] is lowered into the backend's native request
//! representation, and `execute`/`execute_mutation` run such a request
//! within a session the backend scopes per execution.
//!
//! Backend failures are `anyhow`-typed: the executor wraps them into
//! [`QueryError::Execution`](crate::error::QueryError::Execution) with the
//! original cause attached, and never retries.
//!
//! The crate ships one reference implementation, [`MemBackend`], whose
//! native request is a volcano-style operator pipeline over in-memory
//! tables.

pub mod mem;
pub mod pipeline;

use crate::access::Row;
use crate::error::QueryResult;
use crate::query::plan::{Assignment, Plan};
use crate::schema::EntitySchema;
use std::sync::Arc;

pub use mem::{MemBackend, MemSession};
pub use pipeline::MemRequest;

/// A bulk mutation to be translated into a backend-native request
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    Update {
        plan: &'a Plan,
        assignments: &'a [Assignment],
    },
    Delete {
        plan: &'a Plan,
    },
}

impl Mutation<'_> {
    pub fn plan(&self) -> &Plan {
        match self {
            Mutation::Update { plan, .. } | Mutation::Delete { plan } => plan,
        }
    }
}

/// Storage collaborator consumed by the executor.
///
/// `Session` is whatever per-execution context the backend needs
/// (transaction handle, connection lease). The executor opens one session
/// around every `fetch*`/`update`/`delete` call and drops it on every exit
/// path, success or failure.
pub trait Backend {
    /// Backend-native request representation produced by `translate`
    type Request;
    /// Per-execution session context
    type Session;

    /// Resolve an entity schema by name
    fn resolve_schema(&self, entity: &str) -> QueryResult<Arc<EntitySchema>>;

    /// Open a session scoped to a single execution
    fn open_session(&self) -> anyhow::Result<Self::Session>;

    /// Lower a read plan into a native request
    fn translate(&self, plan: &Plan) -> QueryResult<Self::Request>;

    /// Lower a bulk mutation into a native request
    fn translate_mutation(&self, mutation: Mutation<'_>) -> QueryResult<Self::Request>;

    /// Execute a read request, returning rows aligned with the plan's
    /// select list
    fn execute(
        &self,
        request: &Self::Request,
        session: &mut Self::Session,
    ) -> anyhow::Result<Vec<Row>>;

    /// Execute a mutation request, returning the affected-row count as
    /// computed directly by the store
    fn execute_mutation(
        &self,
        request: &Self::Request,
        session: &mut Self::Session,
    ) -> anyhow::Result<u64>;
}
