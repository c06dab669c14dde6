//! In-memory reference backend.
//!
//! Tables are plain row vectors guarded by a read/write lock; each stored
//! row keeps a stable id so bulk mutations can be planned against a
//! snapshot and then applied under the write lock without holding it while
//! subqueries run. Affected-row counts are computed here, in the store,
//! never by fetching first.

use crate::access::{Row, Value};
use crate::error::{QueryError, QueryResult};
use crate::query::plan::Plan;
use crate::schema::{Catalog, EntitySchema};
use crate::source::pipeline::{self, MemRequest, MutationRequest, ReadRequest};
use crate::source::{Backend, Mutation};
use anyhow::bail;
use log::trace;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Table {
    next_id: u64,
    rows: Vec<(u64, Row)>,
}

/// In-memory data source over the registered catalog
#[derive(Debug)]
pub struct MemBackend {
    catalog: Catalog,
    tables: RwLock<HashMap<String, Table>>,
    sessions: AtomicU64,
}

/// Scoped per-execution session. The in-memory store has no transactions;
/// the session exists to honor the one-session-per-execution contract and
/// is released on drop.
#[derive(Debug)]
pub struct MemSession {
    id: u64,
}

impl Drop for MemSession {
    fn drop(&mut self) {
        trace!("session {} released", self.id);
    }
}

impl MemBackend {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            tables: RwLock::new(HashMap::new()),
            sessions: AtomicU64::new(0),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Insert one row, validated against the entity schema
    pub fn insert(&self, entity: &str, values: Vec<Value>) -> QueryResult<()> {
        let schema = self.catalog.resolve(entity)?;
        if values.len() != schema.columns.len() {
            return Err(QueryError::Schema(format!(
                "entity '{}' has {} columns, got {} values",
                schema.name,
                schema.columns.len(),
                values.len()
            )));
        }
        for (value, column) in values.iter().zip(&schema.columns) {
            if value.is_null() && !column.nullable {
                return Err(QueryError::TypeMismatch(format!(
                    "column '{}' on entity '{}' is not nullable",
                    column.name, schema.name
                )));
            }
            if !value.is_compatible_with(column.data_type) {
                return Err(QueryError::TypeMismatch(format!(
                    "value {value:?} is not compatible with {} column '{}'",
                    column.data_type, column.name
                )));
            }
        }

        let mut tables = self.tables.write();
        let table = tables.entry(schema.name.clone()).or_default();
        let id = table.next_id;
        table.next_id += 1;
        table.rows.push((id, values));
        Ok(())
    }

    /// Number of stored rows for an entity (test support)
    pub fn row_count(&self, entity: &str) -> usize {
        self.tables
            .read()
            .get(entity)
            .map_or(0, |table| table.rows.len())
    }

    fn snapshot(&self, entity: &str) -> Vec<(u64, Row)> {
        self.tables
            .read()
            .get(entity)
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }
}

impl pipeline::ScanProvider for MemBackend {
    fn scan(&self, entity: &str) -> anyhow::Result<Vec<Row>> {
        let tables = self.tables.read();
        let rows = tables
            .get(entity)
            .map(|table| table.rows.iter().map(|(_, row)| row.clone()).collect())
            .unwrap_or_default();
        drop(tables);
        trace!("scan '{entity}'");
        Ok(rows)
    }

    fn run_subplan(&self, plan: &Plan) -> QueryResult<Vec<Row>> {
        let request = ReadRequest::lower(&self.catalog, plan)?;
        pipeline::execute_read(&request, self)
    }
}

impl Backend for MemBackend {
    type Request = MemRequest;
    type Session = MemSession;

    fn resolve_schema(&self, entity: &str) -> QueryResult<Arc<EntitySchema>> {
        self.catalog.resolve(entity)
    }

    fn open_session(&self) -> anyhow::Result<MemSession> {
        let id = self.sessions.fetch_add(1, Ordering::Relaxed);
        trace!("session {id} opened");
        Ok(MemSession { id })
    }

    fn translate(&self, plan: &Plan) -> QueryResult<MemRequest> {
        Ok(MemRequest::Read(ReadRequest::lower(&self.catalog, plan)?))
    }

    fn translate_mutation(&self, mutation: Mutation<'_>) -> QueryResult<MemRequest> {
        Ok(MemRequest::Mutate(MutationRequest::lower(
            &self.catalog,
            mutation,
        )?))
    }

    fn execute(&self, request: &MemRequest, session: &mut MemSession) -> anyhow::Result<Vec<Row>> {
        let MemRequest::Read(read) = request else {
            bail!("mutation request passed to execute()");
        };
        trace!("session {} executing read pipeline", session.id);
        pipeline::execute_read(read, self).map_err(anyhow::Error::new)
    }

    fn execute_mutation(
        &self,
        request: &MemRequest,
        session: &mut MemSession,
    ) -> anyhow::Result<u64> {
        let MemRequest::Mutate(mutation) = request else {
            bail!("read request passed to execute_mutation()");
        };
        trace!("session {} executing mutation pipeline", session.id);

        // Plan the mutation against a snapshot (subqueries may scan), then
        // apply by stable row id under the write lock.
        let snapshot = self.snapshot(&mutation.entity);
        let changes =
            pipeline::plan_mutation(mutation, &snapshot, self).map_err(anyhow::Error::new)?;

        let mut tables = self.tables.write();
        let table = tables.entry(mutation.entity.clone()).or_default();
        let mut affected = 0u64;
        for (id, change) in changes {
            match change {
                None => {
                    let before = table.rows.len();
                    table.rows.retain(|(row_id, _)| *row_id != id);
                    if table.rows.len() < before {
                        affected += 1;
                    }
                }
                Some(new_row) => {
                    if let Some((_, row)) =
                        table.rows.iter_mut().find(|(row_id, _)| *row_id == id)
                    {
                        *row = new_row;
                        affected += 1;
                    }
                }
            }
        }
        Ok(affected)
    }
}
