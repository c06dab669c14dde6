//! Query execution front-end.
//!
//! `QueryExecutor` takes frozen plans and a backend and exposes the
//! fetch/mutation surface: eager `fetch` variants with their cardinality
//! contracts, combined page fetches, and bulk mutations. It holds no state
//! of its own: a frozen plan can be executed repeatedly and from multiple
//! threads, each call inside its own backend session. Sessions are released
//! on every exit path, including failures.

use crate::access::{Row, Value};
use crate::error::{QueryError, QueryResult};
use crate::projection::{
    bind_with_fields, bind_with_setters, ApplyColumn, FromRow, ProjectionShape, TupleRow,
    WriteColumn,
};
use crate::query::plan::{Assignment, Plan};
use crate::source::{Backend, Mutation};
use log::debug;
use std::sync::Arc;

/// One fetched page: the window's rows plus the total row count of the
/// same WHERE/JOIN context.
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<TupleRow>,
    pub total: u64,
    pub offset: u64,
    pub limit: Option<u64>,
}

/// Stateless executor over a data-source backend
#[derive(Debug)]
pub struct QueryExecutor<B: Backend> {
    backend: Arc<B>,
}

impl<B: Backend> Clone for QueryExecutor<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
        }
    }
}

impl<B: Backend> QueryExecutor<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Translate and run a read plan inside a fresh session
    fn run(&self, plan: &Plan) -> QueryResult<Vec<Row>> {
        let request = self.backend.translate(plan)?;
        let mut session = self.backend.open_session().map_err(QueryError::Execution)?;
        let rows = self
            .backend
            .execute(&request, &mut session)
            .map_err(QueryError::Execution)?;
        debug!(
            "fetched {} row(s) from '{}'",
            rows.len(),
            plan.source().entity
        );
        Ok(rows)
    }

    /// Fetch all rows as tuples (eagerly materialized)
    pub fn fetch(&self, plan: &Plan) -> QueryResult<Vec<TupleRow>> {
        let shape = ProjectionShape::of_plan(plan);
        self.run(plan)?
            .into_iter()
            .map(|row| TupleRow::new(shape.clone(), row))
            .collect()
    }

    /// Flat projection: fetch the single select expression's values
    pub fn fetch_scalars(&self, plan: &Plan) -> QueryResult<Vec<Value>> {
        if plan.selects().len() != 1 {
            return Err(QueryError::Plan(format!(
                "flat projection needs exactly one select expression, got {}",
                plan.selects().len()
            )));
        }
        self.run(plan)?
            .into_iter()
            .map(|row| {
                row.into_iter().next().ok_or_else(|| {
                    QueryError::Execution(anyhow::anyhow!("backend returned an empty row"))
                })
            })
            .collect()
    }

    /// Record projection, constructor binding (the primary mode)
    pub fn fetch_into<R: FromRow>(&self, plan: &Plan) -> QueryResult<Vec<R>> {
        self.fetch(plan)?.iter().map(R::from_row).collect()
    }

    /// Record projection, setter binding
    pub fn fetch_with_setters<R: ApplyColumn>(&self, plan: &Plan) -> QueryResult<Vec<R>> {
        self.fetch(plan)?.iter().map(bind_with_setters).collect()
    }

    /// Record projection, direct field binding
    pub fn fetch_with_fields<R: WriteColumn>(&self, plan: &Plan) -> QueryResult<Vec<R>> {
        self.fetch(plan)?.iter().map(bind_with_fields).collect()
    }

    /// Fetch at most one row; more than one is a cardinality violation
    pub fn fetch_one(&self, plan: &Plan) -> QueryResult<Option<TupleRow>> {
        let mut rows = self.fetch(plan)?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(QueryError::TooManyResults(n)),
        }
    }

    /// Fetch the first row, tolerating further matches (implicit limit 1)
    pub fn fetch_first(&self, plan: &Plan) -> QueryResult<Option<TupleRow>> {
        let limited = plan.with_limit(1);
        Ok(self.fetch(&limited)?.into_iter().next())
    }

    /// Count the rows the plan's WHERE/JOIN context produces, independent
    /// of its select list, ordering, and paging window.
    pub fn fetch_count(&self, plan: &Plan) -> QueryResult<u64> {
        if plan.group_by().is_empty() && !plan.is_aggregating() {
            let rows = self.run(&plan.count_variant())?;
            let value = rows
                .first()
                .and_then(|row| row.first())
                .and_then(Value::as_i64)
                .ok_or_else(|| {
                    QueryError::Execution(anyhow::anyhow!(
                        "count query did not return a single integer"
                    ))
                })?;
            Ok(value as u64)
        } else {
            // Grouped plans count their groups
            Ok(self.run(&plan.unpaged())?.len() as u64)
        }
    }

    /// Fetch the paged rows together with the total count of the identical
    /// WHERE/JOIN context.
    pub fn fetch_page(&self, plan: &Plan) -> QueryResult<Page> {
        let rows = self.fetch(plan)?;
        let total = self.fetch_count(plan)?;
        Ok(Page {
            rows,
            total,
            offset: plan.offset().unwrap_or(0),
            limit: plan.limit(),
        })
    }

    /// Bulk update: apply the assignments to every row matching the plan's
    /// filter, directly in the store, and return the affected-row count.
    ///
    /// Rows fetched before this call are not reconciled: any copies the
    /// caller still holds are stale after a bulk mutation and must be
    /// refetched.
    pub fn update(&self, plan: &Plan, assignments: &[Assignment]) -> QueryResult<u64> {
        self.mutate(Mutation::Update { plan, assignments })
    }

    /// Bulk delete of every row matching the plan's filter. The same
    /// staleness caveat as [`QueryExecutor::update`] applies.
    pub fn delete(&self, plan: &Plan) -> QueryResult<u64> {
        self.mutate(Mutation::Delete { plan })
    }

    fn mutate(&self, mutation: Mutation<'_>) -> QueryResult<u64> {
        let request = self.backend.translate_mutation(mutation)?;
        let mut session = self.backend.open_session().map_err(QueryError::Execution)?;
        let affected = self
            .backend
            .execute_mutation(&request, &mut session)
            .map_err(QueryError::Execution)?;
        debug!(
            "mutation affected {} row(s) in '{}'",
            affected,
            mutation.plan().source().entity
        );
        Ok(affected)
    }
}
