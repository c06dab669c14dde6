//! The in-memory backend's native request: a lowered operator pipeline.
//!
//! `translate` turns a frozen plan into a `ReadRequest`: scans and joins in
//! declaration order, the natural-equality join conditions folded in, a
//! combined row layout, and the output expressions the later stages sort,
//! page, and project over. Execution then runs the stages in sequence
//! (scan, join, filter, aggregate, sort, page, project), materializing
//! eagerly at each step.
//!
//! Subqueries are uncorrelated, so each distinct subquery plan is executed
//! once per request and memoized for the remaining rows.

use crate::access::{LayoutColumn, Row, RowLayout, Value};
use crate::error::{QueryError, QueryResult};
use crate::expression::operator::AggregateKind;
use crate::expression::path::PathKind;
use crate::expression::{evaluate, EvalScope, Expression, Path};
use crate::query::plan::{JoinKind, JoinTarget, NullOrder, Plan, SortOrder};
use crate::schema::Catalog;
use crate::source::Mutation;
use anyhow::anyhow;
use std::cmp::Ordering;

/// Native request format of the in-memory backend
#[derive(Debug)]
pub enum MemRequest {
    Read(ReadRequest),
    Mutate(MutationRequest),
}

#[derive(Debug)]
pub(crate) struct ScanStage {
    pub(crate) entity: String,
}

#[derive(Debug)]
pub(crate) struct JoinStage {
    pub(crate) entity: String,
    pub(crate) kind: JoinKind,
    /// Combined join condition: natural equality AND any explicit ON.
    /// None for theta sources, which are narrowed by the filter stage.
    pub(crate) on: Option<Expression>,
    /// Number of columns the joined entity contributes (NULL padding width
    /// for unmatched left-join rows)
    pub(crate) width: usize,
}

#[derive(Debug)]
pub(crate) struct OrderStage {
    pub(crate) position: usize,
    pub(crate) order: SortOrder,
    pub(crate) nulls: NullOrder,
}

#[derive(Debug)]
pub(crate) struct GroupStage {
    pub(crate) keys: Vec<Expression>,
    pub(crate) aggregates: Vec<Expression>,
}

/// A lowered read plan
#[derive(Debug)]
pub struct ReadRequest {
    pub(crate) source: ScanStage,
    pub(crate) joins: Vec<JoinStage>,
    pub(crate) filter: Option<Expression>,
    pub(crate) layout: RowLayout,
    /// Every expression the pipeline computes per row/group: the select
    /// list first, then ORDER BY expressions not already selected
    pub(crate) outputs: Vec<Expression>,
    pub(crate) select_count: usize,
    pub(crate) group: Option<GroupStage>,
    pub(crate) order: Vec<OrderStage>,
    pub(crate) offset: Option<u64>,
    pub(crate) limit: Option<u64>,
}

/// A lowered bulk mutation
#[derive(Debug)]
pub struct MutationRequest {
    pub(crate) delete: bool,
    pub(crate) entity: String,
    pub(crate) filter: Option<Expression>,
    pub(crate) layout: RowLayout,
    /// (column position, value expression) pairs, in declaration order
    pub(crate) assignments: Vec<(usize, Expression)>,
}

fn push_entity_columns(
    layout: &mut RowLayout,
    catalog: &Catalog,
    entity: &str,
    alias: &str,
) -> QueryResult<usize> {
    let schema = catalog.resolve(entity)?;
    for column in &schema.columns {
        layout.push(LayoutColumn::new(alias, &column.name, column.data_type));
    }
    Ok(schema.columns.len())
}

impl ReadRequest {
    /// Lower a frozen plan against the catalog
    pub(crate) fn lower(catalog: &Catalog, plan: &Plan) -> QueryResult<Self> {
        let mut layout = RowLayout::new();
        push_entity_columns(
            &mut layout,
            catalog,
            &plan.source().entity,
            &plan.source().alias,
        )?;

        let mut joins = Vec::with_capacity(plan.joins().len());
        for join in plan.joins() {
            let on = match &join.target {
                JoinTarget::Relationship(path) => {
                    Some(Self::natural_equality(catalog, plan, path, join)?)
                }
                JoinTarget::Entity(_) => None,
            };
            let width =
                push_entity_columns(&mut layout, catalog, &join.entity, &join.alias)?;
            joins.push(JoinStage {
                entity: join.entity.clone(),
                kind: join.kind,
                on,
                width,
            });
        }

        let mut outputs: Vec<Expression> = plan.selects().to_vec();
        let select_count = outputs.len();
        let mut order = Vec::with_capacity(plan.order_by().len());
        for spec in plan.order_by() {
            let position = match outputs.iter().position(|e| e == &spec.expr) {
                Some(position) => position,
                None => {
                    outputs.push(spec.expr.clone());
                    outputs.len() - 1
                }
            };
            order.push(OrderStage {
                position,
                order: spec.order,
                nulls: spec.nulls,
            });
        }

        let group = if plan.is_aggregating() {
            let mut seen = Vec::new();
            for output in &outputs {
                output.collect_aggregates(&mut seen);
            }
            Some(GroupStage {
                keys: plan.group_by().to_vec(),
                aggregates: seen.into_iter().cloned().collect(),
            })
        } else {
            None
        };

        Ok(Self {
            source: ScanStage {
                entity: plan.source().entity.clone(),
            },
            joins,
            filter: plan.filter().cloned(),
            layout,
            outputs,
            select_count,
            group,
            order,
            offset: plan.offset(),
            limit: plan.limit(),
        })
    }

    /// The relationship's natural equality condition, AND-ed with any
    /// explicit ON predicate.
    fn natural_equality(
        catalog: &Catalog,
        plan: &Plan,
        path: &Path,
        join: &crate::query::plan::JoinClause,
    ) -> QueryResult<Expression> {
        let owner_alias = path.root();
        let owner_entity = if owner_alias == plan.source().alias {
            plan.source().entity.clone()
        } else {
            plan.joins()
                .iter()
                .find(|j| j.alias == owner_alias)
                .map(|j| j.entity.clone())
                .ok_or_else(|| QueryError::UnresolvedAlias {
                    alias: owner_alias.to_string(),
                    reason: "join path root is not bound".to_string(),
                })?
        };
        let owner_schema = catalog.resolve(&owner_entity)?;
        let relationship = &path.segments()[0];
        let rel = owner_schema.relationship(relationship).ok_or_else(|| {
            QueryError::Schema(format!(
                "unknown relationship '{relationship}' on entity '{owner_entity}'"
            ))
        })?;
        let target_schema = catalog.resolve(&join.entity)?;
        let local = owner_schema.column(&rel.local_column).ok_or_else(|| {
            QueryError::Schema(format!(
                "relationship '{relationship}' names unknown column '{}'",
                rel.local_column
            ))
        })?;
        let remote = target_schema.column(&rel.remote_column).ok_or_else(|| {
            QueryError::Schema(format!(
                "relationship '{relationship}' names unknown column '{}'",
                rel.remote_column
            ))
        })?;

        let natural = Expression::Column(Path::new(
            owner_alias.to_string(),
            vec![rel.local_column.clone()],
            PathKind::Column(local.data_type),
        ))
        .eq(Expression::Column(Path::new(
            join.alias.clone(),
            vec![rel.remote_column.clone()],
            PathKind::Column(remote.data_type),
        )))?;

        match &join.on {
            Some(extra) => natural.and(extra.clone()),
            None => Ok(natural),
        }
    }
}

impl MutationRequest {
    pub(crate) fn lower(catalog: &Catalog, mutation: Mutation<'_>) -> QueryResult<Self> {
        let plan = mutation.plan();
        if !plan.joins().is_empty() {
            return Err(QueryError::Plan(
                "bulk mutation cannot use joins; filter on the source entity".to_string(),
            ));
        }
        let schema = catalog.resolve(&plan.source().entity)?;
        let alias = plan.source().alias.clone();
        let mut layout = RowLayout::new();
        push_entity_columns(&mut layout, catalog, &plan.source().entity, &alias)?;

        let assignments = match mutation {
            Mutation::Update { assignments, .. } => {
                if assignments.is_empty() {
                    return Err(QueryError::Plan(
                        "bulk update needs at least one assignment".to_string(),
                    ));
                }
                let mut lowered = Vec::with_capacity(assignments.len());
                for assignment in assignments {
                    let column = &assignment.column;
                    if column.root() != alias || column.segments().len() != 1 {
                        return Err(QueryError::Plan(format!(
                            "assignment target '{column}' must be a column of source alias '{alias}'"
                        )));
                    }
                    let position =
                        layout.position(&alias, &column.segments()[0]).ok_or_else(|| {
                            QueryError::Schema(format!(
                                "unknown column '{}' on entity '{}'",
                                column.segments()[0],
                                schema.name
                            ))
                        })?;
                    lowered.push((position, assignment.value.clone()));
                }
                lowered
            }
            Mutation::Delete { .. } => Vec::new(),
        };

        Ok(Self {
            delete: matches!(mutation, Mutation::Delete { .. }),
            entity: plan.source().entity.clone(),
            filter: plan.filter().cloned(),
            layout,
            assignments,
        })
    }
}

/// Row supplier the pipeline pulls base rows and subquery results from
pub(crate) trait ScanProvider {
    fn scan(&self, entity: &str) -> anyhow::Result<Vec<Row>>;
    fn run_subplan(&self, plan: &Plan) -> QueryResult<Vec<Row>>;
}

/// Per-execution state: the provider plus memoized subquery results
pub(crate) struct ExecState<'a> {
    provider: &'a dyn ScanProvider,
    subqueries: Vec<(Plan, Vec<Value>)>,
}

impl<'a> ExecState<'a> {
    pub(crate) fn new(provider: &'a dyn ScanProvider) -> Self {
        Self {
            provider,
            subqueries: Vec::new(),
        }
    }

    fn subquery_values(&mut self, plan: &Plan) -> QueryResult<Vec<Value>> {
        if let Some((_, values)) = self.subqueries.iter().find(|(p, _)| p == plan) {
            return Ok(values.clone());
        }
        let rows = self.provider.run_subplan(plan)?;
        let values: Vec<Value> = rows
            .into_iter()
            .map(|mut row| {
                if row.is_empty() {
                    Value::Null
                } else {
                    row.swap_remove(0)
                }
            })
            .collect();
        self.subqueries.push((plan.clone(), values.clone()));
        Ok(values)
    }
}

/// Scope over one materialized row of the joined layout
pub(crate) struct RowScope<'a, 'b> {
    layout: &'b RowLayout,
    row: &'b [Value],
    state: &'b mut ExecState<'a>,
}

impl EvalScope for RowScope<'_, '_> {
    fn column(&mut self, path: &Path) -> QueryResult<Value> {
        if path.segments().len() != 1 {
            return Err(QueryError::Execution(anyhow!(
                "navigation path '{path}' was not lowered to a join alias"
            )));
        }
        let position = self
            .layout
            .position(path.root(), &path.segments()[0])
            .ok_or_else(|| {
                QueryError::Execution(anyhow!("column '{path}' is not in the row layout"))
            })?;
        self.row.get(position).cloned().ok_or_else(|| {
            QueryError::Execution(anyhow!(
                "column '{path}' is past the end of a partially joined row"
            ))
        })
    }

    fn subquery(&mut self, plan: &Plan) -> QueryResult<Vec<Value>> {
        self.state.subquery_values(plan)
    }
}

/// Scope over one aggregated group: group keys and aggregate results are
/// substituted as whole nodes, bare columns are unreachable.
struct GroupScope<'a, 'b> {
    overrides: &'b [(Expression, Value)],
    state: &'b mut ExecState<'a>,
}

impl EvalScope for GroupScope<'_, '_> {
    fn resolve_node(&mut self, expr: &Expression) -> Option<Value> {
        self.overrides
            .iter()
            .find(|(e, _)| e == expr)
            .map(|(_, v)| v.clone())
    }

    fn column(&mut self, path: &Path) -> QueryResult<Value> {
        Err(QueryError::Execution(anyhow!(
            "column '{path}' referenced outside the group keys"
        )))
    }

    fn subquery(&mut self, plan: &Plan) -> QueryResult<Vec<Value>> {
        self.state.subquery_values(plan)
    }
}

/// Running state for one aggregate within one group
#[derive(Debug, Clone)]
struct AggAccumulator {
    kind: AggregateKind,
    rows: i64,
    non_null: i64,
    int_sum: i64,
    double_sum: f64,
    saw_double: bool,
    min: Option<Value>,
    max: Option<Value>,
}

impl AggAccumulator {
    fn new(kind: AggregateKind) -> Self {
        Self {
            kind,
            rows: 0,
            non_null: 0,
            int_sum: 0,
            double_sum: 0.0,
            saw_double: false,
            min: None,
            max: None,
        }
    }

    /// Count a row for whole-row count
    fn update_row(&mut self) {
        self.rows += 1;
    }

    fn update(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        self.non_null += 1;
        match value {
            Value::Int(i) => {
                self.int_sum = self.int_sum.wrapping_add(*i);
                self.double_sum += *i as f64;
            }
            Value::Double(d) => {
                self.saw_double = true;
                self.double_sum += d;
            }
            _ => {}
        }
        let better_min = match &self.min {
            None => true,
            Some(current) => value.compare(current) == Some(Ordering::Less),
        };
        if better_min {
            self.min = Some(value.clone());
        }
        let better_max = match &self.max {
            None => true,
            Some(current) => value.compare(current) == Some(Ordering::Greater),
        };
        if better_max {
            self.max = Some(value.clone());
        }
    }

    fn finalize(&self) -> Value {
        match self.kind {
            AggregateKind::Count => Value::Int(self.rows + self.non_null),
            AggregateKind::Sum => {
                if self.non_null == 0 {
                    Value::Null
                } else if self.saw_double {
                    Value::Double(self.double_sum)
                } else {
                    Value::Int(self.int_sum)
                }
            }
            AggregateKind::Avg => {
                if self.non_null == 0 {
                    Value::Null
                } else {
                    Value::Double(self.double_sum / self.non_null as f64)
                }
            }
            AggregateKind::Min => self.min.clone().unwrap_or(Value::Null),
            AggregateKind::Max => self.max.clone().unwrap_or(Value::Null),
        }
    }
}

fn aggregate_kind(expr: &Expression) -> AggregateKind {
    match expr {
        Expression::Aggregate { kind, .. } => *kind,
        _ => unreachable!("group stage holds aggregate nodes only"),
    }
}

fn apply_join(
    left_rows: Vec<Row>,
    right_rows: Vec<Row>,
    stage: &JoinStage,
    layout: &RowLayout,
    state: &mut ExecState<'_>,
) -> QueryResult<Vec<Row>> {
    let mut out = Vec::new();
    match stage.kind {
        JoinKind::Theta => {
            for left in &left_rows {
                for right in &right_rows {
                    let mut combined = left.clone();
                    combined.extend(right.iter().cloned());
                    out.push(combined);
                }
            }
        }
        JoinKind::Inner | JoinKind::Left => {
            for left in &left_rows {
                let mut matched = false;
                for right in &right_rows {
                    let mut combined = left.clone();
                    combined.extend(right.iter().cloned());
                    let keep = match &stage.on {
                        Some(on) => {
                            let mut scope = RowScope {
                                layout,
                                row: &combined,
                                state: &mut *state,
                            };
                            matches!(evaluate(on, &mut scope)?, Value::Bool(true))
                        }
                        None => true,
                    };
                    if keep {
                        matched = true;
                        out.push(combined);
                    }
                }
                if !matched && stage.kind == JoinKind::Left {
                    let mut padded = left.clone();
                    padded.extend(std::iter::repeat(Value::Null).take(stage.width));
                    out.push(padded);
                }
            }
        }
    }
    Ok(out)
}

fn apply_aggregation(
    request: &ReadRequest,
    group: &GroupStage,
    rows: &[Row],
    state: &mut ExecState<'_>,
) -> QueryResult<Vec<Row>> {
    let mut groups: Vec<(Vec<Value>, Vec<AggAccumulator>)> = Vec::new();

    for row in rows {
        let mut key = Vec::with_capacity(group.keys.len());
        for key_expr in &group.keys {
            let mut scope = RowScope {
                layout: &request.layout,
                row,
                state: &mut *state,
            };
            key.push(evaluate(key_expr, &mut scope)?);
        }

        // Evaluate aggregate operands before touching the accumulators
        let mut operands = Vec::with_capacity(group.aggregates.len());
        for aggregate in &group.aggregates {
            match aggregate {
                Expression::Aggregate {
                    operand: Some(operand),
                    ..
                } => {
                    let mut scope = RowScope {
                        layout: &request.layout,
                        row,
                        state: &mut *state,
                    };
                    operands.push(Some(evaluate(operand, &mut scope)?));
                }
                _ => operands.push(None),
            }
        }

        let index = match groups.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                groups.push((
                    key,
                    group
                        .aggregates
                        .iter()
                        .map(|a| AggAccumulator::new(aggregate_kind(a)))
                        .collect(),
                ));
                groups.len() - 1
            }
        };
        for (accumulator, operand) in groups[index].1.iter_mut().zip(&operands) {
            match operand {
                Some(value) => accumulator.update(value),
                None => accumulator.update_row(),
            }
        }
    }

    // A global aggregate over zero rows still yields one group
    if group.keys.is_empty() && groups.is_empty() {
        groups.push((
            Vec::new(),
            group
                .aggregates
                .iter()
                .map(|a| AggAccumulator::new(aggregate_kind(a)))
                .collect(),
        ));
    }

    let mut out = Vec::with_capacity(groups.len());
    for (key, accumulators) in groups {
        let mut overrides: Vec<(Expression, Value)> =
            group.keys.iter().cloned().zip(key).collect();
        for (aggregate, accumulator) in group.aggregates.iter().zip(&accumulators) {
            overrides.push((aggregate.clone(), accumulator.finalize()));
        }
        let mut scope = GroupScope {
            overrides: &overrides,
            state: &mut *state,
        };
        let mut row = Vec::with_capacity(request.outputs.len());
        for output in &request.outputs {
            row.push(evaluate(output, &mut scope)?);
        }
        out.push(row);
    }
    Ok(out)
}

/// Compare two sort-column values with explicit NULL placement.
///
/// `First`/`Last` are absolute: they place NULLs at that end regardless of
/// direction. `Default` follows the backend convention (first for
/// ascending, last for descending).
pub(crate) fn compare_sort(
    a: &Value,
    b: &Value,
    order: SortOrder,
    nulls: NullOrder,
) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => null_position(order, nulls),
        (false, true) => null_position(order, nulls).reverse(),
        (false, false) => {
            let cmp = a.compare(b).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => cmp,
                SortOrder::Desc => cmp.reverse(),
            }
        }
    }
}

fn null_position(order: SortOrder, nulls: NullOrder) -> Ordering {
    let nulls_first = match nulls {
        NullOrder::First => true,
        NullOrder::Last => false,
        NullOrder::Default => matches!(order, SortOrder::Asc),
    };
    if nulls_first {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Run a lowered read request to completion
pub(crate) fn execute_read(
    request: &ReadRequest,
    provider: &dyn ScanProvider,
) -> QueryResult<Vec<Row>> {
    let mut state = ExecState::new(provider);

    let mut rows = provider
        .scan(&request.source.entity)
        .map_err(QueryError::Execution)?;
    for stage in &request.joins {
        let right = provider
            .scan(&stage.entity)
            .map_err(QueryError::Execution)?;
        rows = apply_join(rows, right, stage, &request.layout, &mut state)?;
    }

    if let Some(filter) = &request.filter {
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let mut scope = RowScope {
                layout: &request.layout,
                row: &row,
                state: &mut state,
            };
            // NULL verdicts filter the row out, as in WHERE
            if matches!(evaluate(filter, &mut scope)?, Value::Bool(true)) {
                kept.push(row);
            }
        }
        rows = kept;
    }

    let mut computed: Vec<Row> = if let Some(group) = &request.group {
        apply_aggregation(request, group, &rows, &mut state)?
    } else {
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(request.outputs.len());
            for output in &request.outputs {
                let mut scope = RowScope {
                    layout: &request.layout,
                    row,
                    state: &mut state,
                };
                values.push(evaluate(output, &mut scope)?);
            }
            out.push(values);
        }
        out
    };

    if !request.order.is_empty() {
        computed.sort_by(|a, b| {
            for stage in &request.order {
                let cmp = compare_sort(&a[stage.position], &b[stage.position], stage.order, stage.nulls);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });
    }

    let offset = request.offset.unwrap_or(0) as usize;
    let mut paged: Vec<Row> = computed.into_iter().skip(offset).collect();
    if let Some(limit) = request.limit {
        paged.truncate(limit as usize);
    }

    Ok(paged
        .into_iter()
        .map(|row| row[..request.select_count].to_vec())
        .collect())
}

/// Decide which snapshot rows a mutation touches and, for updates, the
/// replacement rows. Every assignment value is evaluated against the
/// pre-update row. The store applies the returned changes by row id.
pub(crate) fn plan_mutation(
    request: &MutationRequest,
    rows: &[(u64, Row)],
    provider: &dyn ScanProvider,
) -> QueryResult<Vec<(u64, Option<Row>)>> {
    let mut state = ExecState::new(provider);
    let mut changes = Vec::new();
    for (id, row) in rows {
        let matched = match &request.filter {
            Some(filter) => {
                let mut scope = RowScope {
                    layout: &request.layout,
                    row,
                    state: &mut state,
                };
                matches!(evaluate(filter, &mut scope)?, Value::Bool(true))
            }
            None => true,
        };
        if !matched {
            continue;
        }
        if request.delete {
            changes.push((*id, None));
        } else {
            let mut new_values = Vec::with_capacity(request.assignments.len());
            for (position, value_expr) in &request.assignments {
                let mut scope = RowScope {
                    layout: &request.layout,
                    row,
                    state: &mut state,
                };
                new_values.push((*position, evaluate(value_expr, &mut scope)?));
            }
            let mut updated = row.clone();
            for (position, value) in new_values {
                updated[position] = value;
            }
            changes.push((*id, Some(updated)));
        }
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_sort_null_placement_is_absolute() {
        let null = Value::Null;
        let five = Value::Int(5);

        // nulls_last puts NULL after regardless of direction
        assert_eq!(
            compare_sort(&null, &five, SortOrder::Desc, NullOrder::Last),
            Ordering::Greater
        );
        assert_eq!(
            compare_sort(&null, &five, SortOrder::Asc, NullOrder::Last),
            Ordering::Greater
        );
        assert_eq!(
            compare_sort(&null, &five, SortOrder::Asc, NullOrder::First),
            Ordering::Less
        );

        // Default: first for ascending, last for descending
        assert_eq!(
            compare_sort(&null, &five, SortOrder::Asc, NullOrder::Default),
            Ordering::Less
        );
        assert_eq!(
            compare_sort(&null, &five, SortOrder::Desc, NullOrder::Default),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_sort_direction() {
        let a = Value::Int(1);
        let b = Value::Int(2);
        assert_eq!(
            compare_sort(&a, &b, SortOrder::Asc, NullOrder::Default),
            Ordering::Less
        );
        assert_eq!(
            compare_sort(&a, &b, SortOrder::Desc, NullOrder::Default),
            Ordering::Greater
        );
    }

    #[test]
    fn test_accumulator_count_sum_avg() {
        let mut count = AggAccumulator::new(AggregateKind::Count);
        count.update_row();
        count.update_row();
        assert_eq!(count.finalize(), Value::Int(2));

        let mut sum = AggAccumulator::new(AggregateKind::Sum);
        for age in [19, 20, 30, 31] {
            sum.update(&Value::Int(age));
        }
        assert_eq!(sum.finalize(), Value::Int(100));

        let mut avg = AggAccumulator::new(AggregateKind::Avg);
        for age in [19, 20, 30, 31] {
            avg.update(&Value::Int(age));
        }
        assert_eq!(avg.finalize(), Value::Double(25.0));
    }

    #[test]
    fn test_accumulator_ignores_nulls() {
        let mut count = AggAccumulator::new(AggregateKind::Count);
        count.update(&Value::Int(1));
        count.update(&Value::Null);
        assert_eq!(count.finalize(), Value::Int(1));

        let mut min = AggAccumulator::new(AggregateKind::Min);
        min.update(&Value::Null);
        assert_eq!(min.finalize(), Value::Null);
        min.update(&Value::Int(30));
        min.update(&Value::Int(19));
        assert_eq!(min.finalize(), Value::Int(19));

        let mut max = AggAccumulator::new(AggregateKind::Max);
        max.update(&Value::Int(30));
        max.update(&Value::Int(31));
        max.update(&Value::Null);
        assert_eq!(max.finalize(), Value::Int(31));
    }

    #[test]
    fn test_empty_sum_and_avg_are_null() {
        assert_eq!(
            AggAccumulator::new(AggregateKind::Sum).finalize(),
            Value::Null
        );
        assert_eq!(
            AggAccumulator::new(AggregateKind::Avg).finalize(),
            Value::Null
        );
    }
}
