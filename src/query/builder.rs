//! Fluent query construction.
//!
//! `QueryBuilder` accumulates sources, joins, filters, grouping, ordering,
//! and the paging window, then freezes the result into an immutable
//! [`Plan`] via [`QueryBuilder::build`]. The builder is a single-owner
//! accumulator and is not meant to be shared; the frozen plan it produces
//! is a plain value that can be reused and executed concurrently.
//!
//! Builder misuse (double `from`, `fetch_join` without a join, `on` on a
//! theta source) fails immediately; everything that needs whole-plan
//! context (path resolution, group-by completeness, paging bounds) fails
//! in `build`.

use crate::error::{QueryError, QueryResult};
use crate::expression::path::PathKind;
use crate::expression::{EntityRef, Expression, Path, TypeChecker};
use crate::predicate::PredicateBuilder;
use crate::query::plan::{JoinClause, JoinKind, JoinTarget, OrderSpec, Plan, SourceClause};
use crate::schema::EntitySchema;
use std::collections::HashMap;
use std::sync::Arc;

/// Mutable accumulator for a query under construction
#[derive(Debug, Default)]
pub struct QueryBuilder {
    source: Option<SourceClause>,
    aliases: HashMap<String, Arc<EntitySchema>>,
    joins: Vec<JoinClause>,
    filter: PredicateBuilder,
    selects: Vec<Expression>,
    select_set: bool,
    group_by: Vec<Expression>,
    order_by: Vec<OrderSpec>,
    offset: Option<i64>,
    limit: Option<i64>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind_alias(&mut self, entity: &EntityRef) -> QueryResult<()> {
        if self.aliases.contains_key(entity.alias()) {
            return Err(QueryError::Plan(format!(
                "alias '{}' is bound twice",
                entity.alias()
            )));
        }
        self.aliases
            .insert(entity.alias().to_string(), entity.schema().clone());
        Ok(())
    }

    /// Set the root source entity
    pub fn from(mut self, entity: &EntityRef) -> QueryResult<Self> {
        if self.source.is_some() {
            return Err(QueryError::Plan(
                "from() called twice; use from_sources() for multi-source queries".to_string(),
            ));
        }
        self.bind_alias(entity)?;
        self.source = Some(SourceClause {
            entity: entity.entity().to_string(),
            alias: entity.alias().to_string(),
        });
        Ok(self)
    }

    /// Multi-source (cartesian) form: the cross product of all entities,
    /// expected to be narrowed by `filter()` predicates (theta join).
    pub fn from_sources(mut self, entities: &[&EntityRef]) -> QueryResult<Self> {
        if self.source.is_some() {
            return Err(QueryError::Plan(
                "from() called twice; use from_sources() for multi-source queries".to_string(),
            ));
        }
        let (first, rest) = entities.split_first().ok_or_else(|| {
            QueryError::Plan("from_sources() needs at least one entity".to_string())
        })?;
        self = self.from(first)?;
        for entity in rest {
            self.bind_alias(entity)?;
            self.joins.push(JoinClause {
                target: JoinTarget::Entity(entity.entity().to_string()),
                entity: entity.entity().to_string(),
                alias: entity.alias().to_string(),
                kind: JoinKind::Theta,
                on: None,
                fetch: false,
            });
        }
        Ok(self)
    }

    fn relationship_join(
        mut self,
        path: Path,
        target: &EntityRef,
        kind: JoinKind,
    ) -> QueryResult<Self> {
        let PathKind::Relationship { target: expected } = path.kind() else {
            return Err(QueryError::Plan(format!(
                "join target '{path}' is not a relationship path"
            )));
        };
        if !self.aliases.contains_key(path.root()) {
            return Err(QueryError::UnresolvedAlias {
                alias: path.root().to_string(),
                reason: "join path root is not bound by from() or join()".to_string(),
            });
        }
        if path.segments().len() != 1 {
            return Err(QueryError::Plan(format!(
                "join path '{path}' must be a relationship directly off an alias"
            )));
        }
        if expected != target.entity() {
            return Err(QueryError::Plan(format!(
                "relationship '{path}' targets entity '{expected}', not '{}'",
                target.entity()
            )));
        }
        self.bind_alias(target)?;
        self.joins.push(JoinClause {
            target: JoinTarget::Relationship(path),
            entity: target.entity().to_string(),
            alias: target.alias().to_string(),
            kind,
            on: None,
            fetch: false,
        });
        Ok(self)
    }

    /// Inner join along a relationship path; defaults to the relationship's
    /// natural equality condition.
    pub fn join(self, path: Path, target: &EntityRef) -> QueryResult<Self> {
        self.relationship_join(path, target, JoinKind::Inner)
    }

    /// Left outer join along a relationship path
    pub fn left_join(self, path: Path, target: &EntityRef) -> QueryResult<Self> {
        self.relationship_join(path, target, JoinKind::Left)
    }

    /// Add an ON predicate to the most recent join, AND-ed with the
    /// relationship's natural equality.
    pub fn on(mut self, predicate: Expression) -> QueryResult<Self> {
        let join = self.joins.last_mut().ok_or_else(|| {
            QueryError::Plan("on() must directly follow a join".to_string())
        })?;
        if join.kind == JoinKind::Theta {
            return Err(QueryError::Plan(
                "theta sources take their condition via filter(), not on()".to_string(),
            ));
        }
        if join.on.is_some() {
            return Err(QueryError::Plan(
                "join already has an on() predicate".to_string(),
            ));
        }
        join.on = Some(predicate);
        Ok(self)
    }

    /// Mark the most recent join as fetch-eager: the joined entity is
    /// materialized together with its owner in the same result rows.
    pub fn fetch_join(mut self) -> QueryResult<Self> {
        let join = self.joins.last_mut().ok_or_else(|| {
            QueryError::Plan("fetch_join() must directly follow a join".to_string())
        })?;
        if join.kind == JoinKind::Theta {
            return Err(QueryError::Plan(
                "theta sources cannot be fetch-eager".to_string(),
            ));
        }
        join.fetch = true;
        Ok(self)
    }

    /// AND a possibly-absent predicate onto the WHERE clause. Absent
    /// predicates are skipped, so optional search conditions can be passed
    /// through unconditionally.
    pub fn filter(mut self, predicate: impl Into<Option<Expression>>) -> QueryResult<Self> {
        self.filter.and(predicate)?;
        Ok(self)
    }

    /// Set the select list. Without an explicit select the plan returns the
    /// source entity's columns (plus any fetch-joined entity's columns).
    pub fn select(mut self, exprs: Vec<Expression>) -> QueryResult<Self> {
        if self.select_set {
            return Err(QueryError::Plan("select() called twice".to_string()));
        }
        if exprs.is_empty() {
            return Err(QueryError::Plan("select list cannot be empty".to_string()));
        }
        self.selects = exprs;
        self.select_set = true;
        Ok(self)
    }

    /// Append a GROUP BY expression
    pub fn group_by(mut self, expr: Expression) -> Self {
        self.group_by.push(expr);
        self
    }

    /// Append an ORDER BY entry
    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order_by.push(spec);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Expand "select the source entity" into its column list
    fn default_selects(&self) -> Vec<Expression> {
        let mut selects = Vec::new();
        let mut expand = |alias: &str| {
            if let Some(schema) = self.aliases.get(alias) {
                for column in &schema.columns {
                    selects.push(Expression::Column(Path::new(
                        alias.to_string(),
                        vec![column.name.clone()],
                        PathKind::Column(column.data_type),
                    )));
                }
            }
        };
        if let Some(source) = &self.source {
            expand(&source.alias);
        }
        for join in &self.joins {
            if join.fetch {
                expand(&join.alias);
            }
        }
        selects
    }

    /// Rebase multi-segment navigation paths onto the alias of the join
    /// that covers them (`member.team.name` -> `team.name` when
    /// `member.team` is joined as `team`).
    fn rebase_path(joins: &[JoinClause], mut path: Path) -> QueryResult<Path> {
        while path.segments().len() > 1 {
            let prefix = Path::new(
                path.root().to_string(),
                vec![path.segments()[0].clone()],
                PathKind::Relationship {
                    target: String::new(),
                },
            );
            let covering = joins.iter().find(|join| match &join.target {
                JoinTarget::Relationship(rel) => *rel == prefix,
                JoinTarget::Entity(_) => false,
            });
            match covering {
                Some(join) => {
                    path = Path::new(
                        join.alias.clone(),
                        path.segments()[1..].to_vec(),
                        path.kind().clone(),
                    );
                }
                None => {
                    return Err(QueryError::UnresolvedAlias {
                        alias: path.root().to_string(),
                        reason: format!(
                            "navigation path '{path}' has no matching join clause"
                        ),
                    })
                }
            }
        }
        Ok(path)
    }

    fn rebase(joins: &[JoinClause], expr: Expression) -> QueryResult<Expression> {
        expr.map_paths(&mut |path| Self::rebase_path(joins, path))
    }

    /// Validate and freeze the plan
    pub fn build(self) -> QueryResult<Plan> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| QueryError::Plan("no source; call from() first".to_string()))?;

        let offset = match self.offset {
            Some(n) if n < 0 => {
                return Err(QueryError::Range(format!("offset must be non-negative, got {n}")))
            }
            Some(n) => Some(n as u64),
            None => None,
        };
        let limit = match self.limit {
            Some(n) if n < 0 => {
                return Err(QueryError::Range(format!("limit must be non-negative, got {n}")))
            }
            Some(n) => Some(n as u64),
            None => None,
        };

        let selects = if self.select_set {
            self.selects.clone()
        } else {
            self.default_selects()
        };

        // Rebase navigation paths, then attach ON predicates back to their
        // joins (an ON may itself navigate through other joins).
        let joins = self.joins.clone();
        let mut rebased_joins = Vec::with_capacity(joins.len());
        for join in &joins {
            let mut rebased = join.clone();
            rebased.on = match join.on.clone() {
                Some(on) => Some(Self::rebase(&joins, on)?),
                None => None,
            };
            rebased_joins.push(rebased);
        }

        let selects = selects
            .into_iter()
            .map(|e| Self::rebase(&joins, e))
            .collect::<QueryResult<Vec<_>>>()?;
        let filter = match self.filter.clone().build() {
            Some(expr) => Some(Self::rebase(&joins, expr)?),
            None => None,
        };
        let group_by = self
            .group_by
            .iter()
            .cloned()
            .map(|e| Self::rebase(&joins, e))
            .collect::<QueryResult<Vec<_>>>()?;
        let order_by = self
            .order_by
            .iter()
            .cloned()
            .map(|spec| {
                Ok(OrderSpec {
                    expr: Self::rebase(&joins, spec.expr)?,
                    order: spec.order,
                    nulls: spec.nulls,
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;

        // Context checks: alias resolution and predicate typing
        let checker = TypeChecker::new(&self.aliases);
        if let Some(filter) = &filter {
            checker.check_predicate(filter)?;
            if filter.contains_aggregate() {
                return Err(QueryError::InvalidAggregation(
                    "aggregates are not allowed in filter predicates".to_string(),
                ));
            }
        }
        for join in &rebased_joins {
            if let Some(on) = &join.on {
                checker.check_predicate(on)?;
            }
        }
        for expr in &selects {
            checker.check(expr)?;
        }
        for expr in &group_by {
            checker.check(expr)?;
            if expr.contains_aggregate() {
                return Err(QueryError::InvalidAggregation(
                    "aggregates are not allowed in group by".to_string(),
                ));
            }
        }
        for spec in &order_by {
            checker.check_orderable(&spec.expr)?;
        }

        // Aggregation consistency
        for expr in &selects {
            let mut aggregates = Vec::new();
            expr.collect_aggregates(&mut aggregates);
            for aggregate in aggregates {
                if let Expression::Aggregate {
                    operand: Some(operand),
                    ..
                } = aggregate
                {
                    if operand.contains_aggregate() {
                        return Err(QueryError::InvalidAggregation(
                            "aggregates cannot be nested".to_string(),
                        ));
                    }
                }
            }
        }
        if !group_by.is_empty() {
            for expr in &selects {
                if !expr.contains_aggregate() && !group_by.contains(expr) {
                    return Err(QueryError::InvalidAggregation(format!(
                        "select expression '{expr}' is neither aggregated nor in group by"
                    )));
                }
            }
            for spec in &order_by {
                if !spec.expr.contains_aggregate()
                    && !group_by.contains(&spec.expr)
                    && !selects.contains(&spec.expr)
                {
                    return Err(QueryError::InvalidAggregation(format!(
                        "order by expression '{}' is neither aggregated nor in group by",
                        spec.expr
                    )));
                }
            }
        } else {
            let any_aggregate = selects.iter().any(|e| e.contains_aggregate());
            let any_plain = selects.iter().any(|e| !e.contains_aggregate());
            if any_aggregate && any_plain {
                return Err(QueryError::InvalidAggregation(
                    "select mixes aggregates with row expressions but has no group by"
                        .to_string(),
                ));
            }
        }

        Ok(Plan {
            source,
            joins: rebased_joins,
            filter,
            selects,
            group_by,
            order_by,
            offset,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DataType;
    use crate::schema::{Catalog, ColumnDef, Relationship};

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

    fn member(catalog: &Catalog) -> EntityRef {
        EntityRef::new(catalog, "Member", "member").unwrap()
    }

    fn team(catalog: &Catalog) -> EntityRef {
        EntityRef::new(catalog, "Team", "team").unwrap()
    }

    #[test]
    fn test_entity_select_expands_columns() {
        let catalog = test_catalog();
        let plan = QueryBuilder::new()
            .from(&member(&catalog))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(plan.selects().len(), 4);
        assert_eq!(plan.source().alias, "member");
    }

    #[test]
    fn test_double_from_fails() {
        let catalog = test_catalog();
        let result = QueryBuilder::new()
            .from(&member(&catalog))
            .unwrap()
            .from(&team(&catalog));
        assert!(matches!(result, Err(QueryError::Plan(_))));
    }

    #[test]
    fn test_duplicate_alias_fails() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let shadow = EntityRef::new(&catalog, "Team", "member").unwrap();
        let result = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .join(m.rel("team").unwrap(), &shadow);
        assert!(matches!(result, Err(QueryError::Plan(_))));
    }

    #[test]
    fn test_fetch_join_requires_preceding_join() {
        let catalog = test_catalog();
        let result = QueryBuilder::new()
            .from(&member(&catalog))
            .unwrap()
            .fetch_join();
        assert!(matches!(result, Err(QueryError::Plan(_))));
    }

    #[test]
    fn test_on_requires_relationship_join() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let t = team(&catalog);

        let result = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .on(Expression::from(true));
        assert!(matches!(result, Err(QueryError::Plan(_))));

        // Theta sources refuse on()
        let result = QueryBuilder::new()
            .from_sources(&[&m, &t])
            .unwrap()
            .on(Expression::from(true));
        assert!(matches!(result, Err(QueryError::Plan(_))));
    }

    #[test]
    fn test_join_target_entity_must_match_relationship() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let wrong = EntityRef::new(&catalog, "Member", "other").unwrap();
        let result = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .join(m.rel("team").unwrap(), &wrong);
        assert!(matches!(result, Err(QueryError::Plan(_))));
    }

    #[test]
    fn test_negative_paging_fails_at_build() {
        let catalog = test_catalog();
        let result = QueryBuilder::new()
            .from(&member(&catalog))
            .unwrap()
            .limit(-1)
            .build();
        assert!(matches!(result, Err(QueryError::Range(_))));

        let result = QueryBuilder::new()
            .from(&member(&catalog))
            .unwrap()
            .offset(-5)
            .build();
        assert!(matches!(result, Err(QueryError::Range(_))));
    }

    #[test]
    fn test_unjoined_navigation_fails_at_build() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let team_name = m.nav("team").unwrap().column("name").unwrap();
        let result = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .select(vec![team_name])
            .unwrap()
            .build();
        assert!(matches!(result, Err(QueryError::UnresolvedAlias { .. })));
    }

    #[test]
    fn test_navigation_rebases_onto_join_alias() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let t = team(&catalog);
        let team_name = m.nav("team").unwrap().column("name").unwrap();
        let plan = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .join(m.rel("team").unwrap(), &t)
            .unwrap()
            .select(vec![team_name])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(plan.selects()[0], t.column("name").unwrap());
    }

    #[test]
    fn test_group_by_completeness() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let t = team(&catalog);

        // username is neither aggregated nor grouped
        let result = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .join(m.rel("team").unwrap(), &t)
            .unwrap()
            .select(vec![
                m.column("username").unwrap(),
                Expression::avg(m.column("age").unwrap()).unwrap(),
            ])
            .unwrap()
            .group_by(t.column("name").unwrap())
            .build();
        assert!(matches!(result, Err(QueryError::InvalidAggregation(_))));
    }

    #[test]
    fn test_mixed_select_without_group_by_fails() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let result = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .select(vec![
                m.column("username").unwrap(),
                Expression::count(),
            ])
            .unwrap()
            .build();
        assert!(matches!(result, Err(QueryError::InvalidAggregation(_))));
    }

    #[test]
    fn test_unbound_alias_in_filter_fails() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let stray = EntityRef::new(&catalog, "Team", "stray").unwrap();
        let result = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .filter(stray.column("name").unwrap().eq("teamA").unwrap())
            .unwrap()
            .build();
        assert!(matches!(result, Err(QueryError::UnresolvedAlias { .. })));
    }

    #[test]
    fn test_plan_freezes_paging() {
        let catalog = test_catalog();
        let m = member(&catalog);
        let plan = QueryBuilder::new()
            .from(&m)
            .unwrap()
            .order_by(m.column("age").unwrap().asc())
            .offset(0)
            .limit(2)
            .build()
            .unwrap();
        assert_eq!(plan.offset(), Some(0));
        assert_eq!(plan.limit(), Some(2));
        assert_eq!(plan.order_by().len(), 1);

        // Count variant keeps context, drops paging and ordering
        let count = plan.count_variant();
        assert_eq!(count.limit(), None);
        assert_eq!(count.offset(), None);
        assert!(count.order_by().is_empty());
        assert_eq!(count.selects(), &[Expression::count()]);
    }
}
