//! Result projection: how a row of column values becomes a caller-facing
//! value.
//!
//! Three strategies, chosen per query:
//!
//! - **Flat**: a single select expression yields its value directly
//!   ([`TupleRow::single`], [`QueryExecutor::fetch_scalars`]).
//! - **Tuple**: [`TupleRow`], with values addressable by the originating
//!   expression, by a declared aggregate alias, or by position. Expression
//!   and alias lookups always agree.
//! - **Record**: rows bound onto a caller type through exactly one of
//!   three binding modes: constructor binding ([`FromRow`], the primary
//!   mode), setter binding ([`ApplyColumn`]), or direct field binding
//!   ([`WriteColumn`]). The modes are interchangeable for
//!   attribute-compatible records, and mutually exclusive per call.
//!
//! [`QueryExecutor::fetch_scalars`]: crate::executor::QueryExecutor::fetch_scalars

use crate::access::Value;
use crate::error::{QueryError, QueryResult};
use crate::expression::Expression;
use crate::query::Plan;
use std::sync::Arc;

/// One projected column: its originating expression and display labels
#[derive(Debug, Clone)]
pub struct ShapeItem {
    pub expr: Expression,
    /// Full label: aggregate alias or rendered expression
    pub label: String,
    /// Short name used for record binding: column name or aggregate alias
    pub short: String,
}

/// The select-list shape shared by every row of one result set
#[derive(Debug, Clone)]
pub struct ProjectionShape {
    items: Vec<ShapeItem>,
}

impl ProjectionShape {
    /// Build the shape for a select list
    pub fn from_selects(selects: &[Expression]) -> Arc<Self> {
        let items = selects
            .iter()
            .map(|expr| ShapeItem {
                expr: expr.clone(),
                label: expr.label(),
                short: Self::short_name(expr),
            })
            .collect();
        Arc::new(Self { items })
    }

    pub fn of_plan(plan: &Plan) -> Arc<Self> {
        Self::from_selects(plan.selects())
    }

    fn short_name(expr: &Expression) -> String {
        match expr {
            Expression::Column(path) => path
                .column_name()
                .map(str::to_string)
                .unwrap_or_else(|| path.to_string()),
            Expression::Aggregate {
                alias: Some(alias), ..
            } => alias.clone(),
            other => other.label(),
        }
    }

    pub fn items(&self) -> &[ShapeItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position of the column produced by a structurally equal expression
    pub fn position_of(&self, expr: &Expression) -> Option<usize> {
        self.items.iter().position(|item| &item.expr == expr)
    }

    /// Position of the column with a declared aggregate alias
    pub fn position_of_alias(&self, alias: &str) -> Option<usize> {
        self.items.iter().position(|item| {
            matches!(
                &item.expr,
                Expression::Aggregate { alias: Some(a), .. } if a == alias
            )
        })
    }
}

/// One materialized result row with named/positional access
#[derive(Debug, Clone)]
pub struct TupleRow {
    shape: Arc<ProjectionShape>,
    values: Vec<Value>,
}

impl TupleRow {
    pub(crate) fn new(shape: Arc<ProjectionShape>, values: Vec<Value>) -> QueryResult<Self> {
        if values.len() != shape.len() {
            return Err(QueryError::Execution(anyhow::anyhow!(
                "row has {} values but the projection shape has {} columns",
                values.len(),
                shape.len()
            )));
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> &ProjectionShape {
        &self.shape
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Look up a value by the expression that produced it
    pub fn get(&self, expr: &Expression) -> Option<&Value> {
        self.shape.position_of(expr).map(|i| &self.values[i])
    }

    /// Look up a value by a declared aggregate alias
    pub fn get_alias(&self, alias: &str) -> Option<&Value> {
        self.shape.position_of_alias(alias).map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Flat projection: the single value of a one-column row
    pub fn single(&self) -> QueryResult<&Value> {
        if self.values.len() != 1 {
            return Err(QueryError::Plan(format!(
                "flat projection needs exactly one select expression, got {}",
                self.values.len()
            )));
        }
        Ok(&self.values[0])
    }
}

/// Constructor binding: build a record from a whole row. The primary
/// record-binding mode; positions follow the select-expression order.
pub trait FromRow: Sized {
    fn from_row(row: &TupleRow) -> QueryResult<Self>;
}

/// Setter binding: a default-constructed record receives each column
/// through its setter logic, which may validate or coerce.
pub trait ApplyColumn: Default {
    fn apply_column(&mut self, column: &str, value: &Value) -> QueryResult<()>;
}

/// Direct field binding: a default-constructed record has each column
/// written straight into its field, bypassing setter logic.
pub trait WriteColumn: Default {
    fn write_column(&mut self, column: &str, value: &Value) -> QueryResult<()>;
}

/// Bind a row through the setter mode
pub fn bind_with_setters<R: ApplyColumn>(row: &TupleRow) -> QueryResult<R> {
    let mut record = R::default();
    for (item, value) in row.shape().items().iter().zip(row.values()) {
        record.apply_column(&item.short, value)?;
    }
    Ok(record)
}

/// Bind a row through the direct field mode
pub fn bind_with_fields<R: WriteColumn>(row: &TupleRow) -> QueryResult<R> {
    let mut record = R::default();
    for (item, value) in row.shape().items().iter().zip(row.values()) {
        record.write_column(&item.short, value)?;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DataType;
    use crate::expression::path::PathKind;
    use crate::expression::Path;

    fn username_expr() -> Expression {
        Expression::Column(Path::new(
            "member",
            vec!["username".to_string()],
            PathKind::Column(DataType::Text),
        ))
    }

    fn age_avg_expr() -> Expression {
        Expression::avg(Expression::Column(Path::new(
            "member",
            vec!["age".to_string()],
            PathKind::Column(DataType::Int),
        )))
        .unwrap()
        .named("ageAvg")
        .unwrap()
    }

    fn sample_row() -> TupleRow {
        let shape = ProjectionShape::from_selects(&[username_expr(), age_avg_expr()]);
        TupleRow::new(
            shape,
            vec![Value::Text("testName1".to_string()), Value::Double(25.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_by_expression_and_alias_agree() {
        let row = sample_row();
        let by_expr = row.get(&age_avg_expr()).unwrap();
        let by_alias = row.get_alias("ageAvg").unwrap();
        assert_eq!(by_expr, by_alias);
        assert_eq!(by_expr, &Value::Double(25.0));
    }

    #[test]
    fn test_lookup_by_position() {
        let row = sample_row();
        assert_eq!(
            row.get_index(0),
            Some(&Value::Text("testName1".to_string()))
        );
        assert_eq!(row.get_index(2), None);
    }

    #[test]
    fn test_unknown_lookups_return_none() {
        let row = sample_row();
        assert_eq!(row.get_alias("missing"), None);
        assert_eq!(row.get(&Expression::from(1)), None);
    }

    #[test]
    fn test_single_requires_one_column() {
        let row = sample_row();
        assert!(matches!(row.single(), Err(QueryError::Plan(_))));

        let shape = ProjectionShape::from_selects(&[username_expr()]);
        let row = TupleRow::new(shape, vec![Value::Text("x".to_string())]).unwrap();
        assert_eq!(row.single().unwrap(), &Value::Text("x".to_string()));
    }

    #[test]
    fn test_short_names_for_binding() {
        let shape = ProjectionShape::from_selects(&[username_expr(), age_avg_expr()]);
        let shorts: Vec<&str> = shape.items().iter().map(|i| i.short.as_str()).collect();
        assert_eq!(shorts, ["username", "ageAvg"]);
    }

    #[derive(Debug, Default, PartialEq)]
    struct Probe {
        username: String,
    }

    impl ApplyColumn for Probe {
        fn apply_column(&mut self, column: &str, value: &Value) -> QueryResult<()> {
            if column == "username" {
                self.username = value.as_str().unwrap_or_default().to_string();
            }
            Ok(())
        }
    }

    #[test]
    fn test_setter_binding() {
        let shape = ProjectionShape::from_selects(&[username_expr()]);
        let row = TupleRow::new(shape, vec![Value::Text("testName1".to_string())]).unwrap();
        let probe: Probe = bind_with_setters(&row).unwrap();
        assert_eq!(probe.username, "testName1");
    }
}
