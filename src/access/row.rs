//! Rows and column layouts.
//!
//! A `Row` is the unit a data source produces: an ordered list of values.
//! `RowLayout` describes what those positions mean while a request is being
//! evaluated: each position is an alias-qualified column, so expression
//! paths can be resolved to indices without string matching per row.

use crate::access::{DataType, Value};
use std::collections::HashMap;

/// A materialized row of column values
pub type Row = Vec<Value>;

/// One position in a row layout: an alias-qualified column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutColumn {
    pub alias: String,
    pub column: String,
    pub data_type: DataType,
}

impl LayoutColumn {
    pub fn new(alias: impl Into<String>, column: impl Into<String>, data_type: DataType) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
            data_type,
        }
    }
}

/// Ordered column layout with O(1) alias.column position lookup
#[derive(Debug, Clone, Default)]
pub struct RowLayout {
    columns: Vec<LayoutColumn>,
    index: HashMap<(String, String), usize>,
}

impl RowLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column to the layout
    pub fn push(&mut self, column: LayoutColumn) {
        self.index.insert(
            (column.alias.clone(), column.column.clone()),
            self.columns.len(),
        );
        self.columns.push(column);
    }

    /// Find the position of an alias-qualified column
    pub fn position(&self, alias: &str, column: &str) -> Option<usize> {
        self.index
            .get(&(alias.to_string(), column.to_string()))
            .copied()
    }

    pub fn columns(&self) -> &[LayoutColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
