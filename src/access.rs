//! Value-level building blocks shared by every layer: scalar values, their
//! types, and the row/layout shapes produced by a data source.

pub mod row;
pub mod value;

pub use row::{LayoutColumn, Row, RowLayout};
pub use value::{DataType, Value};
