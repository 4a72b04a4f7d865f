//! Data types for query results.

mod column;
mod row;
mod value;

pub use column::{Column, ColumnInfo};
pub use row::Row;
pub use value::Value;
