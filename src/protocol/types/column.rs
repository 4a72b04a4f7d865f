//! Column and ColumnInfo types for query results.
//!
//! `ColumnInfo` is validated once from the payload schema and then shared
//! (reference counted) by the result set and every row projected from it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::is_blank;

/// A column in a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its result set.
    #[serde(rename = "columnName")]
    pub name: String,
    /// Column data type as reported by the API.
    #[serde(rename = "type")]
    pub data_type: String,
}

impl Column {
    /// Create a column.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    /// Validate one schema entry of a raw payload.
    fn from_schema_entry(index: usize, entry: &serde_json::Value) -> Result<Self> {
        let fields = entry
            .as_object()
            .ok_or_else(|| Error::malformed_schema(index, "value is either null or not an object"))?;

        let name = fields
            .get("columnName")
            .and_then(|v| v.as_str())
            .filter(|s| !is_blank(s))
            .ok_or_else(|| Error::malformed_schema(index, "column name is invalid"))?;

        let data_type = fields
            .get("type")
            .and_then(|v| v.as_str())
            .filter(|s| !is_blank(s))
            .ok_or_else(|| Error::malformed_schema(index, "column type is invalid"))?;

        Ok(Self::new(name, data_type))
    }
}

/// Shared column information for all rows in a result set.
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    /// Column definitions in schema order.
    columns: Vec<Column>,
    /// Exact name to index lookup.
    by_name: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Build column info from already validated columns.
    ///
    /// Returns an error if a name is blank or repeated.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(columns.len());
        for (idx, col) in columns.iter().enumerate() {
            if is_blank(&col.name) {
                return Err(Error::malformed_schema(idx, "column name is invalid"));
            }
            if is_blank(&col.data_type) {
                return Err(Error::malformed_schema(idx, "column type is invalid"));
            }
            if by_name.insert(col.name.clone(), idx).is_some() {
                return Err(Error::malformed_schema(idx, "column name is not unique"));
            }
        }
        Ok(Self { columns, by_name })
    }

    /// Parse and validate the `schema` array of a raw payload.
    pub fn from_schema(schema: &[serde_json::Value]) -> Result<Self> {
        let columns = schema
            .iter()
            .enumerate()
            .map(|(idx, entry)| Column::from_schema_entry(idx, entry))
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// All columns in schema order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index.
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Find column index by name (exact, case-sensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Column info for every column except `skip`, in schema order.
    pub fn without(&self, skip: usize) -> Self {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != skip)
            .map(|(_, c)| c.clone())
            .collect();
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.name.clone(), idx))
            .collect();
        Self { columns, by_name }
    }
}
