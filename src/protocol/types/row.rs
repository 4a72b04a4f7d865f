//! Row type for projected query results.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::column::{Column, ColumnInfo};
use super::value::Value;

/// A row of a result set, keyed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values.
    values: Vec<Value>,
    /// Shared column information (reference counted).
    column_info: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with values and shared column info.
    pub fn new(values: Vec<Value>, column_info: Arc<ColumnInfo>) -> Self {
        Self {
            values,
            column_info,
        }
    }

    /// Get value by column index (0-based).
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get value by column name (exact match).
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.column_info
            .find_by_name(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get column information.
    pub fn columns(&self) -> &[Column] {
        self.column_info.columns()
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.column_info.column_names()
    }

    /// Iterate over `(column name, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.column_info
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .zip(self.values.iter())
    }

    /// Convert to a JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(name, value)| (name.to_string(), value.to_json()))
                .collect(),
        )
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.column_info.columns() == other.column_info.columns()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_test_column_info() -> Arc<ColumnInfo> {
        Arc::new(
            ColumnInfo::new(vec![Column::new("Name", "String"), Column::new("Score", "Int32")])
                .unwrap(),
        )
    }

    #[test]
    fn test_row_access() {
        let row = Row::new(vec![Value::from("alice"), Value::from(42_i64)], make_test_column_info());

        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Value::from("alice")));
        assert_eq!(row.get_by_name("Score"), Some(&Value::from(42_i64)));
        assert_eq!(row.get_by_name("score"), None);
    }

    #[test]
    fn test_row_serializes_as_object() {
        let row = Row::new(vec![Value::from("alice"), Value::Null], make_test_column_info());
        assert_eq!(row.to_json(), json!({"Name": "alice", "Score": null}));
        assert_eq!(serde_json::to_value(&row).unwrap(), row.to_json());
    }
}
