//! Query result cursor.
//!
//! A `QueryResult` owns a fully fetched tabular payload and a row cursor over
//! it. The cursor starts before the first row; [`QueryResult::advance`] is the
//! only way forward and it pins at the end once the rows are exhausted.
//! [`QueryResult::reset_cursor`] and [`QueryResult::seek_row`] reposition it
//! within the already fetched rows.
//!
//! # Example
//!
//! ```
//! use cinchy_rs::QueryResult;
//!
//! # fn main() -> cinchy_rs::Result<()> {
//! let mut result = QueryResult::from_json(r#"{
//!     "schema": [{"columnName": "id", "type": "String"},
//!                {"columnName": "name", "type": "String"}],
//!     "data": [["1", "a"], ["2", "b"]]
//! }"#)?;
//!
//! while result.advance() {
//!     println!("{} = {}", result.cell_value("id")?, result.cell_value(1)?);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::protocol::decode::decode_multi_value;
use crate::protocol::is_blank;
use crate::protocol::response::{parse_tabular_payload, RowData};
use crate::protocol::types::{Column, ColumnInfo, Row, Value};

/// Reference to a column, by name or by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    /// Exact, case-sensitive column name.
    ByName(String),
    /// 0-based column index.
    ByIndex(i64),
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::ByName(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::ByName(name)
    }
}

impl From<&String> for ColumnRef {
    fn from(name: &String) -> Self {
        ColumnRef::ByName(name.clone())
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::ByIndex(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

impl From<i64> for ColumnRef {
    fn from(index: i64) -> Self {
        ColumnRef::ByIndex(index)
    }
}

impl From<i32> for ColumnRef {
    fn from(index: i32) -> Self {
        ColumnRef::ByIndex(index.into())
    }
}

/// Value of a keyed map entry produced by [`QueryResult::to_keyed_map`].
#[derive(Debug, Clone, PartialEq)]
pub enum KeyedValue {
    /// The single non-key column of a two column result.
    Value(Value),
    /// All non-key columns of a wider result.
    Record(Row),
}

impl KeyedValue {
    /// The plain value, if this entry is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            KeyedValue::Value(v) => Some(v),
            KeyedValue::Record(_) => None,
        }
    }

    /// The record, if this entry is one.
    pub fn as_record(&self) -> Option<&Row> {
        match self {
            KeyedValue::Record(r) => Some(r),
            KeyedValue::Value(_) => None,
        }
    }
}

/// Result of a query, with a row cursor.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Column metadata, shared with projected rows.
    columns: Arc<ColumnInfo>,
    /// Rows as received.
    rows: Vec<RowData>,
    /// Cursor position; `None` is before the first row, `rows.len()` is exhausted.
    position: Option<usize>,
}

impl QueryResult {
    /// Build a result from a decoded JSON payload.
    ///
    /// Fails with [`Error::MalformedSchema`] if a schema entry is not an
    /// object, has a blank name or type, or repeats a column name.
    pub fn from_value(payload: serde_json::Value) -> Result<Self> {
        let parsed = parse_tabular_payload(payload)?;
        Ok(Self {
            columns: Arc::new(parsed.columns),
            rows: parsed.rows,
            position: None,
        })
    }

    /// Build a result from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Build a result from a JSON response body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(body)?)
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.column_names()
    }

    /// Get a copy of the column descriptors.
    pub fn columns(&self) -> Vec<Column> {
        self.columns.columns().to_vec()
    }

    /// Resolve a column reference to its index.
    pub fn resolve_column(&self, reference: impl Into<ColumnRef>) -> Result<usize> {
        match reference.into() {
            ColumnRef::ByName(name) => {
                if is_blank(&name) {
                    return Err(Error::InvalidColumnReference { reference: name });
                }
                self.columns
                    .find_by_name(&name)
                    .ok_or(Error::ColumnNotFound { name })
            }
            ColumnRef::ByIndex(index) => usize::try_from(index)
                .ok()
                .filter(|idx| *idx < self.column_count())
                .ok_or(Error::ColumnIndexOutOfRange {
                    index,
                    count: self.column_count(),
                }),
        }
    }

    /// Current cursor position.
    ///
    /// `None` before the first row; equal to `row_count()` once exhausted.
    pub fn current_row_index(&self) -> Option<usize> {
        self.position
    }

    /// Move the cursor back before the first row.
    pub fn reset_cursor(&mut self) {
        self.position = None;
    }

    /// Move to the next row.
    ///
    /// Returns `true` if the cursor is now on a row. Once exhausted, keeps
    /// returning `false`.
    pub fn advance(&mut self) -> bool {
        let row_count = self.row_count();
        let next = match self.position {
            None => 0,
            Some(pos) if pos < row_count => pos + 1,
            Some(_) => row_count,
        };
        self.position = Some(next);
        next < row_count
    }

    /// Move the cursor to a specific row.
    pub fn seek_row(&mut self, index: usize) -> Result<()> {
        if index >= self.row_count() {
            return Err(Error::RowIndexOutOfRange {
                index,
                row_count: self.row_count(),
            });
        }
        self.position = Some(index);
        Ok(())
    }

    /// Row index the cursor is on, if it is on a row.
    fn on_row(&self) -> Result<usize> {
        match self.position {
            Some(pos) if pos < self.row_count() => Ok(pos),
            position => Err(Error::CursorOutOfBounds {
                position,
                row_count: self.row_count(),
            }),
        }
    }

    fn row_cells(&self, index: usize) -> Result<&[Value]> {
        self.rows[index].cells(index, self.column_count())
    }

    /// Get a cell of the current row.
    pub fn cell_value(&self, column: impl Into<ColumnRef>) -> Result<&Value> {
        let row = self.on_row()?;
        let col = self.resolve_column(column)?;
        Ok(&self.row_cells(row)?[col])
    }

    /// Get a multi-select cell of the current row as its list of values.
    ///
    /// Returns `None` if the cell is not a string or is blank.
    pub fn multi_value_cell(&self, column: impl Into<ColumnRef>) -> Result<Option<Vec<String>>> {
        match self.cell_value(column)?.as_str() {
            Some(text) if !is_blank(text) => decode_multi_value(text).map(Some),
            _ => Ok(None),
        }
    }

    /// Iterate over all rows, independent of the cursor.
    pub fn rows(&self) -> impl Iterator<Item = Result<&[Value]>> + '_ {
        (0..self.row_count()).map(move |idx| self.row_cells(idx))
    }

    /// Project every row into a record keyed by column name.
    ///
    /// Does not touch the cursor.
    pub fn to_object_array(&self) -> Result<Vec<Row>> {
        self.rows()
            .map(|cells| Ok(Row::new(cells?.to_vec(), Arc::clone(&self.columns))))
            .collect()
    }

    /// Deserialize every row into `T`, with fields named after columns.
    pub fn to_records<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.to_object_array()?
            .iter()
            .map(|row| Ok(serde_json::from_value(row.to_json())?))
            .collect()
    }

    /// Convert the result into a map keyed by one column.
    ///
    /// With two columns each key maps to the other column's value; with more,
    /// to a record of all the other columns. Entries keep row order. The cursor
    /// is reset and left exhausted.
    pub fn to_keyed_map(
        &mut self,
        key_column: impl Into<ColumnRef>,
    ) -> Result<IndexMap<String, KeyedValue>> {
        let count = self.column_count();
        if count < 2 {
            return Err(Error::InsufficientColumns { count });
        }
        self.reset_cursor();
        let key_idx = self.resolve_column(key_column)?;
        let rest = Arc::new(self.columns.without(key_idx));

        let mut map = IndexMap::with_capacity(self.row_count());
        while self.advance() {
            let row = self.on_row()?;
            let cells = self.row_cells(row)?;
            let key = cells
                .get(key_idx)
                .map(Value::key_text)
                .ok_or(Error::UndefinedKey { row })?;
            if map.contains_key(&key) {
                return Err(Error::DuplicateKey { key, row });
            }

            let others = cells
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != key_idx)
                .map(|(_, v)| v.clone());
            let entry = if count == 2 {
                KeyedValue::Value(others.into_iter().next().unwrap_or(Value::Null))
            } else {
                KeyedValue::Record(Row::new(others.collect(), Arc::clone(&rest)))
            };
            map.insert(key, entry);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn people() -> QueryResult {
        QueryResult::from_value(json!({
            "schema": [
                {"columnName": "id", "type": "Int32"},
                {"columnName": "name", "type": "String"},
                {"columnName": "tags", "type": "String"}
            ],
            "data": [
                [1, "alice", "a, 'b,c'"],
                [2, "bob", "  "],
                [3, "carol", null]
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_counts_and_names() {
        let result = people();
        assert_eq!(result.column_count(), 3);
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.column_names(), vec!["id", "name", "tags"]);
        assert_eq!(result.columns()[2], Column::new("tags", "String"));
    }

    #[test]
    fn test_resolve_column() {
        let result = people();
        assert_eq!(result.resolve_column("name").unwrap(), 1);
        assert_eq!(result.resolve_column(2).unwrap(), 2);
        assert!(matches!(
            result.resolve_column("Name"),
            Err(Error::ColumnNotFound { .. })
        ));
        assert!(matches!(
            result.resolve_column(3),
            Err(Error::ColumnIndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(matches!(
            result.resolve_column(-1),
            Err(Error::ColumnIndexOutOfRange { index: -1, .. })
        ));
        assert!(matches!(
            result.resolve_column(" "),
            Err(Error::InvalidColumnReference { .. })
        ));
    }

    #[test]
    fn test_cursor_walk() {
        let mut result = people();
        assert_eq!(result.current_row_index(), None);
        assert!(matches!(
            result.cell_value(0),
            Err(Error::CursorOutOfBounds { position: None, .. })
        ));

        assert!(result.advance());
        assert_eq!(result.cell_value("name").unwrap(), &Value::from("alice"));
        assert!(result.advance());
        assert!(result.advance());
        assert!(!result.advance());
        assert!(!result.advance());
        assert_eq!(result.current_row_index(), Some(3));
        assert!(matches!(
            result.cell_value(0),
            Err(Error::CursorOutOfBounds { position: Some(3), .. })
        ));

        result.seek_row(1).unwrap();
        assert_eq!(result.cell_value("id").unwrap().to_i64(), Some(2));
        assert!(matches!(
            result.seek_row(3),
            Err(Error::RowIndexOutOfRange { index: 3, row_count: 3 })
        ));

        result.reset_cursor();
        assert_eq!(result.current_row_index(), None);
    }

    #[test]
    fn test_multi_value_cell() {
        let mut result = people();
        result.advance();
        assert_eq!(
            result.multi_value_cell("tags").unwrap(),
            Some(vec!["a".to_string(), "b,c".to_string()])
        );
        result.advance();
        assert_eq!(result.multi_value_cell("tags").unwrap(), None);
        result.advance();
        assert_eq!(result.multi_value_cell("tags").unwrap(), None);
    }

    #[test]
    fn test_object_array_leaves_cursor() {
        let mut result = people();
        result.advance();
        let rows = result.to_object_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get_by_name("name"), Some(&Value::from("bob")));
        assert_eq!(result.current_row_index(), Some(0));
    }

    #[test]
    fn test_keyed_map_records() {
        let mut result = people();
        let map = result.to_keyed_map("id").unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["1", "2", "3"]);

        let carol = map["3"].as_record().unwrap();
        assert_eq!(carol.column_names(), vec!["name", "tags"]);
        assert_eq!(carol.get_by_name("name"), Some(&Value::from("carol")));
        assert_eq!(carol.get_by_name("id"), None);
        assert!(!result.advance());
    }

    #[test]
    fn test_keyed_map_null_key() {
        let mut result = QueryResult::from_value(json!({
            "schema": [{"columnName": "k", "type": "s"}, {"columnName": "v", "type": "s"}],
            "data": [[null, "a"], ["x", "b"]]
        }))
        .unwrap();
        let map = result.to_keyed_map("k").unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["null", "x"]);
        assert_eq!(map["null"].as_value(), Some(&Value::from("a")));

        let mut twice = QueryResult::from_value(json!({
            "schema": [{"columnName": "k", "type": "s"}, {"columnName": "v", "type": "s"}],
            "data": [[null, "a"], [null, "b"]]
        }))
        .unwrap();
        assert!(matches!(
            twice.to_keyed_map("k"),
            Err(Error::DuplicateKey { row: 1, .. })
        ));
    }

    #[test]
    fn test_to_records() {
        #[derive(serde::Deserialize)]
        struct Person {
            id: i64,
            name: String,
        }

        let people: Vec<Person> = people().to_records().unwrap();
        assert_eq!(people.len(), 3);
        assert_eq!(people[2].id, 3);
        assert_eq!(people[2].name, "carol");
    }
}
