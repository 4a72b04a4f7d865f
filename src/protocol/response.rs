//! Response parsing for tabular query payloads.
//!
//! Payload format:
//!
//! ```text
//! {
//!   "schema": [ { "columnName": string, "type": string }, ... ],
//!   "data":   [ [ value, value, ... ], ... ]
//! }
//! ```
//!
//! The schema is validated eagerly. Row shape is only checked when a row is
//! read, so one malformed row does not prevent reading the others.

use crate::error::{Error, Result};
use crate::protocol::types::{ColumnInfo, Value};

/// One row of raw data as received.
#[derive(Debug, Clone)]
pub(crate) enum RowData {
    /// Row was a JSON array.
    Cells(Vec<Value>),
    /// Row was something else; holds a description of what it was.
    Invalid(&'static str),
}

impl RowData {
    fn from_json(row: serde_json::Value) -> Self {
        match row {
            serde_json::Value::Array(cells) => {
                RowData::Cells(cells.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Null => RowData::Invalid("null"),
            serde_json::Value::Object(_) => RowData::Invalid("an object"),
            _ => RowData::Invalid("a scalar"),
        }
    }

    /// Cells of this row, checked against the expected width.
    pub(crate) fn cells(&self, index: usize, width: usize) -> Result<&[Value]> {
        match self {
            RowData::Cells(cells) if cells.len() == width => Ok(cells),
            RowData::Cells(cells) => Err(Error::malformed_row(
                index,
                format!("expected {} values, found {}", width, cells.len()),
            )),
            RowData::Invalid(kind) => Err(Error::malformed_row(
                index,
                format!("expected an array of values, found {}", kind),
            )),
        }
    }
}

/// Parsed tabular payload.
#[derive(Debug)]
pub(crate) struct TabularPayload {
    pub columns: ColumnInfo,
    pub rows: Vec<RowData>,
}

/// Parse a tabular payload from a JSON value.
///
/// A payload that is not an object, or whose `schema`/`data` members are
/// absent or not arrays, yields zero columns / zero rows.
pub(crate) fn parse_tabular_payload(payload: serde_json::Value) -> Result<TabularPayload> {
    let serde_json::Value::Object(mut obj) = payload else {
        return Ok(TabularPayload {
            columns: ColumnInfo::default(),
            rows: Vec::new(),
        });
    };

    let columns = match obj.get("schema") {
        Some(serde_json::Value::Array(schema)) => ColumnInfo::from_schema(schema)?,
        _ => ColumnInfo::default(),
    };

    let rows = match obj.remove("data") {
        Some(serde_json::Value::Array(data)) => data.into_iter().map(RowData::from_json).collect(),
        _ => Vec::new(),
    };

    Ok(TabularPayload { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payload() {
        let payload = parse_tabular_payload(json!({
            "schema": [{"columnName": "id", "type": "s"}, {"columnName": "name", "type": "s"}],
            "data": [["1", "a"], ["2", "b"]]
        }))
        .unwrap();

        assert_eq!(payload.columns.len(), 2);
        assert_eq!(payload.rows.len(), 2);
        assert_eq!(
            payload.rows[1].cells(1, 2).unwrap(),
            &[Value::from("2"), Value::from("b")]
        );
    }

    #[test]
    fn test_absent_members_are_empty() {
        for payload in [json!({}), json!(null), json!({"schema": null, "data": "x"})] {
            let parsed = parse_tabular_payload(payload).unwrap();
            assert!(parsed.columns.is_empty());
            assert!(parsed.rows.is_empty());
        }
    }

    #[test]
    fn test_row_shape_checked_on_access() {
        let payload = parse_tabular_payload(json!({
            "schema": [{"columnName": "id", "type": "s"}],
            "data": [["1", "extra"], {"id": "2"}, null]
        }))
        .unwrap();

        assert_eq!(payload.rows.len(), 3);
        for (idx, row) in payload.rows.iter().enumerate() {
            let err = row.cells(idx, 1).unwrap_err();
            assert!(matches!(err, Error::MalformedRow { index, .. } if index == idx));
        }
    }
}
