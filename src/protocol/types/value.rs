//! Cell value type for query results.

use serde::{Serialize, Serializer};
use std::fmt;

/// A single cell value as delivered by the API.
///
/// Nested arrays and objects are kept opaque in [`Value::Json`]; the only
/// structured cell encoding interpreted by this crate is the multi-value
/// string (see [`QueryResult::multi_value_cell`](crate::QueryResult::multi_value_cell)).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value, kept as the JSON number to preserve precision.
    Number(serde_json::Number),
    /// String value.
    String(String),
    /// Nested JSON structure, not interpreted.
    Json(serde_json::Value),
}

impl Value {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text used when the value serves as a map key.
    ///
    /// Strings are used as is; everything else by its JSON text, so NULL
    /// keys as `"null"`.
    pub fn key_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }

    /// Convert back to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Json(v) => v.clone(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            nested => Value::Json(nested),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Json(v) => v.serialize(serializer),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_null() {
        let val = Value::from(json!(null));
        assert!(val.is_null());
        assert_eq!(val.as_str(), None);
        assert_eq!(val.key_text(), "null");
        assert_eq!(format!("{}", val), "NULL");
    }

    #[test]
    fn test_value_number() {
        let val = Value::from(json!(123.45));
        assert_eq!(val.to_f64(), Some(123.45));
        assert_eq!(val.to_i64(), None);
        assert_eq!(val.key_text(), "123.45");

        let int_val = Value::from(json!(42));
        assert_eq!(int_val.to_i64(), Some(42));
        assert_eq!(int_val.key_text(), "42");
    }

    #[test]
    fn test_value_nested_kept_opaque() {
        let val = Value::from(json!({"a": [1, 2]}));
        assert!(matches!(val, Value::Json(_)));
        assert_eq!(val.to_json(), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_value_serializes_as_plain_json() {
        let vals = vec![Value::from("x"), Value::Null, Value::from(true), Value::from(7_i64)];
        assert_eq!(serde_json::to_value(&vals).unwrap(), json!(["x", null, true, 7]));
    }
}
