//! Scalar values supplied by callers for `values` and `conditions`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A caller-supplied column value. Always bound through a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SqlValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// String value
    Text(String),
}

impl SqlValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_scalars() {
        let v: SqlValue = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(v, SqlValue::Text("5".into()));
        let v: SqlValue = serde_json::from_str("5").unwrap();
        assert_eq!(v, SqlValue::Int(5));
        let v: SqlValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, SqlValue::Float(2.5));
        let v: SqlValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, SqlValue::Bool(true));
        let v: SqlValue = serde_json::from_str("null").unwrap();
        assert!(v.is_null());
    }

    #[test]
    fn test_rejects_nested_values() {
        assert!(serde_json::from_str::<SqlValue>("[1, 2]").is_err());
        assert!(serde_json::from_str::<SqlValue>("{\"a\": 1}").is_err());
    }

    #[test]
    fn test_serializes_as_plain_json() {
        assert_eq!(serde_json::to_string(&SqlValue::from("9")).unwrap(), "\"9\"");
        assert_eq!(serde_json::to_string(&SqlValue::Null).unwrap(), "null");
    }
}
