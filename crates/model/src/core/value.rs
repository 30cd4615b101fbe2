use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, hash::Hash};
use uuid::Uuid;

/// A literal bound to a positional placeholder at execution time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Boolean(bool),
    Json(serde_json::Value),
    Uuid(Uuid),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        use Value::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Int(v) => v.hash(state),
            Uint(v) => v.hash(state),
            // Hash the bits of the float to handle NaN and -0.0 correctly
            Float(v) => v.to_bits().hash(state),
            String(v) => v.hash(state),
            Boolean(v) => v.hash(state),
            Json(v) => v.to_string().hash(state),
            Uuid(v) => v.hash(state),
            Bytes(v) => v.hash(state),
            Date(v) => v.hash(state),
            Timestamp(v) => v.hash(state),
            Null => {}
        }
    }
}

impl Value {
    /// Textual form of the value, used when a value has to be spelled out
    /// inside DDL (column defaults). `None` for values without one.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Int(v) => Some(v.to_string()),
            Value::Uint(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::String(v) => Some(v.clone()),
            Value::Boolean(v) => Some(v.to_string()),
            Value::Json(v) => Some(v.to_string()),
            Value::Uuid(v) => Some(v.to_string()),
            Value::Bytes(_) => None,
            Value::Date(v) => Some(v.to_string()),
            Value::Timestamp(v) => Some(v.to_rfc3339()),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Null => write!(f, "NULL"),
            other => write!(f, "{}", other.as_string().unwrap_or_default()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use serde_json::json;

    #[test]
    fn test_as_string() {
        assert_eq!(Value::Int(-4).as_string(), Some("-4".to_string()));
        assert_eq!(Value::Boolean(true).as_string(), Some("true".to_string()));
        assert_eq!(
            Value::Json(json!({"a": 1})).as_string(),
            Some(r#"{"a":1}"#.to_string())
        );
        assert_eq!(Value::Null.as_string(), None);
        assert_eq!(Value::Bytes(vec![1, 2]).as_string(), None);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
    }
}
