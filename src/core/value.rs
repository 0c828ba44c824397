use crate::core::{PersistenceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single column value in wide-column terms.
///
/// `Counter(i64)` is the read-side representation of a counter column;
/// counter mutations never travel as plain values, only as signed deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValue {
    Null,
    Boolean(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
    List(Vec<ColumnValue>),
    Set(Vec<ColumnValue>),
    Map(Vec<(ColumnValue, ColumnValue)>),
    Counter(i64),
}

impl ColumnValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
            Self::Blob(_) => "blob",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Counter(_) => "counter",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view used for counter reads; accepts the integer shapes a
    /// driver may hand back for a counter column.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(i64::from(*v)),
            Self::BigInt(v) | Self::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// Diagnostic JSON rendering used in trace output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(v) => serde_json::Value::from(*v),
            Self::Int(v) => serde_json::Value::from(*v),
            Self::BigInt(v) | Self::Counter(v) => serde_json::Value::from(*v),
            Self::Double(v) => serde_json::Value::from(*v),
            Self::Text(v) => serde_json::Value::from(v.clone()),
            Self::Uuid(v) => serde_json::Value::from(v.to_string()),
            Self::Timestamp(v) => serde_json::Value::from(v.to_rfc3339()),
            Self::Blob(v) => serde_json::Value::from(format!("0x{}", hex_string(v))),
            Self::List(items) | Self::Set(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.to_string(), v.to_json());
                }
                serde_json::Value::Object(map)
            }
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) | Self::Counter(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Blob(v) => write!(f, "0x{}", hex_string(v)),
            Self::List(_) | Self::Set(_) | Self::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Conversion between Rust field types and [`ColumnValue`].
///
/// Implemented for the supported scalar types, `Option<T>`, and the tracked
/// container types; the derive macro leans on this so it never has to reason
/// about concrete field types itself.
pub trait ColumnCodec: Sized {
    fn cql_type() -> &'static str;
    fn to_column(&self) -> ColumnValue;
    fn from_column(value: ColumnValue) -> Result<Self>;
}

fn unexpected<T>(expected: &str, got: &ColumnValue) -> Result<T> {
    Err(PersistenceError::Codec(format!(
        "expected {expected}, got {}",
        got.type_name()
    )))
}

impl ColumnCodec for bool {
    fn cql_type() -> &'static str {
        "boolean"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Boolean(*self)
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Boolean(v) => Ok(v),
            other => unexpected("boolean", &other),
        }
    }
}

impl ColumnCodec for i32 {
    fn cql_type() -> &'static str {
        "int"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Int(*self)
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Int(v) => Ok(v),
            other => unexpected("int", &other),
        }
    }
}

impl ColumnCodec for i64 {
    fn cql_type() -> &'static str {
        "bigint"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::BigInt(*self)
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Int(v) => Ok(i64::from(v)),
            ColumnValue::BigInt(v) | ColumnValue::Counter(v) => Ok(v),
            other => unexpected("bigint", &other),
        }
    }
}

impl ColumnCodec for f64 {
    fn cql_type() -> &'static str {
        "double"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Double(*self)
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Double(v) => Ok(v),
            other => unexpected("double", &other),
        }
    }
}

impl ColumnCodec for String {
    fn cql_type() -> &'static str {
        "text"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Text(self.clone())
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Text(v) => Ok(v),
            other => unexpected("text", &other),
        }
    }
}

impl ColumnCodec for Uuid {
    fn cql_type() -> &'static str {
        "uuid"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Uuid(*self)
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Uuid(v) => Ok(v),
            other => unexpected("uuid", &other),
        }
    }
}

impl ColumnCodec for DateTime<Utc> {
    fn cql_type() -> &'static str {
        "timestamp"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Timestamp(*self)
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Timestamp(v) => Ok(v),
            other => unexpected("timestamp", &other),
        }
    }
}

impl ColumnCodec for Vec<u8> {
    fn cql_type() -> &'static str {
        "blob"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Blob(self.clone())
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Blob(v) => Ok(v),
            other => unexpected("blob", &other),
        }
    }
}

impl<T: ColumnCodec> ColumnCodec for Option<T> {
    fn cql_type() -> &'static str {
        T::cql_type()
    }
    fn to_column(&self) -> ColumnValue {
        match self {
            Some(v) => v.to_column(),
            None => ColumnValue::Null,
        }
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Null => Ok(None),
            other => T::from_column(other).map(Some),
        }
    }
}
