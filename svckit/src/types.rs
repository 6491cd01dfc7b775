use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A single bound value or returned cell, independent of the driver in use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValue {
    Text(String),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Blob(Vec<u8>),
    Uuid(Uuid),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
    List(Vec<ColumnValue>),
    Map(HashMap<String, ColumnValue>),
    Null,
}

/// Positional row: one value per selected column, in select-list order
pub type Row = Vec<ColumnValue>;

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            ColumnValue::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::BigInt(v) => Some(*v),
            ColumnValue::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ColumnValue::Timestamp(ms) => DateTime::from_timestamp_millis(*ms),
            _ => None,
        }
    }

    /// CQL type name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Text(_) => "text",
            ColumnValue::Int(_) => "int",
            ColumnValue::BigInt(_) => "bigint",
            ColumnValue::Float(_) => "float",
            ColumnValue::Double(_) => "double",
            ColumnValue::Boolean(_) => "boolean",
            ColumnValue::Blob(_) => "blob",
            ColumnValue::Uuid(_) => "uuid",
            ColumnValue::Timestamp(_) => "timestamp",
            ColumnValue::List(_) => "list",
            ColumnValue::Map(_) => "map",
            ColumnValue::Null => "null",
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Text(s) => write!(f, "'{}'", s),
            ColumnValue::Int(v) => write!(f, "{}", v),
            ColumnValue::BigInt(v) => write!(f, "{}", v),
            ColumnValue::Float(v) => write!(f, "{}", v),
            ColumnValue::Double(v) => write!(f, "{}", v),
            ColumnValue::Boolean(v) => write!(f, "{}", v),
            ColumnValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
            ColumnValue::Uuid(id) => write!(f, "{}", id),
            ColumnValue::Timestamp(ms) => write!(f, "{}", ms),
            ColumnValue::List(items) => write!(f, "<list of {}>", items.len()),
            ColumnValue::Map(entries) => write!(f, "<map of {}>", entries.len()),
            ColumnValue::Null => write!(f, "null"),
        }
    }
}

impl From<Uuid> for ColumnValue {
    fn from(id: Uuid) -> Self {
        ColumnValue::Uuid(id)
    }
}

impl From<String> for ColumnValue {
    fn from(s: String) -> Self {
        ColumnValue::Text(s)
    }
}

impl From<&str> for ColumnValue {
    fn from(s: &str) -> Self {
        ColumnValue::Text(s.to_string())
    }
}

impl From<i32> for ColumnValue {
    fn from(v: i32) -> Self {
        ColumnValue::Int(v)
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::BigInt(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Boolean(v)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(ts: DateTime<Utc>) -> Self {
        ColumnValue::Timestamp(ts.timestamp_millis())
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ColumnValue::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    #[default]
    LocalQuorum,
    EachQuorum,
    LocalOne,
}
