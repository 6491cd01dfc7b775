use std::fmt;

use crate::errors::DataError;
use crate::types::{ColumnValue, Row};

/// Mapping contract between a record type and its CQL table.
///
/// Column lists are explicit so every statement names its columns and rows
/// decode positionally; nothing is discovered at runtime.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Partition key type
    type Key: Into<ColumnValue> + Clone + fmt::Display + Send + Sync;

    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    /// Every persisted column, key included
    const COLUMNS: &'static [&'static str];

    fn key(&self) -> Self::Key;

    /// Values in `COLUMNS` order
    fn to_row(&self) -> Row;

    /// Decode a row selected with `COLUMNS`
    fn from_row(row: Row) -> Result<Self, DataError>;
}

/// Cursor over a positional row, used by `Entity::from_row` implementations
pub struct RowReader {
    table: &'static str,
    columns: std::vec::IntoIter<ColumnValue>,
    names: std::slice::Iter<'static, &'static str>,
}

impl RowReader {
    pub fn new(table: &'static str, names: &'static [&'static str], row: Row) -> Result<Self, DataError> {
        if row.len() != names.len() {
            return Err(DataError::DecodeError(format!(
                "{}: expected {} columns, got {}",
                table,
                names.len(),
                row.len()
            )));
        }
        Ok(Self {
            table,
            columns: row.into_iter(),
            names: names.iter(),
        })
    }

    fn next_cell(&mut self) -> Result<(&'static str, ColumnValue), DataError> {
        match (self.names.next(), self.columns.next()) {
            (Some(name), Some(value)) => Ok((name, value)),
            _ => Err(DataError::DecodeError(format!("{}: row exhausted", self.table))),
        }
    }

    fn mismatch(&self, name: &str, expected: &str, got: &ColumnValue) -> DataError {
        DataError::DecodeError(format!(
            "{}.{}: expected {}, got {}",
            self.table,
            name,
            expected,
            got.type_name()
        ))
    }

    pub fn uuid(&mut self) -> Result<uuid::Uuid, DataError> {
        let (name, value) = self.next_cell()?;
        value.as_uuid().ok_or_else(|| self.mismatch(name, "uuid", &value))
    }

    /// Text column where an unset cell reads as `None`
    pub fn optional_text(&mut self) -> Result<Option<String>, DataError> {
        let (name, value) = self.next_cell()?;
        match value {
            ColumnValue::Null => Ok(None),
            ColumnValue::Text(s) => Ok(Some(s)),
            other => Err(self.mismatch(name, "text", &other)),
        }
    }

    pub fn timestamp(&mut self) -> Result<chrono::DateTime<chrono::Utc>, DataError> {
        let (name, value) = self.next_cell()?;
        value
            .as_timestamp()
            .ok_or_else(|| self.mismatch(name, "timestamp", &value))
    }
}
