//! Row encoder.
//!
//! Turns typed rows into the literal fragments the service's SQL dialect
//! expects. Every value is checked against the declared type of its column.
//!
//! | Column type | Accepted values            | Literal                    |
//! |-------------|----------------------------|----------------------------|
//! | `string`    | text                       | `'\\bob''s pizza'`         |
//! | `number`    | integer, finite float      | `12`                       |
//! | `datetime`  | UTC datetime               | `'08-10-2010 20:15:01'`    |
//! | `location`  | location, location text    | `'POINT(1,1)'`             |

use crate::ast::Condition;
use crate::error::{FtError, FtResult};
use crate::schema::{ColumnType, Schema, quote_name};
use crate::value::{Location, Row, Value};

/// Datetime layout understood by the service.
pub const DATETIME_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// A row ready for interpolation into a statement.
///
/// Entries are kept in schema order and looked up by quoted column
/// name (`'phone'`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedRow {
    entries: Vec<(String, String)>,
}

impl EncodedRow {
    /// Literal for a quoted column name.
    pub fn get(&self, quoted: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| quote_name(name) == quoted)
            .map(|(_, v)| v.as_str())
    }

    /// Quoted column names.
    pub fn columns(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|(name, _)| quote_name(name))
    }

    /// Plain column names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Escape text as a quoted string literal.
///
/// Backslashes are doubled, then single quotes are doubled.
pub fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}

/// Encode a single value for a column of type `kind`.
pub fn encode_value(column: &str, kind: ColumnType, value: &Value) -> FtResult<String> {
    match (kind, value) {
        (ColumnType::String, Value::Text(s)) => Ok(quote_text(s)),
        (ColumnType::Number, Value::Int(n)) => Ok(n.to_string()),
        (ColumnType::Number, Value::Float(f)) => {
            if f.is_finite() {
                Ok(f.to_string())
            } else {
                Err(FtError::InvalidValue(format!(
                    "column '{}' cannot store {}",
                    column, f
                )))
            }
        }
        (ColumnType::Datetime, Value::Datetime(dt)) => {
            Ok(format!("'{}'", dt.format(DATETIME_FORMAT)))
        }
        (ColumnType::Location, Value::Location(loc)) => Ok(format!("'{}'", loc.as_str())),
        (ColumnType::Location, Value::Text(s)) => {
            let loc = Location::parse(s)?;
            Ok(format!("'{}'", loc.as_str()))
        }
        (expected, other) => Err(FtError::mismatch(column, expected, other.kind())),
    }
}

/// Encode one row against `schema`.
///
/// Columns missing from the row are left out; columns missing from the
/// schema are rejected.
pub fn encode_row(row: &Row, schema: &Schema) -> FtResult<EncodedRow> {
    if let Some((name, _)) = row.iter().find(|(name, _)| schema.get(name).is_none()) {
        return Err(FtError::UnknownColumn(name.to_string()));
    }

    let mut entries = Vec::with_capacity(row.len());
    for col in schema.columns() {
        if let Some(value) = row.get(&col.name) {
            entries.push((col.name.clone(), encode_value(&col.name, col.kind, value)?));
        }
    }
    Ok(EncodedRow { entries })
}

/// Encode every row, failing on the first bad one.
pub fn encode_rows(rows: &[Row], schema: &Schema) -> FtResult<Vec<EncodedRow>> {
    rows.iter().map(|row| encode_row(row, schema)).collect()
}

/// Encode `(column, value)` pairs used in filters and assignments.
pub fn encode_conditions(pairs: &[(&str, Value)], schema: &Schema) -> FtResult<Vec<Condition>> {
    pairs
        .iter()
        .map(|(name, value)| {
            let kind = schema.type_of(name)?;
            Ok(Condition::new(*name, encode_value(name, kind, value)?))
        })
        .collect()
}
