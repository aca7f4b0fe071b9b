//! Typed row values.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::encoder::DATETIME_FORMAT;
use crate::error::{FtError, FtResult};
use crate::schema::ColumnType;

/// The two literal forms a location can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationForm {
    /// `POINT(x,y)`
    Point,
    /// `<Point><coordinates>x,y,z</coordinates></Point>`
    Kml,
}

/// A geographic location in one of the two literal forms the service stores.
///
/// `POINT(x,y)` is canonical. The KML form is kept verbatim and can be
/// turned into a point with [`Location::to_point`]. Every location is
/// built through a checked constructor, so its text never holds a `'`.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    form: LocationForm,
    text: String,
}

const KML_OPEN: &str = "<Point><coordinates>";
const KML_CLOSE: &str = "</coordinates></Point>";

impl Location {
    /// Build a `POINT(x,y)` location.
    pub fn point(x: f64, y: f64) -> Self {
        Self {
            form: LocationForm::Point,
            text: format!("POINT({},{})", x, y),
        }
    }

    /// Build a KML point from `x,y,z` coordinates.
    pub fn kml(x: f64, y: f64, z: f64) -> Self {
        Self {
            form: LocationForm::Kml,
            text: format!("{}{},{},{}{}", KML_OPEN, x, y, z, KML_CLOSE),
        }
    }

    /// Classify literal text by its shape. Coordinates are not validated.
    ///
    /// Text holding a single quote is rejected: locations are wrapped in
    /// quotes unescaped.
    pub fn parse(text: &str) -> FtResult<Self> {
        if text.contains('\'') {
            return Err(FtError::InvalidLocation(text.to_string()));
        }
        let trimmed = text.trim();
        let upper = trimmed.to_ascii_uppercase();
        let form = if upper.starts_with("POINT(") && trimmed.ends_with(')') {
            LocationForm::Point
        } else if trimmed.starts_with(KML_OPEN) && trimmed.ends_with(KML_CLOSE) {
            LocationForm::Kml
        } else {
            return Err(FtError::InvalidLocation(text.to_string()));
        };
        Ok(Self {
            form,
            text: text.to_string(),
        })
    }

    pub fn form(&self) -> LocationForm {
        self.form
    }

    /// Literal text, without quotes.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Convert to the canonical `POINT(x,y)` form.
    ///
    /// The KML altitude is dropped.
    pub fn to_point(&self) -> FtResult<Location> {
        if self.form == LocationForm::Point {
            return Ok(self.clone());
        }
        let inner = self
            .text
            .trim()
            .strip_prefix(KML_OPEN)
            .and_then(|s| s.strip_suffix(KML_CLOSE))
            .ok_or_else(|| FtError::InvalidLocation(self.text.clone()))?;
        let mut parts = inner.split(',').map(str::trim);
        match (parts.next(), parts.next()) {
            (Some(x), Some(y)) if !x.is_empty() && !y.is_empty() => Ok(Self {
                form: LocationForm::Point,
                text: format!("POINT({},{})", x, y),
            }),
            _ => Err(FtError::InvalidLocation(self.text.clone())),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A typed value for one field of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Datetime(DateTime<Utc>),
    Location(Location),
}

impl Value {
    /// Short name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Datetime(_) => "datetime",
            Value::Location(_) => "location",
        }
    }

    /// Read text typed by a user as a value for a column of type `kind`.
    ///
    /// Datetimes are accepted as RFC 3339 or in the service's
    /// `MM-DD-YYYY HH:MM:SS` layout, both taken as UTC.
    pub fn parse_as(kind: ColumnType, text: &str) -> FtResult<Value> {
        match kind {
            ColumnType::String => Ok(Value::Text(text.to_string())),
            ColumnType::Number => {
                if let Ok(n) = text.parse::<i64>() {
                    Ok(Value::Int(n))
                } else {
                    text.parse::<f64>()
                        .map(Value::Float)
                        .map_err(|_| FtError::InvalidValue(format!("'{}' is not a number", text)))
                }
            }
            ColumnType::Datetime => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                    return Ok(Value::Datetime(dt.with_timezone(&Utc)));
                }
                NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
                    .map(|naive| Value::Datetime(naive.and_utc()))
                    .map_err(|_| FtError::InvalidValue(format!("'{}' is not a datetime", text)))
            }
            ColumnType::Location => Location::parse(text).map(Value::Location),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Datetime(v)
    }
}

impl From<Location> for Value {
    fn from(v: Location) -> Self {
        Value::Location(v)
    }
}

/// A row to insert: column name to typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    ///
    /// ```
    /// use ftable::Row;
    ///
    /// let row = Row::new().with("firstname", "bob").with("phone", 12);
    /// assert_eq!(row.len(), 2);
    /// ```
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}
