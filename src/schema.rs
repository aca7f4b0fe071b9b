//! Table schemas.
//!
//! A [`Schema`] is the ordered list of columns declared when a table is
//! created. It never changes afterwards; every row is checked against it
//! before anything is sent to the service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FtError, FtResult};

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Datetime,
    Location,
}

impl ColumnType {
    /// Keyword used in `CREATE TABLE`.
    pub fn keyword(&self) -> &'static str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Number => "NUMBER",
            ColumnType::Datetime => "DATETIME",
            ColumnType::Location => "LOCATION",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Datetime => "datetime",
            ColumnType::Location => "location",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ColumnType {
    type Err = FtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(ColumnType::String),
            "number" => Ok(ColumnType::Number),
            "datetime" => Ok(ColumnType::Datetime),
            "location" => Ok(ColumnType::Location),
            other => Err(FtError::InvalidValue(format!(
                "unknown column type '{}'. Expected: string, number, datetime, or location",
                other
            ))),
        }
    }
}

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Column name wrapped in single quotes, as used in statements.
    pub fn quoted_name(&self) -> String {
        quote_name(&self.name)
    }
}

/// Wrap a column or table name in single quotes.
///
/// Names are escaped like string literals, so they read back unchanged.
pub fn quote_name(name: &str) -> String {
    crate::encoder::quote_text(name)
}

impl FromStr for ColumnDef {
    type Err = FtError;

    /// Parse `name:type`, e.g. `phone:number`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, kind) = s.rsplit_once(':').ok_or_else(|| {
            FtError::InvalidValue(format!("expected name:type, got '{}'", s))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(FtError::InvalidValue(format!("missing column name in '{}'", s)));
        }
        Ok(ColumnDef::new(name, kind.trim().parse()?))
    }
}

/// Ordered, immutable list of column definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnDef>", into = "Vec<ColumnDef>")]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    /// Build a schema, rejecting empty and duplicate column lists.
    pub fn new(columns: Vec<ColumnDef>) -> FtResult<Self> {
        if columns.is_empty() {
            return Err(FtError::EmptySchema);
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(FtError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Shorthand for `Schema::new` from `(name, type)` pairs.
    pub fn of(columns: &[(&str, ColumnType)]) -> FtResult<Self> {
        Self::new(
            columns
                .iter()
                .map(|(name, kind)| ColumnDef::new(*name, *kind))
                .collect(),
        )
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Declared type of `name`, or `UnknownColumn`.
    pub fn type_of(&self, name: &str) -> FtResult<ColumnType> {
        self.get(name)
            .map(|c| c.kind)
            .ok_or_else(|| FtError::UnknownColumn(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TryFrom<Vec<ColumnDef>> for Schema {
    type Error = FtError;

    fn try_from(columns: Vec<ColumnDef>) -> Result<Self, Self::Error> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<ColumnDef> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}
