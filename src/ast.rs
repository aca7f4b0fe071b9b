//! Statement model for the service's SQL dialect.
//!
//! Values inside statements are already-encoded literals (see
//! [`crate::encoder`]); column names are kept unquoted.

use std::fmt;

use crate::schema::ColumnDef;

/// What a `SELECT` projects.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `COUNT()`
    Count,
    /// `ROWID`
    RowId,
    /// Named columns.
    Columns(Vec<String>),
}

/// Equality condition `'column' = literal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub literal: String,
}

impl Condition {
    pub fn new(column: impl Into<String>, literal: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            literal: literal.into(),
        }
    }
}

/// One statement understood by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    ShowTables,
    Describe {
        table: String,
    },
    DropTable {
        table: String,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<String>,
    },
    Select {
        table: String,
        projection: Projection,
        filters: Vec<Condition>,
    },
    /// Update a single row by id.
    Update {
        table: String,
        assignments: Vec<Condition>,
        row_id: String,
    },
    /// Delete one row, or every row when `row_id` is `None`.
    Delete {
        table: String,
        row_id: Option<String>,
    },
}

impl Statement {
    /// Whether the statement only reads.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Statement::ShowTables | Statement::Describe { .. } | Statement::Select { .. }
        )
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Statement::CreateTable { .. } => "CREATE TABLE",
            Statement::ShowTables => "SHOW TABLES",
            Statement::Describe { .. } => "DESCRIBE",
            Statement::DropTable { .. } => "DROP TABLE",
            Statement::Insert { .. } => "INSERT",
            Statement::Select { .. } => "SELECT",
            Statement::Update { .. } => "UPDATE",
            Statement::Delete { .. } => "DELETE",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::transpiler::ToSql::to_sql(self))
    }
}
