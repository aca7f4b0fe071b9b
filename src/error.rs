//! Error types for ftable.

use thiserror::Error;

use crate::schema::ColumnType;

/// The main error type for ftable operations.
#[derive(Debug, Error)]
pub enum FtError {
    /// A row value does not match the declared type of its column.
    #[error("Type mismatch for column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: &'static str,
    },

    /// A row names a column the table does not have.
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    /// A schema declares the same column twice.
    #[error("Duplicate column: '{0}'")]
    DuplicateColumn(String),

    /// A schema without columns.
    #[error("A table needs at least one column")]
    EmptySchema,

    /// Invalid value.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Text that is neither `POINT(x,y)` nor a KML point.
    #[error("Invalid location: '{0}'. Expected POINT(x,y) or <Point><coordinates>x,y,z</coordinates></Point>")]
    InvalidLocation(String),

    /// Failed to parse a statement.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Malformed service response.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The service answered with a non-success status.
    #[error("Service error ({status}): {body}")]
    Service { status: u16, body: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No table with this id.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// In-process service snapshot could not be read or written.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FtError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn mismatch(column: impl Into<String>, expected: ColumnType, found: &'static str) -> Self {
        Self::TypeMismatch {
            column: column.into(),
            expected,
            found,
        }
    }
}

/// Result type alias for ftable operations.
pub type FtResult<T> = Result<T, FtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FtError::parse(5, "unexpected character");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unexpected character"
        );
    }

    #[test]
    fn test_mismatch_display() {
        let err = FtError::mismatch("phone", ColumnType::Number, "text");
        assert_eq!(
            err.to_string(),
            "Type mismatch for column 'phone': expected number, found text"
        );
    }
}
