//! # ftable: typed client for SQL-over-HTTP tables
//!
//! > **Encode rows, not strings.**
//!
//! ftable talks to a tabular-data web service that takes SQL over HTTP and
//! answers in CSV. Rows are checked against the table's declared schema and
//! encoded into literals before anything leaves the process.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use ftable::prelude::*;
//!
//! let ft = FusionTables::new(MemoryTransport::new());
//! let table = ft
//!     .create_table("people", Schema::of(&[
//!         ("firstname", ColumnType::String),
//!         ("phone", ColumnType::Number),
//!     ])?)
//!     .await?;
//!
//! table.insert(&[Row::new().with("firstname", "bob").with("phone", 12)]).await?;
//! assert_eq!(table.count_where(&[("phone", 12.into())]).await?, 1);
//! ```
//!
//! ## Literals
//!
//! | Type       | Value                   | Literal                  |
//! |------------|-------------------------|--------------------------|
//! | `string`   | `\bob's pizza`          | `'\\bob''s pizza'`       |
//! | `number`   | `12`                    | `12`                     |
//! | `datetime` | `2010-08-10T20:15:01Z`  | `'08-10-2010 20:15:01'`  |
//! | `location` | `POINT(1,1)`            | `'POINT(1,1)'`           |

pub mod ast;
pub mod client;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod memory;
pub mod parser;
pub mod schema;
pub mod table;
pub mod transpiler;
pub mod transport;
pub mod value;

pub use client::FusionTables;
pub use error::{FtError, FtResult};
pub use schema::{ColumnDef, ColumnType, Schema};
pub use table::{RowId, Table};
pub use value::{Location, LocationForm, Row, Value};

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::client::{FusionTables, TableInfo};
    pub use crate::config::Config;
    pub use crate::decoder::{DecodedRow, ResultSet, decode_rows};
    pub use crate::encoder::{EncodedRow, encode_row, encode_rows, encode_value};
    pub use crate::error::*;
    pub use crate::memory::MemoryTransport;
    pub use crate::schema::{ColumnDef, ColumnType, Schema};
    pub use crate::table::{RowId, Table};
    pub use crate::transpiler::ToSql;
    pub use crate::transport::{HttpTransport, Session, Transport};
    pub use crate::value::{Location, LocationForm, Row, Value};
}

/// Encode one row against a schema.
///
/// # Example
///
/// ```
/// use ftable::{ColumnType, Row, Schema};
///
/// let schema = Schema::of(&[("firstname", ColumnType::String), ("phone", ColumnType::Number)]).unwrap();
/// let row = ftable::encode(&Row::new().with("firstname", "bob's").with("phone", 12), &schema).unwrap();
/// assert_eq!(row.get("'firstname'"), Some("'bob''s'"));
/// assert_eq!(row.get("'phone'"), Some("12"));
/// ```
pub fn encode(row: &Row, schema: &Schema) -> FtResult<encoder::EncodedRow> {
    encoder::encode_row(row, schema)
}

/// Decode a CSV response body into rows of display text.
///
/// # Example
///
/// ```
/// let rows = ftable::decode("phone,dob\n12,08-10-2010 20:15:01\n").unwrap();
/// assert_eq!(rows[0]["dob"], "08-10-2010 20:15:01");
/// ```
pub fn decode(body: &str) -> FtResult<Vec<decoder::DecodedRow>> {
    decoder::decode_rows(&decoder::ResultSet::parse(body)?)
}
