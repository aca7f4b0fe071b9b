//! Table operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ast::{Projection, Statement};
use crate::client::FusionTables;
use crate::decoder::{DecodedRow, decode_rows};
use crate::encoder::{self, EncodedRow};
use crate::error::{FtError, FtResult};
use crate::schema::Schema;
use crate::transport::Transport;
use crate::value::{Row, Value};

/// Service-assigned row identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Equality filters, ANDed together.
pub type Filters<'a> = [(&'a str, Value)];

/// Handle to one table, borrowed from its client.
pub struct Table<'c, T: Transport> {
    client: &'c FusionTables<T>,
    id: String,
    schema: Schema,
}

impl<'c, T: Transport> Table<'c, T> {
    pub(crate) fn new(client: &'c FusionTables<T>, id: String, schema: Schema) -> Self {
        Self { client, id, schema }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Encode rows against this table's schema without sending them.
    pub fn encode(&self, rows: &[Row]) -> FtResult<Vec<EncodedRow>> {
        encoder::encode_rows(rows, &self.schema)
    }

    /// Insert rows, returning their ids in order.
    ///
    /// Every row is encoded before anything is sent, so a type error
    /// leaves the table untouched. Rows go out in batches of at most
    /// [`FusionTables::max_batch`] statements.
    pub async fn insert(&self, rows: &[Row]) -> FtResult<Vec<RowId>> {
        let encoded = self.encode(rows)?;
        if encoded.iter().any(EncodedRow::is_empty) {
            return Err(FtError::InvalidValue("cannot insert an empty row".into()));
        }
        let statements: Vec<Statement> = encoded.iter().map(|row| self.insert_statement(row)).collect();

        let mut ids = Vec::with_capacity(statements.len());
        for chunk in statements.chunks(self.client.max_batch()) {
            debug!(table = %self.id, rows = chunk.len(), "inserting batch");
            let result = self.client.execute_batch(chunk).await?;
            ids.extend(result.column("rowid")?.into_iter().map(RowId::from));
        }
        Ok(ids)
    }

    fn insert_statement(&self, row: &EncodedRow) -> Statement {
        Statement::Insert {
            table: self.id.clone(),
            columns: row.names().map(String::from).collect(),
            values: row.values().map(String::from).collect(),
        }
    }

    /// Number of rows in the table.
    pub async fn count(&self) -> FtResult<u64> {
        self.count_where(&[]).await
    }

    /// Number of rows matching `filters`.
    pub async fn count_where(&self, filters: &Filters<'_>) -> FtResult<u64> {
        let result = self.client.execute(&self.select_statement(Projection::Count, filters)?).await?;
        let text = result.scalar()?;
        text.parse()
            .map_err(|_| FtError::Decode(format!("count is not a number: '{}'", text)))
    }

    /// Rows matching `filters`, every column as display text.
    pub async fn select(&self, filters: &Filters<'_>) -> FtResult<Vec<DecodedRow>> {
        let projection = Projection::Columns(self.schema.names().map(String::from).collect());
        let result = self.client.execute(&self.select_statement(projection, filters)?).await?;
        decode_rows(&result)
    }

    /// Ids of the rows matching `filters`.
    pub async fn rowids(&self, filters: &Filters<'_>) -> FtResult<Vec<RowId>> {
        let result = self.client.execute(&self.select_statement(Projection::RowId, filters)?).await?;
        Ok(result.column("rowid")?.into_iter().map(RowId::from).collect())
    }

    fn select_statement(&self, projection: Projection, filters: &Filters<'_>) -> FtResult<Statement> {
        Ok(Statement::Select {
            table: self.id.clone(),
            projection,
            filters: encoder::encode_conditions(filters, &self.schema)?,
        })
    }

    /// Set `assignments` on each row in `ids`, one request per row.
    pub async fn update(&self, ids: &[RowId], assignments: &Filters<'_>) -> FtResult<()> {
        if assignments.is_empty() {
            return Err(FtError::InvalidValue("update needs at least one column".into()));
        }
        let assignments = encoder::encode_conditions(assignments, &self.schema)?;

        for id in ids {
            let stmt = Statement::Update {
                table: self.id.clone(),
                assignments: assignments.clone(),
                row_id: id.to_string(),
            };
            self.client.execute(&stmt).await?;
        }
        debug!(table = %self.id, rows = ids.len(), "updated rows");
        Ok(())
    }

    /// Delete one row.
    pub async fn delete(&self, id: &RowId) -> FtResult<()> {
        self.client
            .execute(&Statement::Delete {
                table: self.id.clone(),
                row_id: Some(id.to_string()),
            })
            .await?;
        Ok(())
    }

    /// Delete every row.
    pub async fn truncate(&self) -> FtResult<()> {
        self.client
            .execute(&Statement::Delete {
                table: self.id.clone(),
                row_id: None,
            })
            .await?;
        info!(table = %self.id, "truncated table");
        Ok(())
    }

    /// Drop the table.
    pub async fn drop_table(self) -> FtResult<()> {
        self.client.drop_table(&self.id).await
    }
}

impl<T: Transport> fmt::Debug for Table<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.id)
            .field("schema", &self.schema)
            .finish()
    }
}
