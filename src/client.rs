//! Service client.
//!
//! [`FusionTables`] owns a [`Transport`] and speaks the service's SQL
//! dialect through it. Table-level operations live on [`Table`].

use serde::Serialize;
use tracing::{debug, info};

use crate::ast::Statement;
use crate::config::Config;
use crate::decoder::ResultSet;
use crate::error::{FtError, FtResult};
use crate::schema::{ColumnDef, Schema};
use crate::table::Table;
use crate::transpiler::{ToSql, to_batch_sql};
use crate::transport::{HttpTransport, Session, Transport};

/// Rows per insert request the service accepts.
pub const DEFAULT_MAX_BATCH: usize = 500;

/// A table as listed by `SHOW TABLES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub id: String,
    pub name: String,
}

/// Client for a tabular-data service.
///
/// # Example
///
/// ```rust,ignore
/// let ft = FusionTables::new(MemoryTransport::new());
/// let table = ft
///     .create_table("people", Schema::of(&[("name", ColumnType::String)])?)
///     .await?;
/// table.insert(&[Row::new().with("name", "bob")]).await?;
/// assert_eq!(table.count().await?, 1);
/// ```
#[derive(Debug, Clone)]
pub struct FusionTables<T: Transport> {
    transport: T,
    max_batch: usize,
}

impl FusionTables<HttpTransport> {
    /// HTTP client configured from `config`.
    pub fn connect(config: &Config) -> FtResult<Self> {
        let session = match &config.token {
            Some(token) => Session::new(token.clone()),
            None => Session::anonymous(),
        };
        let transport = HttpTransport::new(config.endpoint.clone(), session);
        Self::new(transport).with_max_batch(config.max_batch)
    }
}

impl<T: Transport> FusionTables<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_batch: DEFAULT_MAX_BATCH,
        }
    }

    /// Limit the number of statements sent per insert request.
    pub fn with_max_batch(mut self, max_batch: usize) -> FtResult<Self> {
        if max_batch == 0 {
            return Err(FtError::Config("max_batch must be at least 1".into()));
        }
        self.max_batch = max_batch;
        Ok(self)
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run raw SQL (escape hatch).
    pub async fn query(&self, sql: &str) -> FtResult<ResultSet> {
        debug!(sql = %sql, "query");
        let body = self.transport.execute(sql).await?;
        ResultSet::parse(&body)
    }

    /// Run one statement.
    pub async fn execute(&self, stmt: &Statement) -> FtResult<ResultSet> {
        self.query(&stmt.to_sql()).await
    }

    /// Run several statements in a single request.
    pub async fn execute_batch(&self, stmts: &[Statement]) -> FtResult<ResultSet> {
        self.query(&to_batch_sql(stmts)).await
    }

    /// Create a table and return a handle to it.
    pub async fn create_table(&self, name: &str, schema: Schema) -> FtResult<Table<'_, T>> {
        let stmt = Statement::CreateTable {
            name: name.to_string(),
            columns: schema.columns().to_vec(),
        };
        let result = self.execute(&stmt).await?;
        let id = result.scalar()?.to_string();
        info!(table = %id, name = %name, "created table");
        Ok(Table::new(self, id, schema))
    }

    /// List the tables visible to this session.
    pub async fn show_tables(&self) -> FtResult<Vec<TableInfo>> {
        let result = self.execute(&Statement::ShowTables).await?;
        let ids = result.column("table id")?;
        let names = result.column("name")?;
        Ok(ids
            .into_iter()
            .zip(names)
            .map(|(id, name)| TableInfo { id, name })
            .collect())
    }

    /// Fetch the schema of a table.
    pub async fn describe(&self, table: &str) -> FtResult<Schema> {
        let result = self
            .execute(&Statement::Describe {
                table: table.to_string(),
            })
            .await?;
        let names = result.column("name")?;
        let types = result.column("type")?;
        let columns = names
            .into_iter()
            .zip(types)
            .map(|(name, kind)| -> FtResult<ColumnDef> { Ok(ColumnDef::new(name, kind.parse()?)) })
            .collect::<FtResult<Vec<_>>>()?;
        if columns.is_empty() {
            return Err(FtError::TableNotFound(table.to_string()));
        }
        Schema::new(columns)
    }

    /// Open an existing table by id.
    pub async fn table(&self, id: &str) -> FtResult<Table<'_, T>> {
        let schema = self.describe(id).await?;
        Ok(Table::new(self, id.to_string(), schema))
    }

    /// Drop a table by id.
    pub async fn drop_table(&self, id: &str) -> FtResult<()> {
        self.execute(&Statement::DropTable {
            table: id.to_string(),
        })
        .await?;
        info!(table = %id, "dropped table");
        Ok(())
    }
}
