//! In-process service.
//!
//! [`MemoryTransport`] understands the same SQL subset as the remote
//! service and answers in the same CSV format, keeping every table in
//! memory. Values are stored as display text, the way the service echoes
//! them back.
//!
//! The whole state can be saved to a JSON snapshot and loaded again, which
//! lets separate processes share one emulated service.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{Condition, Projection, Statement};
use crate::decoder::ResultSet;
use crate::error::{FtError, FtResult};
use crate::parser::{self, unquote};
use crate::schema::{ColumnDef, ColumnType};
use crate::transport::Transport;

/// First id handed out for a new table.
const FIRST_TABLE_ID: u64 = 1000;

/// Shared handle to an in-memory service. Clones see the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    next_table: u64,
    tables: BTreeMap<String, MemTable>,
    requests: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemTable {
    name: String,
    columns: Vec<ColumnDef>,
    next_row: u64,
    rows: Vec<StoredRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRow {
    id: u64,
    values: HashMap<String, String>,
}

fn rejected(message: impl Into<String>) -> FtError {
    FtError::Service {
        status: 400,
        body: message.into(),
    }
}

fn ok_result() -> ResultSet {
    ResultSet::new(vec!["OK".to_string()], vec![])
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests served so far.
    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    /// Number of tables currently stored.
    pub fn table_count(&self) -> usize {
        self.lock().tables.len()
    }

    /// Restore a service from a snapshot written by [`MemoryTransport::save`].
    pub fn load(path: &Path) -> FtResult<Self> {
        let state: State = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!(path = %path.display(), tables = state.tables.len(), "loaded snapshot");
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Write every table to a JSON snapshot.
    pub fn save(&self, path: &Path) -> FtResult<()> {
        let json = serde_json::to_string(&*self.lock())?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, json)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    /// Run every statement of a request, all or nothing: if one fails,
    /// none of the others take effect.
    async fn execute(&self, sql: &str) -> FtResult<String> {
        let statements = parser::parse_batch(sql)?;
        let mut state = self.lock();
        state.requests += 1;
        debug!(statements = statements.len(), "memory service request");

        let mut draft = state.clone();
        let mut combined: Option<ResultSet> = None;
        for stmt in statements {
            let result = draft.apply(stmt)?;
            combined = Some(match combined {
                Some(mut acc) if acc.columns == result.columns => {
                    acc.rows.extend(result.rows);
                    acc
                }
                _ => result,
            });
        }
        *state = draft;
        Ok(combined.unwrap_or_default().to_csv())
    }
}

impl State {
    fn apply(&mut self, stmt: Statement) -> FtResult<ResultSet> {
        match stmt {
            Statement::CreateTable { name, columns } => self.create(name, columns),
            Statement::ShowTables => Ok(ResultSet::new(
                vec!["table id".into(), "name".into()],
                self.tables
                    .iter()
                    .map(|(id, t)| vec![id.clone(), t.name.clone()])
                    .collect(),
            )),
            Statement::Describe { table } => {
                let t = self.table(&table)?;
                Ok(ResultSet::new(
                    vec!["column id".into(), "name".into(), "type".into()],
                    t.columns
                        .iter()
                        .enumerate()
                        .map(|(i, c)| vec![format!("col{}", i), c.name.clone(), c.kind.to_string()])
                        .collect(),
                ))
            }
            Statement::DropTable { table } => {
                self.tables
                    .remove(&table)
                    .ok_or(FtError::TableNotFound(table))?;
                Ok(ok_result())
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => self.table_mut(&table)?.insert(columns, values),
            Statement::Select {
                table,
                projection,
                filters,
            } => self.table(&table)?.select(&projection, &filters),
            Statement::Update {
                table,
                assignments,
                row_id,
            } => self.table_mut(&table)?.update(&assignments, &row_id),
            Statement::Delete { table, row_id } => {
                self.table_mut(&table)?.delete(row_id.as_deref())
            }
        }
    }

    fn create(&mut self, name: String, columns: Vec<ColumnDef>) -> FtResult<ResultSet> {
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(rejected(format!("duplicate column '{}'", col.name)));
            }
        }
        let id = FIRST_TABLE_ID + self.next_table;
        self.next_table += 1;
        self.tables.insert(
            id.to_string(),
            MemTable {
                name,
                columns,
                next_row: 1,
                rows: Vec::new(),
            },
        );
        Ok(ResultSet::new(vec!["tableid".into()], vec![vec![id.to_string()]]))
    }

    fn table(&self, id: &str) -> FtResult<&MemTable> {
        self.tables
            .get(id)
            .ok_or_else(|| FtError::TableNotFound(id.to_string()))
    }

    fn table_mut(&mut self, id: &str) -> FtResult<&mut MemTable> {
        self.tables
            .get_mut(id)
            .ok_or_else(|| FtError::TableNotFound(id.to_string()))
    }
}

impl MemTable {
    fn column_type(&self, name: &str) -> FtResult<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.kind)
            .ok_or_else(|| rejected(format!("unknown column '{}'", name)))
    }

    /// Check a literal against its column and turn it into display text.
    fn store_literal(&self, column: &str, literal: &str) -> FtResult<String> {
        let quoted = literal.starts_with('\'');
        match self.column_type(column)? {
            ColumnType::Number if quoted => Err(rejected(format!(
                "column '{}' expects a number, got {}",
                column, literal
            ))),
            ColumnType::String | ColumnType::Datetime | ColumnType::Location if !quoted => {
                Err(rejected(format!(
                    "column '{}' expects a quoted value, got {}",
                    column, literal
                )))
            }
            _ => Ok(unquote(literal)),
        }
    }

    fn insert(&mut self, columns: Vec<String>, values: Vec<String>) -> FtResult<ResultSet> {
        if columns.len() != values.len() {
            return Err(rejected(format!(
                "{} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        let mut stored = HashMap::with_capacity(columns.len());
        for (column, literal) in columns.into_iter().zip(values) {
            let text = self.store_literal(&column, &literal)?;
            stored.insert(column, text);
        }

        let id = self.next_row;
        self.next_row += 1;
        self.rows.push(StoredRow { id, values: stored });
        Ok(ResultSet::new(vec!["rowid".into()], vec![vec![id.to_string()]]))
    }

    fn matches(&self, row: &StoredRow, filters: &[Condition]) -> FtResult<bool> {
        for cond in filters {
            let kind = self.column_type(&cond.column)?;
            let wanted = unquote(&cond.literal);
            let stored = row.values.get(&cond.column).map(String::as_str).unwrap_or("");
            let equal = match (kind, stored.parse::<f64>(), wanted.parse::<f64>()) {
                (ColumnType::Number, Ok(a), Ok(b)) => a == b,
                _ => stored == wanted,
            };
            if !equal {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn select(&self, projection: &Projection, filters: &[Condition]) -> FtResult<ResultSet> {
        let mut hits = Vec::new();
        for row in &self.rows {
            if self.matches(row, filters)? {
                hits.push(row);
            }
        }

        Ok(match projection {
            Projection::Count => ResultSet::new(
                vec!["count()".into()],
                vec![vec![hits.len().to_string()]],
            ),
            Projection::RowId => ResultSet::new(
                vec!["rowid".into()],
                hits.iter().map(|r| vec![r.id.to_string()]).collect(),
            ),
            Projection::Columns(cols) => {
                for col in cols {
                    self.column_type(col)?;
                }
                ResultSet::new(
                    cols.clone(),
                    hits.iter()
                        .map(|r| {
                            cols.iter()
                                .map(|c| r.values.get(c).cloned().unwrap_or_default())
                                .collect()
                        })
                        .collect(),
                )
            }
        })
    }

    fn update(&mut self, assignments: &[Condition], row_id: &str) -> FtResult<ResultSet> {
        let mut changes = Vec::with_capacity(assignments.len());
        for a in assignments {
            changes.push((a.column.clone(), self.store_literal(&a.column, &a.literal)?));
        }

        let row = self
            .rows
            .iter_mut()
            .find(|r| r.id.to_string() == row_id)
            .ok_or_else(|| rejected(format!("no row with ROWID '{}'", row_id)))?;
        row.values.extend(changes);
        Ok(ok_result())
    }

    fn delete(&mut self, row_id: Option<&str>) -> FtResult<ResultSet> {
        match row_id {
            Some(id) => {
                let before = self.rows.len();
                self.rows.retain(|r| r.id.to_string() != id);
                if self.rows.len() == before {
                    return Err(rejected(format!("no row with ROWID '{}'", id)));
                }
            }
            None => self.rows.clear(),
        }
        Ok(ok_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(service: &MemoryTransport, sql: &str) -> ResultSet {
        let body = service.execute(sql).await.unwrap();
        ResultSet::parse(&body).unwrap()
    }

    #[tokio::test]
    async fn test_create_insert_select() {
        let service = MemoryTransport::new();
        let created = run(&service, "CREATE TABLE 'people' ('name': STRING, 'phone': NUMBER)").await;
        assert_eq!(created.scalar().unwrap(), "1000");

        let ids = run(
            &service,
            "INSERT INTO 1000 ('name', 'phone') VALUES ('bob''s', 12);INSERT INTO 1000 ('name', 'phone') VALUES ('al', 13)",
        )
        .await;
        assert_eq!(ids.column("rowid").unwrap(), vec!["1", "2"]);
        assert_eq!(service.request_count(), 2);

        let rows = run(&service, "SELECT 'name', 'phone' FROM 1000 WHERE 'phone' = 12").await;
        assert_eq!(rows.rows, vec![vec!["bob's".to_string(), "12".to_string()]]);
    }

    #[tokio::test]
    async fn test_number_filter_compares_numerically() {
        let service = MemoryTransport::new();
        run(&service, "CREATE TABLE 't' ('n': NUMBER)").await;
        run(&service, "INSERT INTO 1000 ('n') VALUES (12)").await;
        let count = run(&service, "SELECT COUNT() FROM 1000 WHERE 'n' = 12.0").await;
        assert_eq!(count.scalar().unwrap(), "1");
    }

    #[tokio::test]
    async fn test_rejects_bad_literals() {
        let service = MemoryTransport::new();
        run(&service, "CREATE TABLE 't' ('n': NUMBER, 's': STRING)").await;
        for sql in [
            "INSERT INTO 1000 ('n') VALUES ('x')",
            "INSERT INTO 1000 ('s') VALUES (1)",
            "INSERT INTO 1000 ('zz') VALUES (1)",
            "INSERT INTO 1000 ('n', 's') VALUES (1)",
        ] {
            let err = service.execute(sql).await.unwrap_err();
            assert!(matches!(err, FtError::Service { status: 400, .. }), "{}", sql);
        }
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let service = MemoryTransport::new();
        run(&service, "CREATE TABLE 't' ('n': NUMBER)").await;
        let err = service
            .execute("INSERT INTO 1000 ('n') VALUES (1);INSERT INTO 1000 ('n') VALUES ('x')")
            .await
            .unwrap_err();
        assert!(matches!(err, FtError::Service { status: 400, .. }));

        assert_eq!(run(&service, "SELECT COUNT() FROM 1000").await.scalar().unwrap(), "0");
        let ids = run(&service, "INSERT INTO 1000 ('n') VALUES (2)").await;
        assert_eq!(ids.column("rowid").unwrap(), vec!["1"]);
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let path = std::env::temp_dir().join(format!("ftable-snapshot-{}.json", std::process::id()));
        let service = MemoryTransport::new();
        run(&service, "CREATE TABLE 't' ('n': NUMBER, 's': STRING)").await;
        run(&service, "INSERT INTO 1000 ('n', 's') VALUES (7, 'a,b')").await;
        service.save(&path).unwrap();

        let restored = MemoryTransport::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        let rows = run(&restored, "SELECT 'n', 's' FROM 1000").await;
        assert_eq!(rows.rows, vec![vec!["7".to_string(), "a,b".to_string()]]);

        let ids = run(&restored, "INSERT INTO 1000 ('n') VALUES (8)").await;
        assert_eq!(ids.column("rowid").unwrap(), vec!["2"]);
        let created = run(&restored, "CREATE TABLE 'u' ('n': NUMBER)").await;
        assert_eq!(created.scalar().unwrap(), "1001");
    }

    #[test]
    fn test_load_missing_snapshot() {
        let path = std::env::temp_dir().join("ftable-no-such-snapshot.json");
        assert!(matches!(MemoryTransport::load(&path), Err(FtError::Io(_))));
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let service = MemoryTransport::new();
        let err = service.execute("SELECT COUNT() FROM 77").await.unwrap_err();
        assert!(matches!(err, FtError::TableNotFound(id) if id == "77"));
    }

    #[tokio::test]
    async fn test_delete_and_drop() {
        let service = MemoryTransport::new();
        run(&service, "CREATE TABLE 't' ('n': NUMBER)").await;
        run(&service, "INSERT INTO 1000 ('n') VALUES (1);INSERT INTO 1000 ('n') VALUES (2)").await;
        run(&service, "DELETE FROM 1000 WHERE ROWID = '1'").await;
        assert_eq!(run(&service, "SELECT ROWID FROM 1000").await.column("rowid").unwrap(), vec!["2"]);
        run(&service, "DELETE FROM 1000").await;
        assert_eq!(run(&service, "SELECT COUNT() FROM 1000").await.scalar().unwrap(), "0");
        run(&service, "DROP TABLE 1000").await;
        assert_eq!(service.table_count(), 0);
    }

    #[tokio::test]
    async fn test_describe_and_show() {
        let service = MemoryTransport::new();
        run(&service, "CREATE TABLE 't' ('n': NUMBER, 'where': LOCATION)").await;
        let tables = run(&service, "SHOW TABLES").await;
        assert_eq!(tables.rows, vec![vec!["1000".to_string(), "t".to_string()]]);
        let desc = run(&service, "DESCRIBE 1000").await;
        assert_eq!(desc.column("type").unwrap(), vec!["number", "location"]);
    }
}
