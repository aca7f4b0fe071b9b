//! SQL transpiler for statements.
//!
//! Converts [`Statement`]s into the SQL text the service accepts.

use crate::ast::*;
use crate::encoder::quote_text;
use crate::schema::quote_name;

/// Trait for converting statements to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

impl ToSql for Statement {
    fn to_sql(&self) -> String {
        match self {
            Statement::CreateTable { name, columns } => {
                let cols: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{}: {}", c.quoted_name(), c.kind.keyword()))
                    .collect();
                format!("CREATE TABLE {} ({})", quote_name(name), cols.join(", "))
            }
            Statement::ShowTables => "SHOW TABLES".to_string(),
            Statement::Describe { table } => format!("DESCRIBE {}", table),
            Statement::DropTable { table } => format!("DROP TABLE {}", table),
            Statement::Insert {
                table,
                columns,
                values,
            } => to_insert_sql(table, columns, values),
            Statement::Select {
                table,
                projection,
                filters,
            } => to_select_sql(table, projection, filters),
            Statement::Update {
                table,
                assignments,
                row_id,
            } => {
                let sets: Vec<String> = assignments.iter().map(|a| a.to_sql()).collect();
                format!(
                    "UPDATE {} SET {} WHERE ROWID = {}",
                    table,
                    sets.join(", "),
                    quote_text(row_id)
                )
            }
            Statement::Delete { table, row_id } => match row_id {
                Some(id) => format!("DELETE FROM {} WHERE ROWID = {}", table, quote_text(id)),
                None => format!("DELETE FROM {}", table),
            },
        }
    }
}

impl ToSql for Condition {
    fn to_sql(&self) -> String {
        format!("{} = {}", quote_name(&self.column), self.literal)
    }
}

/// Join statements into a single request body.
pub fn to_batch_sql(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(|s| s.to_sql())
        .collect::<Vec<_>>()
        .join(";")
}

fn to_insert_sql(table: &str, columns: &[String], values: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_name(c)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        cols.join(", "),
        values.join(", ")
    )
}

fn to_select_sql(table: &str, projection: &Projection, filters: &[Condition]) -> String {
    let mut sql = String::from("SELECT ");

    match projection {
        Projection::Count => sql.push_str("COUNT()"),
        Projection::RowId => sql.push_str("ROWID"),
        Projection::Columns(cols) => {
            let cols: Vec<String> = cols.iter().map(|c| quote_name(c)).collect();
            sql.push_str(&cols.join(", "));
        }
    }

    sql.push_str(" FROM ");
    sql.push_str(table);

    // Conditions are ANDed
    if !filters.is_empty() {
        let conditions: Vec<String> = filters.iter().map(|c| c.to_sql()).collect();
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnType};

    #[test]
    fn test_create_table() {
        let stmt = Statement::CreateTable {
            name: "test".into(),
            columns: vec![
                ColumnDef::new("firstname", ColumnType::String),
                ColumnDef::new("phone", ColumnType::Number),
            ],
        };
        assert_eq!(
            stmt.to_sql(),
            "CREATE TABLE 'test' ('firstname': STRING, 'phone': NUMBER)"
        );
    }

    #[test]
    fn test_count() {
        let stmt = Statement::Select {
            table: "1234".into(),
            projection: Projection::Count,
            filters: vec![],
        };
        assert_eq!(stmt.to_sql(), "SELECT COUNT() FROM 1234");
    }

    #[test]
    fn test_select_with_where() {
        let stmt = Statement::Select {
            table: "1234".into(),
            projection: Projection::Columns(vec!["firstname".into(), "phone".into()]),
            filters: vec![Condition::new("phone", "12"), Condition::new("firstname", "'bob'")],
        };
        assert_eq!(
            stmt.to_sql(),
            "SELECT 'firstname', 'phone' FROM 1234 WHERE 'phone' = 12 AND 'firstname' = 'bob'"
        );
    }

    #[test]
    fn test_rowids() {
        let stmt = Statement::Select {
            table: "1234".into(),
            projection: Projection::RowId,
            filters: vec![Condition::new("phone", "12")],
        };
        assert_eq!(stmt.to_sql(), "SELECT ROWID FROM 1234 WHERE 'phone' = 12");
    }

    #[test]
    fn test_insert() {
        let stmt = Statement::Insert {
            table: "1234".into(),
            columns: vec!["firstname".into(), "phone".into()],
            values: vec!["'bob'".into(), "12".into()],
        };
        assert_eq!(
            stmt.to_sql(),
            "INSERT INTO 1234 ('firstname', 'phone') VALUES ('bob', 12)"
        );
    }

    #[test]
    fn test_update() {
        let stmt = Statement::Update {
            table: "1234".into(),
            assignments: vec![Condition::new("phone", "99")],
            row_id: "7".into(),
        };
        assert_eq!(stmt.to_sql(), "UPDATE 1234 SET 'phone' = 99 WHERE ROWID = '7'");
    }

    #[test]
    fn test_delete() {
        let all = Statement::Delete {
            table: "1234".into(),
            row_id: None,
        };
        assert_eq!(all.to_sql(), "DELETE FROM 1234");

        let one = Statement::Delete {
            table: "1234".into(),
            row_id: Some("3".into()),
        };
        assert_eq!(one.to_sql(), "DELETE FROM 1234 WHERE ROWID = '3'");
    }

    #[test]
    fn test_batch() {
        let stmts = vec![Statement::ShowTables, Statement::Describe { table: "9".into() }];
        assert_eq!(to_batch_sql(&stmts), "SHOW TABLES;DESCRIBE 9");
    }
}
