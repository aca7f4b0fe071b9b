//! Statement parser using nom.
//!
//! Parses the SQL subset the client emits back into [`Statement`]s. The
//! in-process service uses it to understand requests.
//!
//! # Grammar
//!
//! ```text
//! batch     := statement (';' statement)* ';'?
//! statement := CREATE TABLE name '(' name ':' TYPE (',' name ':' TYPE)* ')'
//!            | SHOW TABLES
//!            | DESCRIBE id
//!            | DROP TABLE id
//!            | INSERT INTO id '(' name (',' name)* ')' VALUES '(' lit (',' lit)* ')'
//!            | SELECT (COUNT() | ROWID | name (',' name)*) FROM id [WHERE cond (AND cond)*]
//!            | UPDATE id SET cond (',' cond)* WHERE ROWID '=' lit
//!            | DELETE FROM id [WHERE ROWID '=' lit]
//! cond      := name '=' lit
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, peek, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use crate::ast::*;
use crate::error::{FtError, FtResult};
use crate::schema::{ColumnDef, ColumnType};

/// Parse a single statement.
pub fn parse(input: &str) -> FtResult<Statement> {
    let mut statements = parse_batch(input)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(FtError::parse(0, format!("Expected one statement, found {}", n))),
    }
}

/// Parse `;`-separated statements.
pub fn parse_batch(input: &str) -> FtResult<Vec<Statement>> {
    let parsed = terminated(
        separated_list1(char(';'), ws(parse_statement)),
        opt(char(';')),
    )(input);

    match parsed {
        Ok((remaining, stmts)) if remaining.trim().is_empty() => Ok(stmts),
        Ok((remaining, _)) => Err(FtError::parse(
            input.len() - remaining.len(),
            format!("Unexpected trailing content: '{}'", remaining),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(FtError::parse(
            input.len() - e.input.len(),
            format!("Parse failed near '{}'", truncate(e.input, 24)),
        )),
        Err(nom::Err::Incomplete(_)) => Err(FtError::parse(input.len(), "Incomplete input")),
    }
}

/// Strip the quotes of a string literal and undo its escaping.
///
/// Numbers come back unchanged.
pub fn unquote(literal: &str) -> String {
    let Some(inner) = literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    else {
        return literal.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('\'', Some('\'')) | ('\\', Some('\\')) => {
                chars.next();
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Surround a parser with optional whitespace.
fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn parse_statement(input: &str) -> IResult<&str, Statement> {
    alt((
        parse_create,
        parse_show,
        parse_describe,
        parse_drop,
        parse_insert,
        parse_select,
        parse_update,
        parse_delete,
    ))(input)
}

/// `CREATE TABLE 'name' ('col': TYPE, ...)`
fn parse_create(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tuple((tag_no_case("CREATE"), multispace1, tag_no_case("TABLE"), multispace1))(input)?;
    let (input, name) = parse_name(input)?;
    let (input, columns) = parens(separated_list1(char(','), ws(parse_column_def)))(input)?;

    Ok((input, Statement::CreateTable { name, columns }))
}

fn parse_column_def(input: &str) -> IResult<&str, ColumnDef> {
    let (input, name) = parse_name(input)?;
    let (input, _) = ws(char(':'))(input)?;
    let (input, kind) = parse_column_type(input)?;
    Ok((input, ColumnDef::new(name, kind)))
}

fn parse_column_type(input: &str) -> IResult<&str, ColumnType> {
    alt((
        value(ColumnType::String, tag_no_case("STRING")),
        value(ColumnType::Number, tag_no_case("NUMBER")),
        value(ColumnType::Datetime, tag_no_case("DATETIME")),
        value(ColumnType::Location, tag_no_case("LOCATION")),
    ))(input)
}

/// `SHOW TABLES`
fn parse_show(input: &str) -> IResult<&str, Statement> {
    value(
        Statement::ShowTables,
        tuple((tag_no_case("SHOW"), multispace1, tag_no_case("TABLES"))),
    )(input)
}

/// `DESCRIBE <id>`
fn parse_describe(input: &str) -> IResult<&str, Statement> {
    map(
        preceded(pair(tag_no_case("DESCRIBE"), multispace1), parse_identifier),
        |table| Statement::Describe {
            table: table.to_string(),
        },
    )(input)
}

/// `DROP TABLE <id>`
fn parse_drop(input: &str) -> IResult<&str, Statement> {
    map(
        preceded(
            tuple((tag_no_case("DROP"), multispace1, tag_no_case("TABLE"), multispace1)),
            parse_identifier,
        ),
        |table| Statement::DropTable {
            table: table.to_string(),
        },
    )(input)
}

/// `INSERT INTO <id> ('a', 'b') VALUES (x, y)`
fn parse_insert(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tuple((tag_no_case("INSERT"), multispace1, tag_no_case("INTO"), multispace1))(input)?;
    let (input, table) = parse_identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, columns) = parens(separated_list1(char(','), ws(parse_name)))(input)?;
    let (input, _) = ws(tag_no_case("VALUES"))(input)?;
    let (input, values) = parens(separated_list1(char(','), ws(parse_literal)))(input)?;

    Ok((
        input,
        Statement::Insert {
            table: table.to_string(),
            columns,
            values,
        },
    ))
}

/// `SELECT <projection> FROM <id> [WHERE ...]`
fn parse_select(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(tag_no_case("SELECT"), multispace1)(input)?;
    let (input, projection) = parse_projection(input)?;
    let (input, _) = ws(tag_no_case("FROM"))(input)?;
    let (input, table) = parse_identifier(input)?;
    let (input, filters) = opt(preceded(
        ws(tag_no_case("WHERE")),
        separated_list1(ws(tag_no_case("AND")), parse_condition),
    ))(input)?;

    Ok((
        input,
        Statement::Select {
            table: table.to_string(),
            projection,
            filters: filters.unwrap_or_default(),
        },
    ))
}

fn parse_projection(input: &str) -> IResult<&str, Projection> {
    alt((
        value(
            Projection::Count,
            tuple((tag_no_case("COUNT"), multispace0, char('('), multispace0, char(')'))),
        ),
        value(
            Projection::RowId,
            terminated(tag_no_case("ROWID"), peek(multispace1)),
        ),
        map(separated_list1(char(','), ws(parse_name)), Projection::Columns),
    ))(input)
}

/// `UPDATE <id> SET 'a' = x, ... WHERE ROWID = 'n'`
fn parse_update(input: &str) -> IResult<&str, Statement> {
    let (input, _) = pair(tag_no_case("UPDATE"), multispace1)(input)?;
    let (input, table) = parse_identifier(input)?;
    let (input, _) = ws(tag_no_case("SET"))(input)?;
    let (input, assignments) = separated_list1(char(','), ws(parse_condition))(input)?;
    let (input, row_id) = parse_rowid_filter(input)?;

    Ok((
        input,
        Statement::Update {
            table: table.to_string(),
            assignments,
            row_id,
        },
    ))
}

/// `DELETE FROM <id> [WHERE ROWID = 'n']`
fn parse_delete(input: &str) -> IResult<&str, Statement> {
    let (input, _) = tuple((tag_no_case("DELETE"), multispace1, tag_no_case("FROM"), multispace1))(input)?;
    let (input, table) = parse_identifier(input)?;
    let (input, row_id) = opt(parse_rowid_filter)(input)?;

    Ok((
        input,
        Statement::Delete {
            table: table.to_string(),
            row_id,
        },
    ))
}

/// `WHERE ROWID = 'n'`
fn parse_rowid_filter(input: &str) -> IResult<&str, String> {
    let (input, _) = ws(tag_no_case("WHERE"))(input)?;
    let (input, _) = tag_no_case("ROWID")(input)?;
    let (input, _) = ws(char('='))(input)?;
    let (input, literal) = parse_literal(input)?;
    Ok((input, unquote(&literal)))
}

/// `'column' = literal`
fn parse_condition(input: &str) -> IResult<&str, Condition> {
    let (input, column) = parse_name(input)?;
    let (input, _) = ws(char('='))(input)?;
    let (input, literal) = parse_literal(input)?;
    Ok((input, Condition { column, literal }))
}

fn parens<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(ws(char('(')), inner, ws(char(')')))
}

/// Parse an identifier (table id, bare column name).
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Quoted or bare name, unescaped.
fn parse_name(input: &str) -> IResult<&str, String> {
    alt((
        map(parse_quoted, unquote),
        map(parse_identifier, String::from),
    ))(input)
}

/// A value literal, kept in its encoded form.
fn parse_literal(input: &str) -> IResult<&str, String> {
    map(alt((parse_quoted, parse_number)), String::from)(input)
}

/// Recognize a quoted string, escapes included.
fn parse_quoted(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('\''),
        many0(alt((tag("''"), tag("\\\\"), is_not("'\\"), tag("\\")))),
        char('\''),
    ))(input)
}

/// Parse a number (integer or decimal).
fn parse_number(input: &str) -> IResult<&str, &str> {
    map_res(
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |s: &str| s.parse::<f64>().map(|_| s),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::ToSql;

    #[test]
    fn test_create_table() {
        let stmt = parse("CREATE TABLE 'test' ('firstname': STRING, 'phone': NUMBER, 'dob': DATETIME, 'house': LOCATION)").unwrap();
        match stmt {
            Statement::CreateTable { name, columns } => {
                assert_eq!(name, "test");
                assert_eq!(columns.len(), 4);
                assert_eq!(columns[3], ColumnDef::new("house", ColumnType::Location));
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_show_describe_drop() {
        assert_eq!(parse("SHOW TABLES").unwrap(), Statement::ShowTables);
        assert_eq!(
            parse("describe 1234").unwrap(),
            Statement::Describe { table: "1234".into() }
        );
        assert_eq!(
            parse("DROP TABLE 1234").unwrap(),
            Statement::DropTable { table: "1234".into() }
        );
    }

    #[test]
    fn test_insert() {
        let stmt = parse("INSERT INTO 1234 ('firstname', 'phone') VALUES ('\\\\bob''s pizza', 12)").unwrap();
        assert_eq!(
            stmt,
            Statement::Insert {
                table: "1234".into(),
                columns: vec!["firstname".into(), "phone".into()],
                values: vec!["'\\\\bob''s pizza'".into(), "12".into()],
            }
        );
    }

    #[test]
    fn test_select_count() {
        let stmt = parse("SELECT COUNT() FROM 1234 WHERE 'phone' = 12").unwrap();
        assert_eq!(
            stmt,
            Statement::Select {
                table: "1234".into(),
                projection: Projection::Count,
                filters: vec![Condition::new("phone", "12")],
            }
        );
    }

    #[test]
    fn test_select_rowid_and_columns() {
        let stmt = parse("SELECT ROWID FROM 1234").unwrap();
        assert!(matches!(stmt, Statement::Select { projection: Projection::RowId, .. }));

        let stmt = parse("SELECT 'a', b FROM 1234 WHERE 'a' = 'x' AND b = -1.5").unwrap();
        assert_eq!(
            stmt,
            Statement::Select {
                table: "1234".into(),
                projection: Projection::Columns(vec!["a".into(), "b".into()]),
                filters: vec![Condition::new("a", "'x'"), Condition::new("b", "-1.5")],
            }
        );
    }

    #[test]
    fn test_column_named_like_rowid() {
        let stmt = parse("SELECT rowid_copy FROM 1").unwrap();
        assert_eq!(
            stmt,
            Statement::Select {
                table: "1".into(),
                projection: Projection::Columns(vec!["rowid_copy".into()]),
                filters: vec![],
            }
        );
    }

    #[test]
    fn test_update_and_delete() {
        let stmt = parse("UPDATE 1234 SET 'phone' = 99 WHERE ROWID = '7'").unwrap();
        assert_eq!(
            stmt,
            Statement::Update {
                table: "1234".into(),
                assignments: vec![Condition::new("phone", "99")],
                row_id: "7".into(),
            }
        );
        assert_eq!(
            parse("DELETE FROM 1234").unwrap(),
            Statement::Delete { table: "1234".into(), row_id: None }
        );
        assert_eq!(
            parse("DELETE FROM 1234 WHERE ROWID = '3';").unwrap(),
            Statement::Delete { table: "1234".into(), row_id: Some("3".into()) }
        );
    }

    #[test]
    fn test_batch() {
        let stmts = parse_batch("INSERT INTO 1 ('a') VALUES (1);INSERT INTO 1 ('a') VALUES (2)").unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(parse("SHOW TABLES;SHOW TABLES").is_err());
    }

    #[test]
    fn test_transpiled_sql_parses_back() {
        let stmt = Statement::Update {
            table: "42".into(),
            assignments: vec![Condition::new("it's", "'a''b'")],
            row_id: "9".into(),
        };
        assert_eq!(parse(&stmt.to_sql()).unwrap(), stmt);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'\\\\bob''s pizza'"), "\\bob's pizza");
        assert_eq!(unquote("12"), "12");
        assert_eq!(unquote("'08-10-2010 20:15:01'"), "08-10-2010 20:15:01");
    }

    #[test]
    fn test_errors() {
        let err = parse("SELECT FROM").unwrap_err();
        assert!(matches!(err, FtError::Parse { .. }));
        let err = parse("SHOW TABLES garbage").unwrap_err();
        assert!(matches!(err, FtError::Parse { position: 12, .. }));
    }
}
