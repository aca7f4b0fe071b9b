//! Response decoder.
//!
//! The service answers every request with CSV: a header line of column
//! names, then one line per row. Values are the service's own display text
//! (`12`, `08-10-2010 20:15:01`, the stored location literal) and are handed
//! back unchanged.

use std::collections::HashMap;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, line_ending, none_of},
    combinator::{map, opt, value},
    multi::{many0, separated_list1},
    sequence::delimited,
};

use crate::error::{FtError, FtResult};

/// A decoded row: column name to display text.
pub type DecodedRow = HashMap<String, String>;

/// Parsed CSV body of a service response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    /// Parse a CSV response body.
    pub fn parse(body: &str) -> FtResult<Self> {
        let mut records = parse_csv(body)?.into_iter();
        let columns = records.next().unwrap_or_default();
        Ok(Self {
            columns,
            rows: records.collect(),
        })
    }

    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Index of a column by name.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// All values of one column.
    pub fn column(&self, column: &str) -> FtResult<Vec<String>> {
        let idx = self
            .position(column)
            .ok_or_else(|| FtError::Decode(format!("response has no '{}' column", column)))?;
        self.rows
            .iter()
            .map(|row| {
                row.get(idx).cloned().ok_or_else(|| {
                    FtError::Decode(format!("row is missing column '{}'", column))
                })
            })
            .collect()
    }

    /// The first value of the first row, for single-value answers.
    pub fn scalar(&self) -> FtResult<&str> {
        self.rows
            .first()
            .and_then(|row| row.first())
            .map(String::as_str)
            .ok_or_else(|| FtError::Decode("expected a single value, got an empty response".into()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render back to CSV.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for record in std::iter::once(&self.columns).chain(self.rows.iter()) {
            let single = record.len() == 1;
            let fields: Vec<String> = record.iter().map(|f| csv_field(f, single)).collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }
}

fn csv_field(field: &str, single: bool) -> String {
    let needs_quotes = field.contains(&[',', '"', '\n', '\r'][..]) || (single && field.is_empty());
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Map every data line to a row keyed by column name.
pub fn decode_rows(result: &ResultSet) -> FtResult<Vec<DecodedRow>> {
    result
        .rows
        .iter()
        .enumerate()
        .map(|(line, row)| {
            if row.len() != result.columns.len() {
                return Err(FtError::Decode(format!(
                    "row {} has {} fields, header has {}",
                    line + 1,
                    row.len(),
                    result.columns.len()
                )));
            }
            Ok(result
                .columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect())
        })
        .collect()
}

/// Parse a CSV document into records.
pub fn parse_csv(body: &str) -> FtResult<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut rest = body;

    while !rest.is_empty() {
        let (after, fields) = parse_record(rest).map_err(|e| {
            FtError::Decode(format!(
                "bad CSV at byte {}: {:?}",
                body.len() - rest.len(),
                e
            ))
        })?;
        let consumed = rest.len() - after.len();
        let (after, ended) = opt(line_ending::<&str, nom::error::Error<&str>>)(after)
            .map_err(|e| FtError::Decode(format!("{:?}", e)))?;

        if ended.is_none() && !after.is_empty() {
            return Err(FtError::Decode(format!(
                "unexpected content at byte {}",
                body.len() - after.len()
            )));
        }
        // Blank line
        if consumed > 0 {
            records.push(fields);
        }
        rest = after;
    }

    Ok(records)
}

/// Parse one CSV record (no line ending).
fn parse_record(input: &str) -> IResult<&str, Vec<String>> {
    separated_list1(char(','), parse_field)(input)
}

fn parse_field(input: &str) -> IResult<&str, String> {
    alt((parse_quoted_field, parse_bare_field))(input)
}

/// `"..."` with `""` standing for one quote.
fn parse_quoted_field(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            many0(alt((value('"', tag("\"\"")), none_of("\"")))),
            |chars: Vec<char>| chars.into_iter().collect(),
        ),
        char('"'),
    )(input)
}

fn parse_bare_field(input: &str) -> IResult<&str, String> {
    map(
        take_while(|c: char| c != ',' && c != '\n' && c != '\r' && c != '"'),
        String::from,
    )(input)
}
