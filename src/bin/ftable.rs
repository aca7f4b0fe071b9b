//! ftable command-line client
//!
//! # Usage
//!
//! ```bash
//! # List tables
//! ftable tables
//!
//! # Count rows matching a filter
//! ftable count 1234 phone=12
//!
//! # Try things out against the in-process service; tables persist
//! # between runs in <cache dir>/ftable/memory.json
//! ftable --memory create people firstname:string phone:number
//! ftable --memory insert 1000 firstname=bob phone=12
//!
//! # Show the literals a row encodes to (no service needed)
//! ftable encode -c firstname:string -c phone:number "firstname=bob's" phone=12
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use ftable::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ftable")]
#[command(version)]
#[command(about = "Typed client for SQL-over-HTTP tables", long_about = None)]
#[command(after_help = "EXAMPLES:
    ftable tables
    ftable create people firstname:string phone:number dob:datetime house:location
    ftable select 1234 phone=12 --format json
    ftable --memory count 1000 phone=12
    ftable encode -c phone:number -c dob:datetime phone=12 dob=2010-08-10T20:15:01Z")]
struct Cli {
    /// Config file (default: <config dir>/ftable/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Service endpoint
    #[arg(long, env = "FTABLE_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Auth token
    #[arg(long, env = "FTABLE_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Run against an in-process service kept in <cache dir>/ftable/memory.json
    #[arg(long, global = true)]
    memory: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Service(ServiceCommand),
    /// Encode a row without sending it
    Encode {
        /// Column declarations (name:type)
        #[arg(short, long = "column", required = true)]
        columns: Vec<ColumnDef>,
        /// column=value pairs
        values: Vec<String>,
    },
}

/// Commands that talk to the service.
#[derive(Subcommand)]
enum ServiceCommand {
    /// List tables
    Tables,
    /// Show the columns of a table
    Describe { table: String },
    /// Create a table from name:type columns
    Create {
        name: String,
        #[arg(required = true)]
        columns: Vec<ColumnDef>,
    },
    /// Count rows, optionally filtered by column=value
    Count { table: String, filters: Vec<String> },
    /// Select rows, optionally filtered by column=value
    Select { table: String, filters: Vec<String> },
    /// List row ids, optionally filtered by column=value
    Rowids { table: String, filters: Vec<String> },
    /// Insert one row given as column=value pairs
    Insert {
        table: String,
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Delete every row of a table
    Truncate { table: String },
    /// Drop a table
    Drop { table: String },
    /// Run raw SQL
    Query { sql: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ftable=debug" } else { "ftable=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    let command = match &cli.command {
        Commands::Encode { columns, values } => return encode_row_cmd(columns, values, &cli.format),
        Commands::Service(command) => command,
    };

    if cli.memory {
        return run_in_memory(command, cli).await;
    }

    let mut config = Config::load(cli.config.as_deref()).context("loading config")?;
    config.apply_overrides(cli.endpoint.clone(), cli.token.clone());
    if cli.verbose {
        println!("{} {}", "Endpoint:".dimmed(), config.endpoint);
    }
    let ft = FusionTables::connect(&config)?;
    dispatch(&ft, command, &cli.format).await
}

/// Run against the in-process service, keeping its tables in a snapshot
/// between invocations.
async fn run_in_memory(command: &ServiceCommand, cli: &Cli) -> Result<()> {
    let path = dirs::cache_dir()
        .map(|dir| dir.join("ftable").join("memory.json"))
        .context("no cache directory for the in-memory service")?;
    let transport = if path.exists() {
        MemoryTransport::load(&path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        MemoryTransport::new()
    };
    if cli.verbose {
        println!("{} {}", "Snapshot:".dimmed(), path.display());
    }

    let ft = FusionTables::new(transport);
    dispatch(&ft, command, &cli.format).await?;
    ft.transport()
        .save(&path)
        .with_context(|| format!("saving {}", path.display()))?;
    Ok(())
}

async fn dispatch<T: Transport>(
    ft: &FusionTables<T>,
    command: &ServiceCommand,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ServiceCommand::Tables => {
            let tables = ft.show_tables().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tables)?),
                OutputFormat::Table => {
                    let rows = tables.into_iter().map(|t| vec![t.id, t.name]).collect();
                    print_table(&["table id".to_string(), "name".to_string()], rows);
                }
            }
        }
        ServiceCommand::Describe { table } => {
            let schema = ft.describe(table).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&schema)?),
                OutputFormat::Table => {
                    let rows = schema
                        .columns()
                        .iter()
                        .map(|c| vec![c.name.clone(), c.kind.to_string()])
                        .collect();
                    print_table(&["name".to_string(), "type".to_string()], rows);
                }
            }
        }
        ServiceCommand::Create { name, columns } => {
            let table = ft.create_table(name, Schema::new(columns.clone())?).await?;
            println!("{} Created table {} ({})", "✓".green(), name.cyan(), table.id().yellow());
        }
        ServiceCommand::Count { table, filters } => {
            let table = ft.table(table).await?;
            let filters = parse_pairs(filters, table.schema())?;
            println!("{}", table.count_where(&as_filters(&filters)).await?);
        }
        ServiceCommand::Select { table, filters } => {
            let table = ft.table(table).await?;
            let filters = parse_pairs(filters, table.schema())?;
            let rows = table.select(&as_filters(&filters)).await?;
            let columns: Vec<String> = table.schema().names().map(String::from).collect();
            format_output(&columns, &rows, format)?;
        }
        ServiceCommand::Rowids { table, filters } => {
            let table = ft.table(table).await?;
            let filters = parse_pairs(filters, table.schema())?;
            for id in table.rowids(&as_filters(&filters)).await? {
                println!("{}", id);
            }
        }
        ServiceCommand::Insert { table, values } => {
            let table = ft.table(table).await?;
            let pairs = parse_pairs(values, table.schema())?;
            let row: Row = pairs.into_iter().collect();
            let ids = table.insert(&[row]).await?;
            for id in ids {
                println!("{} Inserted row {}", "✓".green(), id.to_string().yellow());
            }
        }
        ServiceCommand::Truncate { table } => {
            ft.table(table).await?.truncate().await?;
            println!("{} Truncated {}", "✓".green(), table.cyan());
        }
        ServiceCommand::Drop { table } => {
            ft.drop_table(table).await?;
            println!("{} Dropped {}", "✓".green(), table.cyan());
        }
        ServiceCommand::Query { sql } => {
            let result = ft.query(sql).await?;
            let rows = decode_rows(&result)?;
            format_output(&result.columns, &rows, format)?;
        }
    }
    Ok(())
}

fn encode_row_cmd(columns: &[ColumnDef], values: &[String], format: &OutputFormat) -> Result<()> {
    let schema = Schema::new(columns.to_vec())?;
    let row: Row = parse_pairs(values, &schema)?.into_iter().collect();
    let encoded = encode_row(&row, &schema)?;

    match format {
        OutputFormat::Json => {
            let map: HashMap<String, &str> = encoded.columns().zip(encoded.values()).collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Table => {
            println!("{}", "Encoded row:".green().bold());
            for (column, literal) in encoded.columns().zip(encoded.values()) {
                println!("  {} = {}", column.cyan(), literal.white());
            }
        }
    }
    Ok(())
}

/// Parse `column=value` arguments against a schema.
fn parse_pairs(args: &[String], schema: &Schema) -> Result<Vec<(String, Value)>> {
    args.iter()
        .map(|arg| -> Result<(String, Value)> {
            let Some((column, text)) = arg.split_once('=') else {
                bail!("expected column=value, got '{}'", arg);
            };
            let kind = schema.type_of(column)?;
            Ok((column.to_string(), Value::parse_as(kind, text)?))
        })
        .collect()
}

fn as_filters(pairs: &[(String, Value)]) -> Vec<(&str, Value)> {
    pairs
        .iter()
        .map(|(column, value)| (column.as_str(), value.clone()))
        .collect()
}

fn format_output(columns: &[String], rows: &[DecodedRow], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "(no results)".dimmed());
                return Ok(());
            }
            let cells = rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .map(|c| row.get(c).cloned().unwrap_or_default())
                        .collect()
                })
                .collect();
            print_table(columns, cells);
            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }
    Ok(())
}

fn print_table(columns: &[String], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:width$}", cell, width = *w))
            .collect();
        println!("{}", cells.join(" │ "));
    }
}
