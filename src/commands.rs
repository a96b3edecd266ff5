//! Command implementations for tabrecon CLI

use crate::cli::{Commands, OutputFormat};
use crate::config::{DatasourceConfig, DatasourceKind, SqlConfig};
use crate::datasource::{self, Session};
use crate::error::{Result, Side, TabreconError};
use crate::output::{DiffReport, JsonFormatter, MatchMode, PrettyPrinter, SchemaComparison};
use crate::row::RowSet;
use crate::row_diff::diff_rows;
use crate::schema::Schema;
use crate::value::ColumnType;
use crate::schema_diff::diff_schemas;
use crate::progress::FetchProgress;
use anyhow::Context;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

/// Execute a command
pub fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::GenerateConfig { kind, output } => {
            generate_config_command(kind, output.as_deref())
        }
        Commands::GenerateSchema {
            config,
            table,
            output,
        } => generate_schema_command(&config, table.as_deref(), output.as_deref()),
        Commands::Dump {
            config,
            table,
            format,
        } => dump_command(&config, table.as_deref(), &format),
        Commands::Diff {
            left,
            right,
            schema,
            table,
            format,
            output,
            quiet,
        } => diff_command(&DiffOptions {
            left,
            right,
            schema,
            table,
            format,
            output,
            quiet,
        }),
    }
}

/// Arguments of the `diff` command
#[derive(Debug, Clone)]
pub struct DiffOptions {
    pub left: PathBuf,
    pub right: PathBuf,
    pub schema: Option<PathBuf>,
    pub table: Option<String>,
    pub format: String,
    pub output: Option<PathBuf>,
    pub quiet: bool,
}

/// Write a datasource config template.
///
/// Without `--type` on a terminal, every field is prompted for; otherwise the
/// template keeps its placeholder values.
fn generate_config_command(kind: Option<DatasourceKind>, output: Option<&Path>) -> Result<()> {
    let interactive = kind.is_none() && io::stdin().is_terminal();

    let kind = match kind {
        Some(kind) => kind,
        None if interactive => {
            let answer = prompt("Datasource type (csv, sql, mock)", "csv")?;
            DatasourceKind::parse(&answer).map_err(TabreconError::invalid_input)?
        }
        None => {
            return Err(TabreconError::invalid_input(
                "--type is required when stdin is not a terminal",
            ))
        }
    };

    let mut config = DatasourceConfig::template(kind);
    if interactive {
        fill_interactively(&mut config)?;
    }

    write_output(output, |writer| config.to_json_writer(writer))?;
    if let Some(path) = output {
        log::info!("Wrote {} config to {}", kind, path.display());
    }
    Ok(())
}

fn fill_interactively(config: &mut DatasourceConfig) -> Result<()> {
    match config {
        DatasourceConfig::Csv(csv) => {
            let path = prompt("CSV file or directory", &csv.path.to_string_lossy())?;
            csv.path = PathBuf::from(path);
        }
        DatasourceConfig::Sql(SqlConfig {
            driver_name,
            dsn,
            database_name,
            table_name,
        }) => {
            *driver_name = prompt("Driver (duckdb, sqlite, mysql, postgres)", driver_name)?;
            *dsn = prompt("DSN", dsn)?;
            *database_name = optional(prompt("Database (schema) name", "")?);
            *table_name = optional(prompt("Table name", "")?);
        }
        DatasourceConfig::Mock(mock) => {
            let rows = prompt("Number of rows", &mock.rows.to_string())?;
            mock.rows = rows
                .parse()
                .map_err(|_| TabreconError::invalid_input(format!("Invalid row count: {}", rows)))?;
        }
    }
    Ok(())
}

fn prompt(label: &str, default: &str) -> Result<String> {
    eprint!("{} [{}]: ", label, default);
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .with_context(|| format!("Failed to read answer for '{}'", label))?;

    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

fn optional(answer: String) -> Option<String> {
    (!answer.is_empty()).then_some(answer)
}

/// Describe one schema of a datasource as JSON
fn generate_schema_command(config_path: &Path, table: Option<&str>, output: Option<&Path>) -> Result<()> {
    let config = DatasourceConfig::from_json_file(config_path)?;
    let table = table.or(config.default_table());

    let mut source = datasource::from_config(&config);
    let mut session = Session::open(source.as_mut())?;
    let schema = session.resolve_schema(table)?;

    write_output(output, |mut writer| {
        serde_json::to_writer_pretty(&mut writer, &schema)?;
        writeln!(writer)?;
        Ok(())
    })?;
    if let Some(path) = output {
        log::info!("Wrote schema '{}' to {}", schema.name(), path.display());
    }
    Ok(())
}

/// Print the rows of one schema
fn dump_command(config_path: &Path, table: Option<&str>, format: &str) -> Result<()> {
    let format = OutputFormat::parse(format).map_err(TabreconError::invalid_input)?;
    let config = DatasourceConfig::from_json_file(config_path)?;
    let table = table.or(config.default_table());

    let mut source = datasource::from_config(&config);
    let mut session = Session::open(source.as_mut())?;
    let schema = session.resolve_schema(table)?;
    let rows = session.get_rows(&schema)?;

    match format {
        OutputFormat::Json => println!("{}", JsonFormatter::format(&rows)?),
        OutputFormat::Pretty => {
            PrettyPrinter::print_schema(&schema);
            println!();
            PrettyPrinter::print_rows(&schema, &rows);
        }
    }
    Ok(())
}

/// What one side of a comparison produced
#[derive(Debug)]
struct Fetched {
    /// The schema the source itself reports, if it can
    live_schema: Option<Schema>,
    rows: RowSet,
}

/// Compare two datasources and report
pub fn diff_command(options: &DiffOptions) -> Result<()> {
    let report = build_diff_report(options)?;
    let format = OutputFormat::parse(&options.format).map_err(TabreconError::invalid_input)?;

    if let Some(path) = &options.output {
        fs::write(path, JsonFormatter::format(&report)?)?;
        log::info!("Wrote diff report to {}", path.display());
    }

    match format {
        OutputFormat::Json => println!("{}", JsonFormatter::format(&report)?),
        OutputFormat::Pretty => PrettyPrinter::print_diff_report(&report, options.quiet),
    }
    Ok(())
}

/// Fetch both sides in parallel and diff them
pub fn build_diff_report(options: &DiffOptions) -> Result<DiffReport> {
    let format = OutputFormat::parse(&options.format).map_err(TabreconError::invalid_input)?;
    let left_config = DatasourceConfig::from_json_file(&options.left)?;
    let right_config = DatasourceConfig::from_json_file(&options.right)?;
    let reference = options
        .schema
        .as_deref()
        .map(Schema::from_json_file)
        .transpose()?;

    let left_label = options.left.display().to_string();
    let right_label = options.right.display().to_string();

    let progress = if options.quiet || format == OutputFormat::Json {
        FetchProgress::new_minimal()
    } else {
        FetchProgress::new_for_diff(&left_label, &right_label)
    };

    let table = options.table.as_deref();
    let (left, right) = rayon::join(
        || fetch_side(&left_config, reference.as_ref(), table, Side::Left, &progress),
        || fetch_side(&right_config, reference.as_ref(), table, Side::Right, &progress),
    );
    drop(progress);
    let (left, right) = (left?, right?);

    let (mode, schema_deltas, diff) = match &reference {
        Some(reference) => {
            let deltas = [(Side::Left, &left), (Side::Right, &right)]
                .into_iter()
                .filter_map(|(side, fetched)| {
                    fetched.live_schema.as_ref().map(|live| SchemaComparison {
                        between: format!("reference → {}", side),
                        delta: diff_schemas(reference, live),
                    })
                })
                .collect();
            let mode = if reference.primary_key().is_some() {
                MatchMode::Keyed
            } else {
                MatchMode::Unkeyed
            };
            (mode, deltas, diff_rows(&left.rows, &right.rows, Some(reference))?)
        }
        None => {
            let deltas = match (&left.live_schema, &right.live_schema) {
                (Some(l), Some(r)) => vec![SchemaComparison {
                    between: "left → right".to_string(),
                    delta: diff_schemas(l, r),
                }],
                _ => Vec::new(),
            };
            let typing = borrowed_typing(left.live_schema.as_ref(), right.live_schema.as_ref())?;
            if let Some(typing) = &typing {
                log::debug!("Reading textual side with the column types of '{}'", typing.name());
            }
            let diff = diff_rows(&left.rows, &right.rows, typing.as_ref())?;
            (MatchMode::Unkeyed, deltas, diff)
        }
    };

    log::debug!(
        "Diff complete: {} added, {} deleted, {} modified",
        diff.added().len(),
        diff.deleted().len(),
        diff.modified().len()
    );

    Ok(DiffReport {
        left: left_label,
        right: right_label,
        mode,
        schema_deltas,
        diff,
    })
}

/// Keyless copy of the typed side's schema when the other side is all text
/// over the same columns (a CSV file against a database table)
fn borrowed_typing(left: Option<&Schema>, right: Option<&Schema>) -> Result<Option<Schema>> {
    let (Some(left), Some(right)) = (left, right) else {
        return Ok(None);
    };
    let typed = match (is_textual(left), is_textual(right)) {
        (true, false) => right,
        (false, true) => left,
        _ => return Ok(None),
    };

    let same_columns = left.columns().len() == right.columns().len()
        && left.columns().iter().all(|c| right.column(&c.name).is_some());
    // Text never converts to bytes
    let has_bytes = typed.columns().iter().any(|c| c.column_type == ColumnType::Bytes);
    if !same_columns || has_bytes {
        return Ok(None);
    }

    Schema::new(typed.name(), typed.columns().to_vec(), None).map(Some)
}

fn is_textual(schema: &Schema) -> bool {
    schema
        .columns()
        .iter()
        .all(|c| c.column_type == ColumnType::String)
}

/// Open one side, read its schema and rows, close it again
fn fetch_side(
    config: &DatasourceConfig,
    reference: Option<&Schema>,
    table: Option<&str>,
    side: Side,
    progress: &FetchProgress,
) -> Result<Fetched> {
    let table = table.or(config.default_table());
    let mut source = datasource::from_config(config);
    let mut session = Session::open(source.as_mut())?;

    progress.update(side, &format!("Reading {} schema...", side));
    let fetched = match reference {
        Some(reference) => {
            let target = match table {
                Some(name) => reference.clone().with_name(name),
                None => reference.clone(),
            };
            let live_schema = session
                .get_schema(target.name())
                .or_else(|_| session.resolve_schema(None))
                .map_err(|e| log::debug!("No live {} schema to compare: {}", side, e))
                .ok();

            progress.update(side, &format!("Reading {} rows...", side));
            let rows = session.get_rows(&target)?;
            Fetched { live_schema, rows }
        }
        None => {
            let schema = session.resolve_schema(table)?;
            progress.update(side, &format!("Reading {} rows...", side));
            let rows = session.get_rows(&schema)?;
            Fetched {
                live_schema: Some(schema),
                rows,
            }
        }
    };

    log::info!("Fetched {} rows from {} side", fetched.rows.len(), side);
    progress.finish(side, &format!("{}: {} rows", side, fetched.rows.len()));
    Ok(fetched)
}

/// Run `write` against the output file, or stdout when none is given
fn write_output<F>(output: Option<&Path>, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    match output {
        Some(path) => {
            let mut file = fs::File::create(path)?;
            write(&mut file)
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)
        }
    }
}
