//! CSV connector backed by DuckDB's `read_csv`
//!
//! Every cell is read as text; typing happens later, when values are
//! normalized against the declared column type. A directory config exposes
//! one schema per `.csv` file, named by the file stem.

use super::Datasource;
use crate::config::CsvConfig;
use crate::error::{Result, TabreconError};
use crate::row::{Row, RowSet};
use crate::schema::{Column, Schema};
use crate::value::{ColumnType, GenericValue, RawValue};
use duckdb::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub struct CsvDatasource {
    config: CsvConfig,
    connection: Option<Connection>,
    /// Schemas set by the caller; they take precedence over inferred ones
    attached: Vec<Schema>,
}

impl CsvDatasource {
    pub fn new(config: CsvConfig) -> Self {
        Self {
            config,
            connection: None,
            attached: Vec::new(),
        }
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| TabreconError::invalid_input("CSV datasource is not open"))
    }

    fn is_single_file(&self) -> bool {
        self.config.path.is_file()
    }

    /// CSV files this source exposes, sorted by path
    fn files(&self) -> Result<Vec<PathBuf>> {
        let path = &self.config.path;
        if path.is_file() {
            return Ok(vec![path.clone()]);
        }
        if !path.is_dir() {
            return Err(TabreconError::invalid_input(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(path).min_depth(1).max_depth(1) {
            let entry = entry?;
            let is_csv = entry
                .path()
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));
            if entry.file_type().is_file() && is_csv {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn file_for(&self, name: &str) -> Result<PathBuf> {
        if self.is_single_file() {
            return Ok(self.config.path.clone());
        }
        self.files()?
            .into_iter()
            .find(|path| schema_name(path) == name)
            .ok_or_else(|| TabreconError::schema_not_found(name))
    }

    /// Target path for `set_rows`; may not exist yet
    fn write_target(&self, name: &str) -> PathBuf {
        if self.config.path.is_dir() {
            self.config.path.join(format!("{}.csv", name))
        } else {
            self.config.path.clone()
        }
    }

    fn load_view(&self, path: &Path) -> Result<()> {
        let sql = format!(
            "CREATE OR REPLACE VIEW csv_view AS SELECT * FROM read_csv('{}', header = true, all_varchar = true)",
            path.to_string_lossy().replace('\'', "''")
        );
        self.connection()?
            .execute(&sql, [])
            .map_err(|e| convert_duckdb_error(e, path))?;
        Ok(())
    }

    /// Header names in file order
    fn header(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("DESCRIBE csv_view")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn infer_schema(&self, path: &Path) -> Result<Schema> {
        self.load_view(path)?;
        let columns = self
            .header()?
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column::new(name, ColumnType::String).at_position(i))
            .collect();
        Schema::new(schema_name(path), columns, None)
    }
}

impl Datasource for CsvDatasource {
    fn kind(&self) -> &'static str {
        "csv"
    }

    fn open(&mut self) -> Result<()> {
        if self.connection.is_none() {
            self.connection = Some(Connection::open_in_memory()?);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.connection.take() {
            conn.close().map_err(|(_, e)| TabreconError::DuckDb(e))?;
        }
        Ok(())
    }

    fn get_all_schemas(&mut self) -> Result<Vec<Schema>> {
        let mut schemas = Vec::new();
        for path in self.files()? {
            let name = schema_name(&path);
            match self.attached.iter().find(|s| s.name() == name) {
                Some(schema) => schemas.push(schema.clone()),
                None => schemas.push(self.infer_schema(&path)?),
            }
        }
        Ok(schemas)
    }

    fn get_schema(&mut self, name: &str) -> Result<Schema> {
        if let Some(schema) = self.attached.iter().find(|s| s.name() == name) {
            return Ok(schema.clone());
        }
        let path = self
            .files()?
            .into_iter()
            .find(|path| schema_name(path) == name)
            .ok_or_else(|| TabreconError::schema_not_found(name))?;
        self.infer_schema(&path)
    }

    fn set_schema(&mut self, schema: &Schema) -> Result<()> {
        self.attached.retain(|s| s.name() != schema.name());
        self.attached.push(schema.clone());
        Ok(())
    }

    /// Cells are tagged with the schema's column when the header names one;
    /// other header columns are carried as strings.
    fn get_rows(&mut self, schema: &Schema) -> Result<RowSet> {
        let path = self.file_for(schema.name())?;
        self.load_view(&path)?;

        let header = self.header()?;
        let columns: Vec<Arc<Column>> = header
            .iter()
            .enumerate()
            .map(|(i, name)| match schema.column(name) {
                Some(column) => Arc::new(column.clone()),
                None => Arc::new(Column::new(name.clone(), ColumnType::String).at_position(i)),
            })
            .collect();

        for column in schema.columns() {
            if !header.contains(&column.name) {
                log::warn!(
                    "Column '{}' of schema '{}' is not in {}",
                    column.name,
                    schema.name(),
                    path.display()
                );
            }
        }

        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT * FROM csv_view")?;
        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    cells.push(row.get::<_, Option<String>>(i)?);
                }
                Ok(cells)
            })
            .map_err(|e| convert_duckdb_error(e, &path))?;

        let mut result = Vec::new();
        for cells in rows {
            let cells = cells.map_err(|e| convert_duckdb_error(e, &path))?;
            let row = columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| {
                    let raw = cell.map_or(RawValue::Null, RawValue::Text);
                    GenericValue::new(column.clone(), raw)
                })
                .collect::<Row>();
            result.push(row);
        }

        log::debug!("Read {} rows from {}", result.len(), path.display());
        Ok(result)
    }

    fn set_rows(&mut self, schema: &Schema, rows: &[Row]) -> Result<()> {
        let path = self.write_target(schema.name());
        fs::write(&path, create_csv_content(schema, rows))?;
        log::info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}

fn schema_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Header plus one line per row, in schema column order; nulls are empty
fn create_csv_content(schema: &Schema, rows: &[Row]) -> String {
    let mut content = schema.column_names().join(",");
    content.push('\n');

    for row in rows {
        let line: Vec<String> = schema
            .columns()
            .iter()
            .map(|column| {
                let value = row
                    .get(&column.name)
                    .and_then(|v| v.display_text())
                    .unwrap_or_default();
                if value.contains(',') || value.contains('"') || value.contains('\n') {
                    format!("\"{}\"", value.replace('"', "\"\""))
                } else {
                    value
                }
            })
            .collect();
        content.push_str(&line.join(","));
        content.push('\n');
    }

    content
}

fn convert_duckdb_error(error: duckdb::Error, path: &Path) -> TabreconError {
    let msg = error.to_string();
    if msg.contains("CSV Error")
        || msg.contains("Invalid CSV")
        || msg.contains("Unterminated quoted field")
    {
        TabreconError::invalid_input(format!("Malformed CSV file '{}': {}", path.display(), msg))
    } else if msg.contains("No files found") || msg.contains("does not exist") {
        TabreconError::invalid_input(format!("File not found: {}", path.display()))
    } else if msg.contains("UTF-8") || msg.contains("encoding") {
        TabreconError::invalid_input(format!("File encoding error '{}': {}", path.display(), msg))
    } else {
        TabreconError::DuckDb(error)
    }
}
