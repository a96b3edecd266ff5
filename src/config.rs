//! Datasource configuration files
//!
//! One JSON file per datasource, tagged by `"type"`:
//!
//! ```json
//! {"type": "csv", "path": "exports/users.csv"}
//! {"type": "sql", "driver_name": "duckdb", "dsn": "app.duckdb", "table_name": "users"}
//! {"type": "mock", "rows": 100}
//! ```

use crate::error::{Result, TabreconError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// CSV file, or a directory holding one CSV file per schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvConfig {
    pub path: PathBuf,
}

/// Relational database reached through DuckDB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlConfig {
    /// duckdb, sqlite, mysql or postgres
    pub driver_name: String,
    /// Database file for duckdb/sqlite, connection string for mysql/postgres
    pub dsn: String,
    /// Schema (namespace) holding the tables; defaults per driver
    #[serde(default)]
    pub database_name: Option<String>,
    /// Table used when none is given on the command line
    #[serde(default)]
    pub table_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockConfig {
    #[serde(default = "default_mock_rows")]
    pub rows: usize,
}

fn default_mock_rows() -> usize {
    100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatasourceConfig {
    Csv(CsvConfig),
    Sql(SqlConfig),
    Mock(MockConfig),
}

/// Datasource kinds accepted by `generate-config`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasourceKind {
    Csv,
    Sql,
    Mock,
}

impl DatasourceKind {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "sql" => Ok(Self::Sql),
            "mock" => Ok(Self::Mock),
            "spreadsheets" => Err(
                "Spreadsheet sources are not supported. Use 'csv', 'sql' or 'mock'".to_string(),
            ),
            _ => Err(format!("Not defined input type: {}. Use 'csv', 'sql' or 'mock'", s)),
        }
    }
}

impl fmt::Display for DatasourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasourceKind::Csv => f.write_str("csv"),
            DatasourceKind::Sql => f.write_str("sql"),
            DatasourceKind::Mock => f.write_str("mock"),
        }
    }
}

impl DatasourceConfig {
    /// A config of the given kind with placeholder values
    pub fn template(kind: DatasourceKind) -> Self {
        match kind {
            DatasourceKind::Csv => Self::Csv(CsvConfig {
                path: PathBuf::from("data.csv"),
            }),
            DatasourceKind::Sql => Self::Sql(SqlConfig {
                driver_name: "duckdb".to_string(),
                dsn: "database.duckdb".to_string(),
                database_name: None,
                table_name: None,
            }),
            DatasourceKind::Mock => Self::Mock(MockConfig {
                rows: default_mock_rows(),
            }),
        }
    }

    pub fn kind(&self) -> DatasourceKind {
        match self {
            DatasourceConfig::Csv(_) => DatasourceKind::Csv,
            DatasourceConfig::Sql(_) => DatasourceKind::Sql,
            DatasourceConfig::Mock(_) => DatasourceKind::Mock,
        }
    }

    /// Table named by the config itself, if any
    pub fn default_table(&self) -> Option<&str> {
        match self {
            DatasourceConfig::Sql(sql) => sql.table_name.as_deref(),
            _ => None,
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| TabreconError::config(format!("Invalid datasource config: {}", e)))
    }

    /// Load a config file; relative CSV paths resolve against the file's directory
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TabreconError::config(format!("Unable to read config file '{}': {}", path.display(), e))
        })?;
        let mut config = Self::from_json_str(&content)?;

        if let DatasourceConfig::Csv(csv) = &mut config {
            if csv.path.is_relative() {
                if let Some(parent) = path.parent() {
                    csv.path = parent.join(&csv.path);
                }
            }
        }

        log::debug!("Loaded {} datasource config from {}", config.kind(), path.display());
        Ok(config)
    }

    pub fn to_json_writer<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        Ok(())
    }
}
