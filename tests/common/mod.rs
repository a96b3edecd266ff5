//! Common test utilities and helpers

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabrecon::{Column, GenericValue, RawValue, Result, Row};
use tempfile::TempDir;

/// Test fixture manager for creating temporary test environments
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Get the root path of the test fixture
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a test CSV file with sample data
    pub fn create_csv(&self, name: &str, data: &[Vec<&str>]) -> Result<PathBuf> {
        let mut content = String::new();
        for row in data {
            content.push_str(&row.join(","));
            content.push('\n');
        }
        self.create_csv_raw(name, &content)
    }

    /// Create a test CSV file with raw string content
    pub fn create_csv_raw(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Create a test JSON file
    pub fn create_json(&self, name: &str, data: &serde_json::Value) -> Result<PathBuf> {
        let path = self.root().join(name);
        fs::write(&path, serde_json::to_string_pretty(data)?)?;
        Ok(path)
    }

    /// Config file pointing at a CSV file or directory
    pub fn csv_config(&self, name: &str, csv_path: &Path) -> Result<PathBuf> {
        self.create_json(
            name,
            &serde_json::json!({"type": "csv", "path": csv_path.to_string_lossy()}),
        )
    }

    /// Config file for a DuckDB database file
    pub fn duckdb_config(&self, name: &str, db_path: &Path, table: Option<&str>) -> Result<PathBuf> {
        self.create_json(
            name,
            &serde_json::json!({
                "type": "sql",
                "driver_name": "duckdb",
                "dsn": db_path.to_string_lossy(),
                "table_name": table,
            }),
        )
    }

    pub fn mock_config(&self, name: &str, rows: usize) -> Result<PathBuf> {
        self.create_json(name, &serde_json::json!({"type": "mock", "rows": rows}))
    }

    /// Create a DuckDB database file by running `sql` against it
    pub fn create_duckdb(&self, name: &str, sql: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        let conn = duckdb::Connection::open(&path)?;
        conn.execute_batch(sql)?;
        conn.close().map_err(|(_, e)| e)?;
        Ok(path)
    }
}

/// Helper for running CLI commands in tests
pub struct CliTestRunner {
    fixture: TestFixture,
}

impl CliTestRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fixture: TestFixture::new()?,
        })
    }

    pub fn fixture(&self) -> &TestFixture {
        &self.fixture
    }

    /// Run a tabrecon command and return the result
    pub fn run_command(&self, args: &[&str]) -> Result<()> {
        use clap::Parser;
        use tabrecon::cli::Cli;
        use tabrecon::commands::execute_command;

        let mut cmd_args = vec!["tabrecon"];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args)
            .map_err(|e| tabrecon::TabreconError::invalid_input(e.to_string()))?;
        execute_command(cli.command)
    }

    /// Run a command and expect it to succeed
    pub fn expect_success(&self, args: &[&str]) {
        self.run_command(args).expect("Command should succeed");
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> tabrecon::TabreconError {
        self.run_command(args).expect_err("Command should fail")
    }
}

/// Build rows directly, without a connector
pub mod rows {
    use super::*;

    /// One row from `(column, value)` pairs
    pub fn row(cells: Vec<(&Arc<Column>, RawValue)>) -> Row {
        cells
            .into_iter()
            .map(|(column, raw)| GenericValue::new(column.clone(), raw))
            .collect()
    }

    pub fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }
}

/// Sample data generators for testing
pub mod sample_data {
    use serde_json::json;

    pub fn products_csv_data() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "price"],
            vec!["1", "Apple", "1.50"],
            vec!["2", "Banana", "0.75"],
            vec!["3", "Cherry", "2.00"],
        ]
    }

    pub fn updated_products_csv_data() -> Vec<Vec<&'static str>> {
        vec![
            vec!["id", "name", "price"],
            vec!["1", "Apple", "1.60"], // Price changed
            vec!["2", "Banana", "0.75"],
            vec!["4", "Date", "3.00"], // New row, Cherry removed
        ]
    }

    pub fn products_schema() -> serde_json::Value {
        json!({
            "name": "products",
            "columns": [
                {"name": "id", "type": "int", "ordinal_position": 0, "not_null": true},
                {"name": "name", "type": "string", "ordinal_position": 1},
                {"name": "price", "type": "float", "ordinal_position": 2}
            ],
            "primary_key": {"column_names": ["id"]}
        })
    }

    pub fn products_table_sql() -> &'static str {
        "CREATE TABLE products (id INTEGER PRIMARY KEY, name VARCHAR, price DOUBLE);
         INSERT INTO products VALUES (1, 'Apple', 1.5), (2, 'Banana', 0.75), (3, 'Cherry', 2.0);"
    }
}

/// Assertion helpers for test validation
pub mod assertions {
    use std::path::Path;
    use tabrecon::Result;

    /// Assert that a file exists and is not empty
    pub fn assert_file_exists_and_not_empty(path: &Path) {
        assert!(path.exists(), "File should exist: {}", path.display());
        let metadata = std::fs::metadata(path).expect("Should be able to read file metadata");
        assert!(metadata.len() > 0, "File should not be empty: {}", path.display());
    }

    /// Read a JSON file written by a command
    pub fn read_json(path: &Path) -> Result<serde_json::Value> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Assert that a JSON file contains expected keys
    pub fn assert_json_contains_keys(path: &Path, keys: &[&str]) -> Result<()> {
        let json = read_json(path)?;
        for key in keys {
            assert!(json.get(key).is_some(), "JSON should contain key '{}': {}", key, path.display());
        }
        Ok(())
    }
}
