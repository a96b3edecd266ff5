//! Schema model: columns, primary keys and the schema container

use crate::error::{Result, TabreconError};
use crate::value::ColumnType;
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A column definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Source-declared position; display and round-trip only
    #[serde(default)]
    pub ordinal_position: usize,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub auto_increment: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            ordinal_position: 0,
            not_null: false,
            auto_increment: false,
        }
    }

    pub fn at_position(mut self, ordinal_position: usize) -> Self {
        self.ordinal_position = ordinal_position;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// Ordered, non-empty list of key column names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub column_names: Vec<String>,
}

impl PrimaryKey {
    pub fn new<I, S>(column_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let column_names: Vec<String> = column_names.into_iter().map(Into::into).collect();
        if column_names.is_empty() {
            return Err(TabreconError::invalid_schema("primary key must name at least one column"));
        }
        let mut seen = HashSet::new();
        for name in &column_names {
            if !seen.insert(name.as_str()) {
                return Err(TabreconError::invalid_schema(format!(
                    "primary key lists column '{}' twice",
                    name
                )));
            }
        }
        Ok(Self { column_names })
    }
}

#[derive(Deserialize)]
struct SchemaDef {
    name: String,
    columns: Vec<Column>,
    #[serde(default)]
    primary_key: Option<PrimaryKey>,
}

impl TryFrom<SchemaDef> for Schema {
    type Error = TabreconError;

    fn try_from(def: SchemaDef) -> Result<Self> {
        Schema::new(def.name, def.columns, def.primary_key)
    }
}

/// Named, ordered set of columns with an optional primary key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDef")]
pub struct Schema {
    name: String,
    columns: Vec<Column>,
    primary_key: Option<PrimaryKey>,
}

impl Schema {
    /// Build a schema, rejecting duplicate column names and key columns that do not exist
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        primary_key: Option<PrimaryKey>,
    ) -> Result<Self> {
        let name = name.into();

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TabreconError::invalid_schema(format!(
                    "schema '{}' declares column '{}' more than once",
                    name, column.name
                )));
            }
            if column.column_type == ColumnType::Null {
                return Err(TabreconError::invalid_schema(format!(
                    "column '{}' in schema '{}' has no usable type",
                    column.name, name
                )));
            }
        }

        if let Some(key) = &primary_key {
            // Re-validate: deserialized keys bypass PrimaryKey::new
            PrimaryKey::new(key.column_names.iter().cloned())?;
            for key_column in &key.column_names {
                if !seen.contains(key_column.as_str()) {
                    return Err(TabreconError::invalid_schema(format!(
                        "primary key column '{}' is not a column of schema '{}'",
                        key_column, name
                    )));
                }
            }
        }

        Ok(Self {
            name,
            columns,
            primary_key,
        })
    }

    /// Load a schema from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TabreconError::invalid_input(format!(
                "Failed to read schema file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same columns and key under another name (e.g. a differently named table)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    /// Key column names in key order; empty when no key is declared
    pub fn key_column_names(&self) -> &[String] {
        self.primary_key
            .as_ref()
            .map(|key| key.column_names.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.key_column_names().iter().any(|key| key == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Order-independent digest of column definitions and key
    pub fn fingerprint(&self) -> String {
        let mut hasher = Hasher::new();

        let mut sorted: Vec<&Column> = self.columns.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        for col in sorted {
            hasher.update(col.name.as_bytes());
            hasher.update(b"|");
            hasher.update(col.column_type.as_str().as_bytes());
            hasher.update(b"|");
            hasher.update(if col.not_null { b"1" } else { b"0" });
            hasher.update(if col.auto_increment { b"1" } else { b"0" });
            hasher.update(b"||");
        }

        hasher.update(b"pk:");
        for key in self.key_column_names() {
            hasher.update(key.as_bytes());
            hasher.update(b"|");
        }

        hasher.finalize().to_hex().to_string()
    }
}
