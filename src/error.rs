//! Error types for tabrecon operations

use crate::value::ColumnType;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TabreconError>;

/// Which of the two compared sources an error or value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

#[derive(Error, Debug)]
pub enum TabreconError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Cannot convert {raw:?} to {column_type} for column '{column}'")]
    ValueConversion {
        column: String,
        column_type: ColumnType,
        raw: String,
    },

    #[error("No conversion from {source_kind} to {column_type} for column '{column}'")]
    UnsupportedConversion {
        column: String,
        column_type: ColumnType,
        source_kind: String,
    },

    #[error("Duplicate primary key '{key}' on {side} side")]
    DuplicateKey { key: String, side: Side },

    #[error("Column '{column}' is missing from a {side} row")]
    SchemaMismatch { column: String, side: Side },

    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },

    #[error("{datasource} datasource does not support {operation}")]
    UnsupportedOperation {
        datasource: String,
        operation: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl TabreconError {
    pub fn value_conversion(
        column: impl Into<String>,
        column_type: ColumnType,
        raw: impl Into<String>,
    ) -> Self {
        Self::ValueConversion {
            column: column.into(),
            column_type,
            raw: raw.into(),
        }
    }

    pub fn unsupported_conversion(
        column: impl Into<String>,
        column_type: ColumnType,
        source_kind: impl Into<String>,
    ) -> Self {
        Self::UnsupportedConversion {
            column: column.into(),
            column_type,
            source_kind: source_kind.into(),
        }
    }

    pub fn duplicate_key(key: impl Into<String>, side: Side) -> Self {
        Self::DuplicateKey {
            key: key.into(),
            side,
        }
    }

    pub fn schema_mismatch(column: impl Into<String>, side: Side) -> Self {
        Self::SchemaMismatch {
            column: column.into(),
            side,
        }
    }

    pub fn invalid_schema(msg: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: msg.into(),
        }
    }

    pub fn schema_not_found(name: impl Into<String>) -> Self {
        Self::SchemaNotFound { name: name.into() }
    }

    pub fn unsupported_operation(
        datasource: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::UnsupportedOperation {
            datasource: datasource.into(),
            operation: operation.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    /// True for per-cell failures that the row differ degrades to "different"
    pub fn is_value_conversion(&self) -> bool {
        matches!(self, Self::ValueConversion { .. })
    }
}
