//! # tabrecon
//!
//! Reconciles tabular data held in different stores. Cells from any connector
//! are normalized into one typed value model, schemas are compared
//! structurally, and row sets are compared either by primary key or, when no
//! key is known, as multisets of whole rows.

pub mod cli;
pub mod commands;
pub mod config;
pub mod datasource;
pub mod error;
pub mod output;
pub mod progress;
pub mod row;
pub mod row_diff;
pub mod schema;
pub mod schema_diff;
pub mod value;

pub use datasource::{Datasource, Session};
pub use error::{Result, Side, TabreconError};
pub use row::{Row, RowSet};
pub use row_diff::{diff_rows, Diff, RowDelta, RowKey, ValueChange};
pub use schema::{Column, PrimaryKey, Schema};
pub use schema_diff::{diff_schemas, SchemaDelta};
pub use value::{equal, normalize, CanonicalValue, ColumnType, GenericValue, RawValue};
