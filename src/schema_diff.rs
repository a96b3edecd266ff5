//! Structural comparison of two schemas
//!
//! Columns are matched by name. Position changes alone are not differences;
//! type, nullability and auto-increment changes are. Primary key changes are
//! reported on their own since key order matters for composite keys.

use crate::schema::{Column, Schema};
use crate::value::ColumnType;
use serde::Serialize;
use std::collections::HashSet;

/// The attributes that make two same-named columns differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnAttributes {
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub not_null: bool,
    pub auto_increment: bool,
}

impl From<&Column> for ColumnAttributes {
    fn from(column: &Column) -> Self {
        Self {
            column_type: column.column_type,
            not_null: column.not_null,
            auto_increment: column.auto_increment,
        }
    }
}

/// A column present on both sides with differing attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnChange {
    pub name: String,
    pub before: ColumnAttributes,
    pub after: ColumnAttributes,
}

/// Primary key comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyChange {
    pub changed: bool,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// Result of comparing two schemas
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDelta {
    pub left_name: String,
    pub right_name: String,
    pub left_fingerprint: String,
    pub right_fingerprint: String,
    pub added_columns: Vec<Column>,
    pub removed_columns: Vec<Column>,
    pub changed_columns: Vec<ColumnChange>,
    pub primary_key: KeyChange,
}

impl SchemaDelta {
    /// Returns true if there are no structural differences
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.changed_columns.is_empty()
            && !self.primary_key.changed
    }

    /// Count of column-level changes plus one for a key change
    pub fn change_count(&self) -> usize {
        self.added_columns.len()
            + self.removed_columns.len()
            + self.changed_columns.len()
            + usize::from(self.primary_key.changed)
    }
}

/// Compare `left` (reference) against `right` (subject)
pub fn diff_schemas(left: &Schema, right: &Schema) -> SchemaDelta {
    let left_names: HashSet<&str> = left.columns().iter().map(|c| c.name.as_str()).collect();
    let right_names: HashSet<&str> = right.columns().iter().map(|c| c.name.as_str()).collect();

    let added_columns = right
        .columns()
        .iter()
        .filter(|col| !left_names.contains(col.name.as_str()))
        .cloned()
        .collect();

    let removed_columns = left
        .columns()
        .iter()
        .filter(|col| !right_names.contains(col.name.as_str()))
        .cloned()
        .collect();

    let changed_columns = left
        .columns()
        .iter()
        .filter_map(|before| {
            let after = right.column(&before.name)?;
            let before_attrs = ColumnAttributes::from(before);
            let after_attrs = ColumnAttributes::from(after);
            (before_attrs != after_attrs).then(|| ColumnChange {
                name: before.name.clone(),
                before: before_attrs,
                after: after_attrs,
            })
        })
        .collect();

    let before_key = left.key_column_names().to_vec();
    let after_key = right.key_column_names().to_vec();

    SchemaDelta {
        left_name: left.name().to_string(),
        right_name: right.name().to_string(),
        left_fingerprint: left.fingerprint(),
        right_fingerprint: right.fingerprint(),
        added_columns,
        removed_columns,
        changed_columns,
        primary_key: KeyChange {
            changed: before_key != after_key,
            before: before_key,
            after: after_key,
        },
    }
}
