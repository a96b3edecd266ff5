//! Row comparison
//!
//! Two strategies, picked by whether a schema with a primary key governs the
//! comparison:
//!
//! - **Keyed**: rows are indexed by their canonical composite key, matched
//!   across sides, and classified as added, deleted or modified. Duplicate
//!   keys on either side abort the comparison.
//! - **Unkeyed**: rows are compared as a multiset of their full normalized
//!   content. Excess copies are added or deleted; there is no modified
//!   bucket, so a changed row shows up as one delete plus one add.
//!
//! Cells that fail to normalize are treated as unknown and always count as a
//! difference. Output is ordered by canonical key (or canonical row content
//! in unkeyed mode) so repeated runs are identical.

use crate::error::{Result, Side, TabreconError};
use crate::row::{Row, RowSet};
use crate::schema::{Column, Schema};
use crate::value::{equal, normalize, normalize_as, CanonicalValue, GenericValue, RawValue};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

const KEY_SEPARATOR: char = '|';
const NULL_COMPONENT: &str = "\\N";

/// Canonical composite key: escaped component texts joined by `|`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RowKey(String);

impl RowKey {
    fn from_components<'a, I>(components: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut key = String::new();
        for (i, component) in components.into_iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            match component {
                Some(text) => push_escaped(&mut key, text),
                None => key.push_str(NULL_COMPONENT),
            }
        }
        RowKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '\\' || ch == KEY_SEPARATOR {
            out.push('\\');
        }
        out.push(ch);
    }
}

/// Before and after values of one changed cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueChange {
    pub before: GenericValue,
    pub after: GenericValue,
}

/// The changed columns of one matched row pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDelta {
    pub key: RowKey,
    pub changes: IndexMap<String, ValueChange>,
}

/// Result of a row comparison; immutable once built
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    added: RowSet,
    deleted: RowSet,
    modified: Vec<RowDelta>,
}

impl Diff {
    pub fn added(&self) -> &[Row] {
        &self.added
    }

    pub fn deleted(&self) -> &[Row] {
        &self.deleted
    }

    pub fn modified(&self) -> &[RowDelta] {
        &self.modified
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.deleted.len() + self.modified.len()
    }
}

/// Compare two row sets.
///
/// A schema with a primary key selects keyed mode and is authoritative for
/// which columns take part and how they are typed. Without a key the rows are
/// compared as multisets, restricted to the schema's columns when one is
/// given.
pub fn diff_rows(left: &[Row], right: &[Row], schema: Option<&Schema>) -> Result<Diff> {
    let diff = match schema {
        Some(schema) if schema.primary_key().is_some() => diff_keyed(left, right, schema)?,
        other => diff_unkeyed(left, right, other)?,
    };

    log::debug!(
        "Row diff: {} added, {} deleted, {} modified ({} left rows, {} right rows)",
        diff.added.len(),
        diff.deleted.len(),
        diff.modified.len(),
        left.len(),
        right.len()
    );

    Ok(diff)
}

/// A normalized cell, or `None` when the raw value could not be converted
type Cell = Option<CanonicalValue>;

fn cell_as(value: &GenericValue, column: &Column) -> Result<Cell> {
    match normalize_as(value.raw(), column) {
        Ok(canonical) => Ok(Some(canonical)),
        Err(e) if e.is_value_conversion() => {
            log::warn!("Treating cell as different: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn cell(value: &GenericValue) -> Result<Cell> {
    match normalize(value) {
        Ok(canonical) => Ok(Some(canonical)),
        Err(e) if e.is_value_conversion() => {
            log::warn!("Treating cell as different: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn raw_text(raw: &RawValue) -> Option<String> {
    match raw {
        RawValue::Null => None,
        other => Some(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Keyed mode
// ---------------------------------------------------------------------------

enum KeyOutcome {
    Known(RowKey),
    /// A key cell failed to normalize; the row never matches anything
    Unknown(RowKey),
}

struct KeyedIndex<'a> {
    rows: BTreeMap<RowKey, &'a Row>,
    unmatched: Vec<(RowKey, &'a Row)>,
}

fn diff_keyed(left: &[Row], right: &[Row], schema: &Schema) -> Result<Diff> {
    let key_columns = key_columns(schema)?;
    let left_index = index_rows(left, &key_columns, Side::Left)?;
    let right_index = index_rows(right, &key_columns, Side::Right)?;

    let mut added: Vec<(RowKey, &Row)> = Vec::new();
    let mut deleted: Vec<(RowKey, &Row)> = Vec::new();
    let mut modified = Vec::new();

    for (key, row) in &right_index.rows {
        if !left_index.rows.contains_key(key) {
            added.push((key.clone(), *row));
        }
    }

    for (key, left_row) in &left_index.rows {
        match right_index.rows.get(key) {
            None => deleted.push((key.clone(), *left_row)),
            Some(right_row) => {
                if let Some(delta) = compare_matched(key, left_row, right_row, schema)? {
                    modified.push(delta);
                }
            }
        }
    }

    added.extend(right_index.unmatched);
    deleted.extend(left_index.unmatched);

    Ok(Diff {
        added: into_sorted_rows(added),
        deleted: into_sorted_rows(deleted),
        modified,
    })
}

fn key_columns(schema: &Schema) -> Result<Vec<&Column>> {
    schema
        .key_column_names()
        .iter()
        .map(|name| {
            schema.column(name).ok_or_else(|| {
                TabreconError::invalid_schema(format!("key column '{}' is not in schema", name))
            })
        })
        .collect()
}

fn index_rows<'a>(rows: &'a [Row], key_columns: &[&Column], side: Side) -> Result<KeyedIndex<'a>> {
    let mut index = KeyedIndex {
        rows: BTreeMap::new(),
        unmatched: Vec::new(),
    };

    for row in rows {
        match composite_key(row, key_columns, side)? {
            KeyOutcome::Known(key) => match index.rows.entry(key) {
                Entry::Occupied(existing) => {
                    return Err(TabreconError::duplicate_key(existing.key().as_str(), side));
                }
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
            },
            KeyOutcome::Unknown(key) => index.unmatched.push((key, row)),
        }
    }

    Ok(index)
}

fn composite_key(row: &Row, key_columns: &[&Column], side: Side) -> Result<KeyOutcome> {
    let mut texts = Vec::with_capacity(key_columns.len());
    let mut degraded = false;

    for column in key_columns {
        let value = row
            .get(&column.name)
            .ok_or_else(|| TabreconError::schema_mismatch(&column.name, side))?;
        match cell_as(value, column)? {
            Some(canonical) => texts.push(canonical.to_text()),
            None => {
                degraded = true;
                texts.push(raw_text(value.raw()));
            }
        }
    }

    let key = RowKey::from_components(texts.iter().map(Option::as_deref));
    Ok(if degraded {
        KeyOutcome::Unknown(key)
    } else {
        KeyOutcome::Known(key)
    })
}

fn compare_matched(key: &RowKey, left: &Row, right: &Row, schema: &Schema) -> Result<Option<RowDelta>> {
    let mut changes = IndexMap::new();

    for column in schema.columns() {
        if schema.is_key_column(&column.name) {
            continue;
        }

        let before = left
            .get(&column.name)
            .ok_or_else(|| TabreconError::schema_mismatch(&column.name, Side::Left))?;
        let after = right
            .get(&column.name)
            .ok_or_else(|| TabreconError::schema_mismatch(&column.name, Side::Right))?;

        let same = match (cell_as(before, column)?, cell_as(after, column)?) {
            (Some(a), Some(b)) => equal(&a, &b),
            _ => false,
        };

        if !same {
            changes.insert(
                column.name.clone(),
                ValueChange {
                    before: before.clone(),
                    after: after.clone(),
                },
            );
        }
    }

    Ok((!changes.is_empty()).then(|| RowDelta {
        key: key.clone(),
        changes,
    }))
}

// ---------------------------------------------------------------------------
// Unkeyed mode
// ---------------------------------------------------------------------------

enum Identity {
    Known(String),
    /// Some cell failed to normalize; carries a sort key built from raw text
    Unknown(String),
}

#[derive(Default)]
struct Tally<'a> {
    left: Vec<&'a Row>,
    right: Vec<&'a Row>,
}

fn diff_unkeyed(left: &[Row], right: &[Row], schema: Option<&Schema>) -> Result<Diff> {
    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    let mut added: Vec<(String, &Row)> = Vec::new();
    let mut deleted: Vec<(String, &Row)> = Vec::new();

    for row in left {
        match row_identity(row, schema, Side::Left)? {
            Identity::Known(id) => tallies.entry(id).or_default().left.push(row),
            Identity::Unknown(sort_key) => deleted.push((sort_key, row)),
        }
    }
    for row in right {
        match row_identity(row, schema, Side::Right)? {
            Identity::Known(id) => tallies.entry(id).or_default().right.push(row),
            Identity::Unknown(sort_key) => added.push((sort_key, row)),
        }
    }

    for (id, tally) in &tallies {
        let (left_count, right_count) = (tally.left.len(), tally.right.len());
        if right_count > left_count {
            added.extend(tally.right[left_count..].iter().map(|row| (id.clone(), *row)));
        } else if left_count > right_count {
            deleted.extend(tally.left[right_count..].iter().map(|row| (id.clone(), *row)));
        }
    }

    Ok(Diff {
        added: into_sorted_rows(added),
        deleted: into_sorted_rows(deleted),
        modified: Vec::new(),
    })
}

/// Full-content identity over columns in name order.
///
/// Each component carries its canonical kind so that, for example, the
/// string "1" and the integer 1 never collide.
fn row_identity(row: &Row, schema: Option<&Schema>, side: Side) -> Result<Identity> {
    let mut entries: Vec<(&str, Cell, &GenericValue)> = Vec::new();

    match schema {
        Some(schema) => {
            for column in schema.columns() {
                let value = row
                    .get(&column.name)
                    .ok_or_else(|| TabreconError::schema_mismatch(&column.name, side))?;
                entries.push((column.name.as_str(), cell_as(value, column)?, value));
            }
        }
        None => {
            for value in row.values() {
                entries.push((value.column_name(), cell(value)?, value));
            }
        }
    }

    entries.sort_by(|a, b| a.0.cmp(b.0));

    let mut identity = String::new();
    let mut degraded = false;
    for (i, (name, canonical, value)) in entries.iter().enumerate() {
        if i > 0 {
            identity.push(KEY_SEPARATOR);
        }
        push_escaped(&mut identity, name);
        identity.push('=');
        match canonical {
            Some(canonical) => {
                identity.push_str(canonical.kind().as_str());
                identity.push(':');
                match canonical.to_text() {
                    Some(text) => push_escaped(&mut identity, &text),
                    None => identity.push_str(NULL_COMPONENT),
                }
            }
            None => {
                degraded = true;
                identity.push_str("?:");
                push_escaped(&mut identity, &value.raw().to_string());
            }
        }
    }

    Ok(if degraded {
        Identity::Unknown(identity)
    } else {
        Identity::Known(identity)
    })
}

fn into_sorted_rows<K: Ord>(mut rows: Vec<(K, &Row)>) -> RowSet {
    // Stable: rows sharing a key keep their source order
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows.into_iter().map(|(_, row)| row.clone()).collect()
}
