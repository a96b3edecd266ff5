//! Rows as column name to cell mappings

use crate::value::GenericValue;
use indexmap::IndexMap;
use serde::Serialize;

/// One row: column name to cell. Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    values: IndexMap<String, GenericValue>,
}

/// Rows in the order a connector returned them; duplicates allowed
pub type RowSet = Vec<Row>;

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell under its column's name, returning any cell it replaced
    pub fn insert(&mut self, value: GenericValue) -> Option<GenericValue> {
        self.values.insert(value.column_name().to_string(), value)
    }

    pub fn get(&self, column_name: &str) -> Option<&GenericValue> {
        self.values.get(column_name)
    }

    pub fn contains(&self, column_name: &str) -> bool {
        self.values.contains_key(column_name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &GenericValue> {
        self.values.values()
    }
}

impl FromIterator<GenericValue> for Row {
    fn from_iter<I: IntoIterator<Item = GenericValue>>(iter: I) -> Self {
        let mut row = Row::new();
        for value in iter {
            row.insert(value);
        }
        row
    }
}
