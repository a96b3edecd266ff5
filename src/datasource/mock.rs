//! Synthetic datasource with a fixed users-like schema

use super::Datasource;
use crate::error::{Result, TabreconError};
use crate::row::{Row, RowSet};
use crate::schema::{Column, PrimaryKey, Schema};
use crate::value::{ColumnType, GenericValue, RawValue};
use std::sync::Arc;

pub const MOCK_SCHEMA_NAME: &str = "mock";

/// Generates `row_count` rows keyed on `id`
#[derive(Debug, Clone)]
pub struct MockDatasource {
    row_count: usize,
    open: bool,
}

impl MockDatasource {
    pub fn new(row_count: usize) -> Self {
        Self {
            row_count,
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn schema() -> Result<Schema> {
        Schema::new(
            MOCK_SCHEMA_NAME,
            vec![
                Column::new("id", ColumnType::Int).not_null(),
                Column::new("name", ColumnType::String).at_position(1),
                Column::new("age", ColumnType::Int).at_position(2),
                Column::new("birthday", ColumnType::String).at_position(3),
            ],
            Some(PrimaryKey::new(["id"])?),
        )
    }
}

impl Datasource for MockDatasource {
    fn kind(&self) -> &'static str {
        "mock"
    }

    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn get_all_schemas(&mut self) -> Result<Vec<Schema>> {
        Ok(vec![Self::schema()?])
    }

    fn get_schema(&mut self, name: &str) -> Result<Schema> {
        if name == MOCK_SCHEMA_NAME {
            Self::schema()
        } else {
            Err(TabreconError::schema_not_found(name))
        }
    }

    fn set_schema(&mut self, _schema: &Schema) -> Result<()> {
        Err(TabreconError::unsupported_operation(self.kind(), "set_schema"))
    }

    /// Values depend only on the row index and column name
    fn get_rows(&mut self, schema: &Schema) -> Result<RowSet> {
        let columns: Vec<Arc<Column>> = schema.columns().iter().cloned().map(Arc::new).collect();

        let rows = (0..self.row_count)
            .map(|i| {
                columns
                    .iter()
                    .map(|column| {
                        let raw = match column.name.as_str() {
                            "id" | "age" => RawValue::from(i as i64),
                            "name" => RawValue::from(format!("{}{}", column.name, i)),
                            "birthday" => RawValue::from("2018-05-28 14:31:00"),
                            _ => RawValue::Null,
                        };
                        GenericValue::new(column.clone(), raw)
                    })
                    .collect::<Row>()
            })
            .collect();

        Ok(rows)
    }

    fn set_rows(&mut self, _schema: &Schema, _rows: &[Row]) -> Result<()> {
        Err(TabreconError::unsupported_operation(self.kind(), "set_rows"))
    }
}
