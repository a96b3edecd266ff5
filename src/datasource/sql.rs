//! Relational connector
//!
//! DuckDB files are opened directly; SQLite, MySQL and PostgreSQL databases
//! are attached read-only through DuckDB's scanner extensions. Schemas are
//! introspected from `information_schema` and `duckdb_constraints()`, rows are
//! read as typed native values.

use super::Datasource;
use crate::config::SqlConfig;
use crate::error::{Result, TabreconError};
use crate::row::{Row, RowSet};
use crate::schema::{Column, PrimaryKey, Schema};
use crate::value::{ColumnType, GenericValue, RawValue};
use chrono::{DateTime, NaiveDate};
use duckdb::types::{TimeUnit, Value, ValueRef};
use duckdb::{params, Connection};
use std::sync::Arc;

const ATTACHED_CATALOG: &str = "source_db";

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct SqlDatasource {
    config: SqlConfig,
    connection: Option<Connection>,
    catalog: String,
}

impl SqlDatasource {
    pub fn new(config: SqlConfig) -> Self {
        Self {
            config,
            connection: None,
            catalog: String::new(),
        }
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| TabreconError::invalid_input("SQL datasource is not open"))
    }

    /// Schema (namespace) the tables live in
    fn namespace(&self) -> Result<String> {
        if let Some(name) = &self.config.database_name {
            return Ok(name.clone());
        }
        match self.config.driver_name.as_str() {
            "duckdb" | "sqlite" => Ok("main".to_string()),
            "postgres" => Ok("public".to_string()),
            other => Err(TabreconError::config(format!(
                "database_name is required for the {} driver",
                other
            ))),
        }
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let namespace = self.namespace()?;
        let mut stmt = conn.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_catalog = ? AND table_schema = ? ORDER BY table_name",
        )?;
        let names = stmt
            .query_map(params![self.catalog, namespace], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn introspect(&self, table: &str) -> Result<Schema> {
        let conn = self.connection()?;
        let namespace = self.namespace()?;

        let mut stmt = conn.prepare(
            "SELECT column_name, data_type, CAST(ordinal_position AS BIGINT), is_nullable, column_default \
             FROM information_schema.columns \
             WHERE table_catalog = ? AND table_schema = ? AND table_name = ? \
             ORDER BY ordinal_position",
        )?;
        let described = stmt
            .query_map(params![self.catalog, namespace, table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if described.is_empty() {
            return Err(TabreconError::schema_not_found(table));
        }

        let mut columns = Vec::with_capacity(described.len());
        for (name, data_type, position, is_nullable, default) in described {
            let column_type = column_type_for(&data_type).ok_or_else(|| {
                TabreconError::unsupported_conversion(&name, ColumnType::Null, data_type.clone())
            })?;
            let mut column = Column::new(name, column_type)
                .at_position(usize::try_from(position - 1).unwrap_or(0));
            if is_nullable.eq_ignore_ascii_case("NO") {
                column = column.not_null();
            }
            if default.map_or(false, |d| d.contains("nextval(")) {
                column = column.auto_increment();
            }
            columns.push(column);
        }

        let key = self.primary_key(&namespace, table)?;
        Schema::new(table, columns, key)
    }

    fn primary_key(&self, namespace: &str, table: &str) -> Result<Option<PrimaryKey>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT constraint_column_names FROM duckdb_constraints() \
             WHERE database_name = ? AND schema_name = ? AND table_name = ? \
             AND constraint_type = 'PRIMARY KEY'",
        )?;
        let mut rows = stmt.query(params![self.catalog, namespace, table])?;

        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let names: Vec<String> = match row.get::<_, Value>(0)? {
            Value::List(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Text(name) => Some(name),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        if names.is_empty() {
            Ok(None)
        } else {
            PrimaryKey::new(names).map(Some)
        }
    }
}

impl Datasource for SqlDatasource {
    fn kind(&self) -> &'static str {
        "sql"
    }

    fn open(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let driver = self.config.driver_name.as_str();
        let conn = match driver {
            "duckdb" if self.config.dsn == ":memory:" => Connection::open_in_memory()?,
            "duckdb" => Connection::open(&self.config.dsn)?,
            "sqlite" | "mysql" | "postgres" => {
                let conn = Connection::open_in_memory()?;
                let attach = format!(
                    "ATTACH '{}' AS {} (TYPE {}, READ_ONLY)",
                    self.config.dsn.replace('\'', "''"),
                    ATTACHED_CATALOG,
                    driver
                );
                conn.execute_batch(&attach)?;
                conn
            }
            other => {
                return Err(TabreconError::config(format!(
                    "Unsupported SQL driver '{}'. Use duckdb, sqlite, mysql or postgres",
                    other
                )))
            }
        };

        self.catalog = if driver == "duckdb" {
            conn.query_row("SELECT current_database()", [], |row| row.get::<_, String>(0))?
        } else {
            ATTACHED_CATALOG.to_string()
        };
        log::debug!("Connected to {} database, catalog '{}'", driver, self.catalog);

        self.connection = Some(conn);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.connection.take() {
            conn.close().map_err(|(_, e)| TabreconError::DuckDb(e))?;
        }
        Ok(())
    }

    fn get_all_schemas(&mut self) -> Result<Vec<Schema>> {
        self.table_names()?
            .iter()
            .map(|table| self.introspect(table))
            .collect()
    }

    fn get_schema(&mut self, name: &str) -> Result<Schema> {
        self.introspect(name)
    }

    fn set_schema(&mut self, _schema: &Schema) -> Result<()> {
        Err(TabreconError::unsupported_operation(self.kind(), "set_schema"))
    }

    fn get_rows(&mut self, schema: &Schema) -> Result<RowSet> {
        let conn = self.connection()?;
        let columns: Vec<Arc<Column>> = schema.columns().iter().cloned().map(Arc::new).collect();
        let select_list = columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM {}.{}.{}",
            select_list,
            quote_identifier(&self.catalog),
            quote_identifier(&self.namespace()?),
            quote_identifier(schema.name())
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    cells.push(raw_value(row.get_ref(i)?));
                }
                Ok(cells)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let result: RowSet = rows
            .into_iter()
            .map(|cells| {
                columns
                    .iter()
                    .zip(cells)
                    .map(|(column, raw)| GenericValue::new(column.clone(), raw))
                    .collect::<Row>()
            })
            .collect();

        log::debug!("Read {} rows from table '{}'", result.len(), schema.name());
        Ok(result)
    }

    fn set_rows(&mut self, _schema: &Schema, _rows: &[Row]) -> Result<()> {
        Err(TabreconError::unsupported_operation(self.kind(), "set_rows"))
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Declared SQL type name to column type; `None` when there is no mapping
fn column_type_for(data_type: &str) -> Option<ColumnType> {
    let upper = data_type.trim().to_uppercase();
    let ty = upper.as_str();

    let column_type = if ty == "BOOLEAN" || ty == "BOOL" {
        ColumnType::Bool
    } else if ty.ends_with("INT")
        || ty.ends_with("INTEGER")
        || ty == "TINYINT"
        || ty == "SMALLINT"
        || ty == "BIGINT"
        || ty == "HUGEINT"
    {
        ColumnType::Int
    } else if ty.starts_with("DECIMAL")
        || ty.starts_with("NUMERIC")
        || ty == "FLOAT"
        || ty == "REAL"
        || ty == "DOUBLE"
    {
        ColumnType::Float
    } else if ty.starts_with("VARCHAR")
        || ty.starts_with("CHAR")
        || ty == "TEXT"
        || ty == "STRING"
        || ty == "JSON"
    {
        ColumnType::String
    } else if ty == "DATE" {
        ColumnType::Date
    } else if ty.starts_with("TIMESTAMP") || ty == "DATETIME" {
        ColumnType::Datetime
    } else if ty == "BLOB" || ty == "BYTEA" {
        ColumnType::Bytes
    } else {
        return None;
    };

    Some(column_type)
}

fn raw_value(value: ValueRef<'_>) -> RawValue {
    match value {
        ValueRef::Null => RawValue::Null,
        ValueRef::Boolean(b) => RawValue::Bool(b),
        ValueRef::TinyInt(i) => RawValue::from(i),
        ValueRef::SmallInt(i) => RawValue::from(i),
        ValueRef::Int(i) => RawValue::from(i),
        ValueRef::BigInt(i) => RawValue::from(i),
        ValueRef::HugeInt(i) => match i64::try_from(i) {
            Ok(i) => RawValue::Int(i),
            Err(_) => RawValue::Text(i.to_string()),
        },
        ValueRef::UTinyInt(u) => RawValue::from(u),
        ValueRef::USmallInt(u) => RawValue::from(u),
        ValueRef::UInt(u) => RawValue::from(u),
        ValueRef::UBigInt(u) => RawValue::UInt(u),
        ValueRef::Float(f) => RawValue::from(f),
        ValueRef::Double(f) => RawValue::Float(f),
        ValueRef::Decimal(d) => match d.to_string().parse::<f64>() {
            Ok(f) => RawValue::Float(f),
            Err(_) => RawValue::Text(d.to_string()),
        },
        ValueRef::Text(s) => RawValue::Text(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => RawValue::Bytes(b.to_vec()),
        ValueRef::Date32(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map_or_else(|| RawValue::Unsupported("DATE".to_string()), RawValue::Date),
        ValueRef::Timestamp(unit, ts) => {
            let micros = match unit {
                TimeUnit::Second => ts.checked_mul(1_000_000),
                TimeUnit::Millisecond => ts.checked_mul(1_000),
                TimeUnit::Microsecond => Some(ts),
                TimeUnit::Nanosecond => Some(ts / 1_000),
            };
            micros
                .and_then(DateTime::from_timestamp_micros)
                .map_or_else(
                    || RawValue::Unsupported("TIMESTAMP".to_string()),
                    |dt| RawValue::Datetime(dt.naive_utc()),
                )
        }
        ValueRef::Time64(..) => RawValue::Unsupported("TIME".to_string()),
        ValueRef::Interval { .. } => RawValue::Unsupported("INTERVAL".to_string()),
        _ => RawValue::Unsupported("nested".to_string()),
    }
}
