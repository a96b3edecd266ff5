//! Datasource connectors
//!
//! Every store is reached through the [`Datasource`] capability set. The
//! diff engine never sees a concrete connector; commands open one through a
//! [`Session`], which closes it again on every exit path.

pub mod csv;
pub mod mock;
pub mod sql;

use crate::config::DatasourceConfig;
use crate::error::{Result, TabreconError};
use crate::row::{Row, RowSet};
use crate::schema::Schema;
use std::ops::{Deref, DerefMut};

pub use self::csv::CsvDatasource;
pub use self::mock::MockDatasource;
pub use self::sql::SqlDatasource;

/// Read and write access to one tabular store
pub trait Datasource: Send {
    /// Short connector name used in messages
    fn kind(&self) -> &'static str;

    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn get_all_schemas(&mut self) -> Result<Vec<Schema>>;

    fn get_schema(&mut self, name: &str) -> Result<Schema>;

    fn set_schema(&mut self, schema: &Schema) -> Result<()>;

    fn get_rows(&mut self, schema: &Schema) -> Result<RowSet>;

    fn set_rows(&mut self, schema: &Schema, rows: &[Row]) -> Result<()>;
}

/// An open datasource; closed when dropped
pub struct Session<'a> {
    datasource: &'a mut dyn Datasource,
}

impl<'a> Session<'a> {
    pub fn open(datasource: &'a mut dyn Datasource) -> Result<Self> {
        datasource.open()?;
        log::debug!("Opened {} datasource", datasource.kind());
        Ok(Self { datasource })
    }

    /// Pick a schema by name, or the only one the source has
    pub fn resolve_schema(&mut self, name: Option<&str>) -> Result<Schema> {
        if let Some(name) = name {
            return self.datasource.get_schema(name);
        }

        let mut schemas = self.datasource.get_all_schemas()?;
        match schemas.len() {
            1 => Ok(schemas.remove(0)),
            0 => Err(TabreconError::invalid_input(format!(
                "{} datasource has no schemas",
                self.datasource.kind()
            ))),
            _ => {
                let mut names: Vec<&str> = schemas.iter().map(|s| s.name()).collect();
                names.sort();
                Err(TabreconError::invalid_input(format!(
                    "{} datasource has several schemas, pick one with --table: {}",
                    self.datasource.kind(),
                    names.join(", ")
                )))
            }
        }
    }
}

impl<'a> Deref for Session<'a> {
    type Target = dyn Datasource + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.datasource
    }
}

impl<'a> DerefMut for Session<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.datasource
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.datasource.close() {
            log::warn!("Failed to close {} datasource: {}", self.datasource.kind(), e);
        }
    }
}

/// Build the connector a config describes; nothing is opened yet
pub fn from_config(config: &DatasourceConfig) -> Box<dyn Datasource> {
    match config {
        DatasourceConfig::Csv(csv) => Box::new(CsvDatasource::new(csv.clone())),
        DatasourceConfig::Sql(sql) => Box::new(SqlDatasource::new(sql.clone())),
        DatasourceConfig::Mock(mock) => Box::new(MockDatasource::new(mock.rows)),
    }
}
