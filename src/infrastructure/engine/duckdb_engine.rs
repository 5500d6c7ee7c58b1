use duckdb::{params, Connection};
use std::path::Path;
use tracing::debug;

use super::statements::Statements;
use crate::application::ports::{EngineError, EngineSession, QueryEngine};
use crate::domain::value_objects::{ConnectionDescriptor, ViewRef};

/// Query engine backed by DuckDB. Local database files and `md:` connection
/// strings are both handed to `Connection::open`.
#[derive(Debug, Default, Clone)]
pub struct DuckDbEngine;

impl DuckDbEngine {
    pub fn new() -> Self {
        Self
    }
}

impl QueryEngine for DuckDbEngine {
    fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn EngineSession>, EngineError> {
        // Never log the descriptor itself, it may carry a credential.
        debug!("Opening DuckDB connection");
        let connection = Connection::open(descriptor.expose()).map_err(|e| {
            EngineError::Connection(format!("Failed to open DuckDB database: {}", e))
        })?;

        Ok(Box::new(DuckDbSession { connection }))
    }
}

/// One request's connection. Dropping the session closes it.
pub struct DuckDbSession {
    connection: Connection,
}

impl EngineSession for DuckDbSession {
    fn view_exists(&self, view: &ViewRef) -> Result<bool, EngineError> {
        let catalog_error =
            |e: duckdb::Error| EngineError::Catalog(format!("Catalog lookup failed: {}", e));

        let mut statement = self
            .connection
            .prepare(Statements::VIEW_EXISTS)
            .map_err(catalog_error)?;
        let mut rows = statement
            .query(params![
                view.database().as_str(),
                view.schema().as_str(),
                view.view().as_str()
            ])
            .map_err(catalog_error)?;

        Ok(rows.next().map_err(catalog_error)?.is_some())
    }

    fn export_csv(&self, view: &ViewRef, destination: &Path) -> Result<(), EngineError> {
        let statement = Statements::export_csv(view, destination);
        self.connection
            .execute_batch(&statement)
            .map_err(|e| EngineError::Export(format!("Export failed: {}", e)))?;

        debug!(view = %view, "Export statement completed");
        Ok(())
    }
}
