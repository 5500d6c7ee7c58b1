#[cfg(test)]
use mockall::{automock, predicate::*};
use std::path::Path;
use thiserror::Error;

use crate::domain::value_objects::{ConnectionDescriptor, ViewRef};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Catalog lookup failed: {0}")]
    Catalog(String),

    #[error("Export failed: {0}")]
    Export(String),
}

/// Port for the analytical query engine.
///
/// Engines are synchronous; callers run them on a blocking thread.
#[cfg_attr(test, automock)]
pub trait QueryEngine: Send + Sync {
    /// Open a session scoped to a single materialization.
    /// The connection is closed when the returned session is dropped.
    fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn EngineSession>, EngineError>;
}

/// A single open engine connection.
#[cfg_attr(test, automock)]
pub trait EngineSession: Send {
    /// Look the view up in the engine catalog using bound parameters.
    fn view_exists(&self, view: &ViewRef) -> Result<bool, EngineError>;

    /// Export the full contents of `view` to `destination` as CSV with a header row.
    fn export_csv(&self, view: &ViewRef, destination: &Path) -> Result<(), EngineError>;
}
