//! Failure taxonomy of the materialization path.
//!
//! Every variant carries enough detail for the operational log. The HTTP
//! layer decides how much of it a client may see.

use thiserror::Error;

use crate::application::ports::{EngineError, StorageError};
use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum MaterializeError {
    /// A name failed the identifier grammar; the engine was never contacted.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] DomainError),

    /// The engine catalog has no such view.
    #[error("View not found: {0}")]
    ViewNotFound(String),

    /// Engine connection, export or commit failed.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Cache directory or artifact I/O failed outside generation.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<EngineError> for MaterializeError {
    fn from(err: EngineError) -> Self {
        MaterializeError::GenerationFailed(err.to_string())
    }
}
