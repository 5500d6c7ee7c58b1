use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::{automock, predicate::*};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact not found: {0}")]
    NotFound(String),
}

/// Type alias for async reader
pub type ArtifactReader = Pin<Box<dyn AsyncRead + Send>>;

/// A file found under the cache root by [`ArtifactStore::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub modified_at: DateTime<Utc>,
    /// In-flight export that was never committed.
    pub is_temp: bool,
}

/// Port for on-disk artifact operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Create `dir` and any missing parents. Idempotent.
    async fn ensure_dir(&self, dir: &Path) -> Result<(), StorageError>;

    /// Last modification time, or `None` if nothing exists at `path`.
    async fn modified_at(&self, path: &Path) -> Result<Option<DateTime<Utc>>, StorageError>;

    /// Open an artifact for streaming; returns the reader and its length.
    async fn open(&self, path: &Path) -> Result<(ArtifactReader, u64), StorageError>;

    /// Atomically move a finished export into place, replacing any previous artifact.
    async fn commit(&self, temp_path: &Path, target: &Path) -> Result<(), StorageError>;

    /// Delete an artifact
    async fn remove(&self, path: &Path) -> Result<(), StorageError>;

    /// List every file under the cache root
    async fn scan(&self) -> Result<Vec<StoredFile>, StorageError>;
}
