use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::BufReader;
use tracing::{debug, warn};

use crate::application::ports::{ArtifactReader, ArtifactStore, StorageError, StoredFile};

/// Local filesystem artifact store rooted at the cache directory.
pub struct LocalArtifactStore {
    root: PathBuf,
    durable_writes: bool,
}

impl LocalArtifactStore {
    pub fn new(root: PathBuf) -> Self {
        Self::with_durability(root, false)
    }

    /// With `durable_writes`, the parent directory is fsynced after each commit.
    pub fn with_durability(root: PathBuf, durable_writes: bool) -> Self {
        Self {
            root,
            durable_writes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the cache root
    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn map_not_found(path: &Path, e: std::io::Error) -> StorageError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.display().to_string())
        } else {
            StorageError::Io(e)
        }
    }

    fn is_temp_name(path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('.') && name.ends_with(".tmp"))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn ensure_dir(&self, dir: &Path) -> Result<(), StorageError> {
        // create_dir_all tolerates concurrent creators
        fs::create_dir_all(dir).await?;
        Ok(())
    }

    async fn modified_at(&self, path: &Path) -> Result<Option<DateTime<Utc>>, StorageError> {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(Some(metadata.modified()?.into())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn open(&self, path: &Path) -> Result<(ArtifactReader, u64), StorageError> {
        let file = File::open(path)
            .await
            .map_err(|e| Self::map_not_found(path, e))?;
        let size_bytes = file.metadata().await?.len();

        Ok((Box::pin(BufReader::new(file)), size_bytes))
    }

    async fn commit(&self, temp_path: &Path, target: &Path) -> Result<(), StorageError> {
        debug!("Moving artifact to final location: {:?}", target);
        // rename replaces an existing artifact atomically
        fs::rename(temp_path, target)
            .await
            .map_err(|e| Self::map_not_found(temp_path, e))?;

        if self.durable_writes {
            if let Some(parent) = target.parent() {
                match File::open(parent).await {
                    Ok(parent_file) => {
                        if let Err(e) = parent_file.sync_all().await {
                            warn!("Failed to sync parent directory after rename: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to open parent directory for sync: {}", e),
                }
            }
        }

        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        fs::remove_file(path)
            .await
            .map_err(|e| Self::map_not_found(path, e))
    }

    async fn scan(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                // Removed while walking
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = match entry.metadata().await {
                    Ok(metadata) => metadata,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => return Err(StorageError::Io(e)),
                };

                if metadata.is_dir() {
                    pending.push(path);
                } else if metadata.is_file() {
                    files.push(StoredFile {
                        is_temp: Self::is_temp_name(&path),
                        modified_at: metadata.modified()?.into(),
                        path,
                    });
                }
            }
        }

        Ok(files)
    }
}
