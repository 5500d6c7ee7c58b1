//! Artifact removal: eviction when a source view disappears, one-shot
//! deletion after serving, and the periodic sweeper.

mod sweeper;

pub use sweeper::{ArtifactSweeper, SweepResult};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::ports::{ArtifactStore, StorageError};

/// Deletes artifacts. Failures are logged and never surface to the caller.
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn ArtifactStore>,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Remove the artifact of a view that no longer exists.
    pub async fn evict_if_missing_source(&self, target: &Path) {
        match self.store.remove(target).await {
            Ok(()) => info!(path = %target.display(), "Removed cached artifact of missing view"),
            Err(StorageError::NotFound(_)) => {}
            Err(e) => warn!(path = %target.display(), error = %e, "Failed to evict artifact"),
        }
    }

    /// Remove an artifact after it has been streamed.
    pub async fn delete_after_serve(&self, path: &Path) {
        remove_quietly(self.store.as_ref(), path).await;
    }

    /// Guard that runs [`Self::delete_after_serve`] when dropped, so the
    /// artifact goes away whether streaming finished, failed or was abandoned.
    pub fn serve_guard(&self, path: PathBuf) -> ServeGuard {
        ServeGuard {
            store: Arc::clone(&self.store),
            path: Some(path),
        }
    }
}

async fn remove_quietly(store: &dyn ArtifactStore, path: &Path) {
    match store.remove(path).await {
        Ok(()) => debug!(path = %path.display(), "Deleted served artifact"),
        Err(StorageError::NotFound(_)) => {
            debug!(path = %path.display(), "Served artifact already gone")
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete served artifact"),
    }
}

pub struct ServeGuard {
    store: Arc<dyn ArtifactStore>,
    path: Option<PathBuf>,
}

impl ServeGuard {
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for ServeGuard {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = Arc::clone(&self.store);
                handle.spawn(async move {
                    remove_quietly(store.as_ref(), &path).await;
                });
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_file(&path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %e, "Failed to delete served artifact");
                    }
                }
            }
        }
    }
}
