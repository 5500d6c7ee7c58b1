use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::application::cache_key::ArtifactLocation;
use crate::application::errors::MaterializeError;
use crate::application::lifecycle::LifecycleManager;
use crate::application::policy::FreshnessPolicy;
use crate::application::ports::{ArtifactStore, EngineError, QueryEngine};
use crate::domain::value_objects::{ConnectionDescriptor, ViewRef};

enum ExportOutcome {
    Exported,
    ViewMissing,
}

/// Housekeeping around one export, taken from the cache policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Remove the artifact at the target when the view no longer exists.
    pub evict_on_missing: bool,
    /// Remove a committed artifact when the request that asked for it is gone.
    pub discard_if_abandoned: bool,
}

impl ExportOptions {
    pub fn for_policy(policy: &dyn FreshnessPolicy) -> Self {
        Self {
            evict_on_missing: policy.evicts_on_missing_source(),
            discard_if_abandoned: policy.deletes_after_serve(),
        }
    }
}

/// Exports a view to CSV at an artifact location.
///
/// The export goes to a temporary sibling first and is renamed into place
/// only on success, so a reader never sees a partial artifact. The work runs
/// on its own task: a request that is cancelled mid-export (timeout, client
/// gone) does not stop the commit or the cleanup of the temporary file.
pub struct ArtifactGenerator {
    engine: Arc<dyn QueryEngine>,
    store: Arc<dyn ArtifactStore>,
    lifecycle: LifecycleManager,
}

impl ArtifactGenerator {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        store: Arc<dyn ArtifactStore>,
        lifecycle: LifecycleManager,
    ) -> Self {
        Self {
            engine,
            store,
            lifecycle,
        }
    }

    pub async fn generate(
        &self,
        view: &ViewRef,
        descriptor: &ConnectionDescriptor,
        location: &ArtifactLocation,
        options: ExportOptions,
    ) -> Result<(), MaterializeError> {
        if let Err(e) = view.revalidate() {
            warn!(view = %view, "Refusing to export invalid identifiers");
            return Err(e.into());
        }

        let job = ExportJob {
            engine: Arc::clone(&self.engine),
            store: Arc::clone(&self.store),
            lifecycle: self.lifecycle.clone(),
            view: view.clone(),
            descriptor: descriptor.clone(),
            target: location.path(),
            temp_path: location.temp_path(),
            options,
        };

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = job.run().await;
            if let Err(unclaimed) = tx.send(result) {
                job.abandon(unclaimed.is_ok()).await;
            }
        });

        rx.await.map_err(|_| {
            MaterializeError::GenerationFailed("export task ended without a result".to_string())
        })?
    }
}

/// Everything one export needs, owned so it can outlive the request.
struct ExportJob {
    engine: Arc<dyn QueryEngine>,
    store: Arc<dyn ArtifactStore>,
    lifecycle: LifecycleManager,
    view: ViewRef,
    descriptor: ConnectionDescriptor,
    target: PathBuf,
    temp_path: PathBuf,
    options: ExportOptions,
}

impl ExportJob {
    async fn run(&self) -> Result<(), MaterializeError> {
        let view = &self.view;

        match self.export().await {
            Ok(ExportOutcome::Exported) => {}
            Ok(ExportOutcome::ViewMissing) => {
                warn!(view = %view, "View does not exist");
                self.discard(&self.temp_path).await;
                if self.options.evict_on_missing {
                    self.lifecycle.evict_if_missing_source(&self.target).await;
                }
                return Err(MaterializeError::ViewNotFound(view.to_string()));
            }
            Err(e) => {
                error!(view = %view, error = %e, "Failed to generate CSV");
                self.discard(&self.temp_path).await;
                return Err(e);
            }
        }

        if let Err(e) = self.store.commit(&self.temp_path, &self.target).await {
            error!(view = %view, error = %e, "Failed to move CSV into place");
            self.discard(&self.temp_path).await;
            return Err(MaterializeError::GenerationFailed(e.to_string()));
        }

        info!(view = %view, path = %self.target.display(), "CSV generated");
        Ok(())
    }

    /// Runs the whole engine session on a blocking thread. The session is
    /// dropped, closing its connection, before the closure returns.
    async fn export(&self) -> Result<ExportOutcome, MaterializeError> {
        let engine = Arc::clone(&self.engine);
        let view = self.view.clone();
        let descriptor = self.descriptor.clone();
        let temp_path = self.temp_path.clone();

        let outcome = tokio::task::spawn_blocking(move || -> Result<ExportOutcome, EngineError> {
            let session = engine.connect(&descriptor)?;
            if !session.view_exists(&view)? {
                return Ok(ExportOutcome::ViewMissing);
            }
            session.export_csv(&view, &temp_path)?;
            Ok(ExportOutcome::Exported)
        })
        .await
        .map_err(|e| MaterializeError::GenerationFailed(format!("export task failed: {}", e)))?;

        Ok(outcome?)
    }

    /// The requester went away before the export finished.
    async fn abandon(&self, committed: bool) {
        if committed && self.options.discard_if_abandoned {
            info!(view = %self.view, "Export finished after its request was cancelled");
            self.lifecycle.delete_after_serve(&self.target).await;
        } else {
            debug!(view = %self.view, committed, "Export finished after its request was cancelled");
        }
    }

    async fn discard(&self, temp_path: &Path) {
        if let Err(e) = self.store.remove(temp_path).await {
            debug!(path = %temp_path.display(), error = %e, "No temporary export to discard");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cache_key::CacheKeyResolver;
    use crate::application::partition::hash_credential;
    use crate::application::ports::{
        EngineSession, MockArtifactStore, MockEngineSession, MockQueryEngine, StorageError,
    };

    fn cached() -> ExportOptions {
        ExportOptions {
            evict_on_missing: true,
            discard_if_abandoned: false,
        }
    }

    fn orders() -> ViewRef {
        ViewRef::parse("salesdb", "public", "orders").unwrap()
    }

    fn location() -> ArtifactLocation {
        CacheKeyResolver::new("/cache").resolve(&hash_credential("local.db"), &orders())
    }

    fn engine_with(exists: bool, export: Result<(), &'static str>) -> MockQueryEngine {
        let mut engine = MockQueryEngine::new();
        engine.expect_connect().times(1).returning(move |_| {
            let mut session = MockEngineSession::new();
            session.expect_view_exists().times(1).returning(move |_| Ok(exists));
            session
                .expect_export_csv()
                .times(if exists { 1 } else { 0 })
                .returning(move |_, _| export.map_err(|e| EngineError::Export(e.to_string())));
            Ok(Box::new(session) as Box<dyn EngineSession>)
        });
        engine
    }

    #[tokio::test]
    async fn test_generate_commits_temp_file() {
        let target = location().path();
        let mut store = MockArtifactStore::new();
        store
            .expect_commit()
            .withf(move |temp, dest| {
                dest == target.as_path()
                    && temp.parent() == target.parent()
                    && temp.to_string_lossy().ends_with(".tmp")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_remove().times(0);

        let store = Arc::new(store);
        let generator = ArtifactGenerator::new(
            Arc::new(engine_with(true, Ok(()))),
            store.clone(),
            LifecycleManager::new(store),
        );

        generator
            .generate(
                &orders(),
                &ConnectionDescriptor::new("local.db"),
                &location(),
                cached(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_view_evicts_cached_artifact() {
        let target = location().path();
        let mut store = MockArtifactStore::new();
        store.expect_commit().times(0);
        // One removal for the temp path, one eviction of the target.
        store
            .expect_remove()
            .withf(|p| p.to_string_lossy().ends_with(".tmp"))
            .times(1)
            .returning(|p| Err(StorageError::NotFound(p.display().to_string())));
        store
            .expect_remove()
            .withf(move |p| p == target.as_path())
            .times(1)
            .returning(|_| Ok(()));

        let store = Arc::new(store);
        let generator = ArtifactGenerator::new(
            Arc::new(engine_with(false, Ok(()))),
            store.clone(),
            LifecycleManager::new(store),
        );

        let err = generator
            .generate(
                &orders(),
                &ConnectionDescriptor::new("local.db"),
                &location(),
                cached(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MaterializeError::ViewNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_view_without_eviction() {
        let mut store = MockArtifactStore::new();
        store
            .expect_remove()
            .withf(|p: &Path| p.to_string_lossy().ends_with(".tmp"))
            .times(1)
            .returning(|_| Ok(()));

        let store = Arc::new(store);
        let generator = ArtifactGenerator::new(
            Arc::new(engine_with(false, Ok(()))),
            store.clone(),
            LifecycleManager::new(store),
        );

        let err = generator
            .generate(
                &orders(),
                &ConnectionDescriptor::new("local.db"),
                &location(),
                ExportOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MaterializeError::ViewNotFound(_)));
    }

    #[tokio::test]
    async fn test_export_failure_discards_temp() {
        let mut store = MockArtifactStore::new();
        store.expect_commit().times(0);
        store
            .expect_remove()
            .withf(|p: &Path| p.to_string_lossy().ends_with(".tmp"))
            .times(1)
            .returning(|_| Ok(()));

        let store = Arc::new(store);
        let generator = ArtifactGenerator::new(
            Arc::new(engine_with(true, Err("disk full"))),
            store.clone(),
            LifecycleManager::new(store),
        );

        let err = generator
            .generate(
                &orders(),
                &ConnectionDescriptor::new("local.db"),
                &location(),
                cached(),
            )
            .await
            .unwrap_err();
        match err {
            MaterializeError::GenerationFailed(cause) => assert!(cause.contains("disk full")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_generation_failure() {
        let mut engine = MockQueryEngine::new();
        engine
            .expect_connect()
            .times(1)
            .returning(|_| Err(EngineError::Connection("no such file".to_string())));

        let mut store = MockArtifactStore::new();
        store.expect_remove().returning(|_| Ok(()));

        let store = Arc::new(store);
        let generator =
            ArtifactGenerator::new(Arc::new(engine), store.clone(), LifecycleManager::new(store));

        let err = generator
            .generate(
                &orders(),
                &ConnectionDescriptor::new("missing.db"),
                &location(),
                cached(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MaterializeError::GenerationFailed(_)));
    }

    #[tokio::test]
    async fn test_abandoned_oneshot_export_is_removed() {
        let target = location().path();
        let (removed_tx, removed_rx) = tokio::sync::oneshot::channel::<PathBuf>();
        let removed_tx = std::sync::Mutex::new(Some(removed_tx));

        let mut engine = MockQueryEngine::new();
        engine.expect_connect().times(1).returning(|_| {
            let mut session = MockEngineSession::new();
            session.expect_view_exists().returning(|_| Ok(true));
            session.expect_export_csv().times(1).returning(|_, _| {
                std::thread::sleep(std::time::Duration::from_millis(200));
                Ok(())
            });
            Ok(Box::new(session) as Box<dyn EngineSession>)
        });

        let mut store = MockArtifactStore::new();
        store.expect_commit().times(1).returning(|_, _| Ok(()));
        store.expect_remove().returning(move |p| {
            if let Some(tx) = removed_tx.lock().unwrap().take() {
                let _ = tx.send(p.to_path_buf());
            }
            Ok(())
        });

        let store = Arc::new(store);
        let generator =
            ArtifactGenerator::new(Arc::new(engine), store.clone(), LifecycleManager::new(store));
        let options = ExportOptions {
            evict_on_missing: false,
            discard_if_abandoned: true,
        };

        // The caller gives up long before the export completes
        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            generator.generate(
                &orders(),
                &ConnectionDescriptor::new("local.db"),
                &location(),
                options,
            ),
        )
        .await;
        assert!(cancelled.is_err());

        let removed = tokio::time::timeout(std::time::Duration::from_secs(5), removed_rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(removed, target);
    }

    #[test]
    fn test_options_follow_policy() {
        use crate::application::policy::{OneShotFreshness, TtlFreshness};

        let cached = ExportOptions::for_policy(&TtlFreshness::new(chrono::Duration::minutes(1)));
        assert!(cached.evict_on_missing);
        assert!(!cached.discard_if_abandoned);

        let oneshot = ExportOptions::for_policy(&OneShotFreshness);
        assert!(!oneshot.evict_on_missing);
        assert!(oneshot.discard_if_abandoned);
    }
}
