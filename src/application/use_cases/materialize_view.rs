use std::sync::Arc;
use tracing::{debug, info};

use crate::application::cache_key::{ArtifactLocation, CacheKeyResolver};
use crate::application::dto::{CacheStatus, ServedArtifact, SnapshotRequest};
use crate::application::errors::MaterializeError;
use crate::application::generator::{ArtifactGenerator, ExportOptions};
use crate::application::lifecycle::{LifecycleManager, ServeGuard};
use crate::application::locks::KeyedLocks;
use crate::application::partition::CredentialPartitioner;
use crate::application::policy::FreshnessPolicy;
use crate::application::ports::{ArtifactStore, Clock, QueryEngine};
use crate::domain::value_objects::ViewRef;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Use case: Serve a CSV snapshot of a view, reusing a fresh artifact when
/// the policy allows it and regenerating otherwise.
pub struct MaterializeViewUseCase {
    partitioner: CredentialPartitioner,
    resolver: CacheKeyResolver,
    policy: Arc<dyn FreshnessPolicy>,
    store: Arc<dyn ArtifactStore>,
    generator: ArtifactGenerator,
    lifecycle: LifecycleManager,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks,
}

impl MaterializeViewUseCase {
    pub fn new(
        partitioner: CredentialPartitioner,
        resolver: CacheKeyResolver,
        policy: Arc<dyn FreshnessPolicy>,
        engine: Arc<dyn QueryEngine>,
        store: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lifecycle = LifecycleManager::new(Arc::clone(&store));
        let generator = ArtifactGenerator::new(engine, Arc::clone(&store), lifecycle.clone());

        Self {
            partitioner,
            resolver,
            policy,
            store,
            generator,
            lifecycle,
            clock,
            locks: KeyedLocks::new(),
        }
    }

    pub fn policy(&self) -> &dyn FreshnessPolicy {
        self.policy.as_ref()
    }

    pub async fn execute(
        &self,
        request: SnapshotRequest,
    ) -> Result<ServedArtifact, MaterializeError> {
        // 1. Validate before anything touches the filesystem or the engine
        let view = ViewRef::parse(&request.database, &request.schema, &request.view)?;

        // 2. Partition by credential
        let partition = self.partitioner.partition(request.credential.as_deref());

        // 3. Resolve location and make sure its directory exists
        let location = self
            .policy
            .locate(&self.resolver, &partition.isolation_key, &view);
        self.store.ensure_dir(location.dir()).await?;

        // 4. Reuse if fresh
        if self.is_fresh(&location).await? {
            info!(
                view = %view,
                isolation_key = %partition.isolation_key.short(),
                "Serving cached CSV"
            );
            let cleanup = self.cleanup_for(&location);
            return self.open(&view, &location, CacheStatus::Hit, cleanup).await;
        }

        // 5. Regenerate, serialised per location when the policy shares paths
        let _guard = if self.policy.serialises_generation() {
            Some(self.locks.lock(&location.path()).await)
        } else {
            None
        };

        if self.policy.serialises_generation() && self.is_fresh(&location).await? {
            debug!(view = %view, "Artifact regenerated by a concurrent request");
            let cleanup = self.cleanup_for(&location);
            return self.open(&view, &location, CacheStatus::Hit, cleanup).await;
        }

        // Owned from here on, so a request dropped after the commit still
        // removes its one-shot artifact.
        let cleanup = self.cleanup_for(&location);

        self.generator
            .generate(
                &view,
                &partition.descriptor,
                &location,
                ExportOptions::for_policy(self.policy.as_ref()),
            )
            .await?;

        self.open(&view, &location, CacheStatus::Miss, cleanup).await
    }

    async fn is_fresh(&self, location: &ArtifactLocation) -> Result<bool, MaterializeError> {
        let modified_at = self.store.modified_at(&location.path()).await?;
        Ok(self.policy.is_fresh(modified_at, self.clock.now()))
    }

    fn cleanup_for(&self, location: &ArtifactLocation) -> Option<ServeGuard> {
        self.policy
            .deletes_after_serve()
            .then(|| self.lifecycle.serve_guard(location.path()))
    }

    async fn open(
        &self,
        view: &ViewRef,
        location: &ArtifactLocation,
        cache_status: CacheStatus,
        cleanup: Option<ServeGuard>,
    ) -> Result<ServedArtifact, MaterializeError> {
        let (reader, size_bytes) = self.store.open(&location.path()).await?;

        Ok(ServedArtifact {
            reader,
            size_bytes,
            file_name: view.file_name(),
            content_type: CSV_CONTENT_TYPE,
            cache_status,
            cleanup,
        })
    }
}
