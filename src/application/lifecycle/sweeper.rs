use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::application::policy::FreshnessPolicy;
use crate::application::ports::{ArtifactStore, Clock, StorageError};

/// Summary of one sweep over the cache root.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepResult {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

impl SweepResult {
    pub fn has_removals(&self) -> bool {
        self.removed > 0
    }
}

/// Periodically removes artifacts that can never be served again and
/// temporary exports abandoned by crashed or timed-out requests.
pub struct ArtifactSweeper {
    store: Arc<dyn ArtifactStore>,
    policy: Arc<dyn FreshnessPolicy>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    grace: ChronoDuration,
}

impl ArtifactSweeper {
    /// Minimum age before an abandoned temporary export is removed.
    pub const DEFAULT_GRACE_MINUTES: i64 = 60;

    pub fn new(
        store: Arc<dyn ArtifactStore>,
        policy: Arc<dyn FreshnessPolicy>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            policy,
            clock,
            interval,
            grace: ChronoDuration::minutes(Self::DEFAULT_GRACE_MINUTES),
        }
    }

    pub fn with_grace(mut self, grace: ChronoDuration) -> Self {
        self.grace = grace;
        self
    }

    /// Run sweep loop
    pub async fn run(self: Arc<Self>) {
        info!(
            "Starting artifact sweeper with interval: {:?}, policy: {}",
            self.interval,
            self.policy.kind()
        );

        let mut interval = time::interval(self.interval);

        loop {
            interval.tick().await;

            match self.sweep_once().await {
                Ok(result) => {
                    if result.has_removals() || result.failed > 0 {
                        info!(
                            scanned = result.scanned,
                            removed = result.removed,
                            failed = result.failed,
                            "Artifact sweep completed"
                        );
                    }
                }
                Err(e) => error!("Artifact sweep failed: {}", e),
            }
        }
    }

    pub async fn sweep_once(&self) -> Result<SweepResult, StorageError> {
        let now = self.clock.now();
        let artifact_expiry = self.policy.expiry(self.grace);
        let mut result = SweepResult::default();

        for file in self.store.scan().await? {
            result.scanned += 1;

            let age = now.signed_duration_since(file.modified_at);
            let limit = if file.is_temp {
                self.grace
            } else {
                artifact_expiry
            };
            if age <= limit {
                continue;
            }

            match self.store.remove(&file.path).await {
                Ok(()) => {
                    debug!(path = %file.path.display(), temp = file.is_temp, "Swept artifact");
                    result.removed += 1;
                }
                // Served and deleted concurrently.
                Err(StorageError::NotFound(_)) => {}
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Failed to sweep artifact");
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}
