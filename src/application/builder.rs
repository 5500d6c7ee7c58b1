use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::api::middleware::rate_limiting::{RateLimitConfig, RateLimiter};
use crate::api::router::AppState;
use crate::application::{
    cache_key::CacheKeyResolver,
    lifecycle::ArtifactSweeper,
    partition::CredentialPartitioner,
    policy::{policy_for, FreshnessPolicy},
    ports::{ArtifactStore, Clock, QueryEngine, SystemClock},
    use_cases::MaterializeViewUseCase,
};
use crate::config::Config;
use crate::infrastructure::{engine::DuckDbEngine, storage::LocalArtifactStore};

/// Application builder for clean dependency injection and setup
pub struct ApplicationBuilder {
    config: Config,
    engine: Option<Arc<dyn QueryEngine>>,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn ArtifactStore>>,
    policy: Option<Arc<dyn FreshnessPolicy>>,
}

impl ApplicationBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            engine: None,
            clock: None,
            store: None,
            policy: None,
        }
    }

    /// Replace the DuckDB engine, e.g. with a test double
    pub fn with_query_engine(mut self, engine: Arc<dyn QueryEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Create the cache root and the artifact store on top of it
    pub async fn with_infrastructure(mut self) -> Result<Self, Box<dyn std::error::Error>> {
        let policy = self.config.policy()?;

        let store = Arc::new(LocalArtifactStore::with_durability(
            self.config.cache_root.clone(),
            true,
        ));
        store.init().await?;
        let store: Arc<dyn ArtifactStore> = store;

        info!(
            "Cache root ready at {} with policy {}",
            self.config.cache_root.display(),
            policy
        );

        self.store = Some(store);
        self.policy = Some(policy_for(policy));
        Ok(self)
    }

    /// Build application state
    pub fn build(&self) -> Result<AppState, Box<dyn std::error::Error>> {
        let store = self
            .store
            .as_ref()
            .ok_or("Artifact store not initialized")?;
        let policy = self.policy.as_ref().ok_or("Cache policy not initialized")?;

        let materialize_use_case = Arc::new(MaterializeViewUseCase::new(
            CredentialPartitioner::new(self.config.default_connection.clone()),
            CacheKeyResolver::new(self.config.cache_root.clone()),
            Arc::clone(policy),
            self.engine(),
            Arc::clone(store),
            self.clock(),
        ));

        let rate_limiter = (self.config.rate_limit_per_minute > 0).then(|| {
            Arc::new(RateLimiter::new(RateLimitConfig {
                requests_per_window: self.config.rate_limit_per_minute,
                ..Default::default()
            }))
        });

        info!("Application layer initialized");

        Ok(AppState {
            materialize_use_case,
            cache_root: Arc::new(self.config.cache_root.clone()),
            rate_limiter,
            request_timeout: Duration::from_secs(self.config.request_timeout_secs),
        })
    }

    /// Background sweeper, or `None` when disabled by configuration
    pub fn build_sweeper(
        &self,
    ) -> Result<Option<Arc<ArtifactSweeper>>, Box<dyn std::error::Error>> {
        if self.config.sweep_interval_secs == 0 {
            return Ok(None);
        }

        let store = self
            .store
            .as_ref()
            .ok_or("Artifact store not initialized")?;
        let policy = self.policy.as_ref().ok_or("Cache policy not initialized")?;

        Ok(Some(Arc::new(ArtifactSweeper::new(
            Arc::clone(store),
            Arc::clone(policy),
            self.clock(),
            Duration::from_secs(self.config.sweep_interval_secs),
        ))))
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn engine(&self) -> Arc<dyn QueryEngine> {
        self.engine
            .clone()
            .unwrap_or_else(|| Arc::new(DuckDbEngine::new()))
    }

    fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone().unwrap_or_else(|| Arc::new(SystemClock))
    }
}
