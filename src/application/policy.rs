//! Freshness and lifecycle rules for the two cache policies.
//!
//! Both policies share one request path; they differ only in where artifacts
//! live, whether an existing artifact may be reused, and what happens to it
//! afterwards.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::application::cache_key::{ArtifactLocation, CacheKeyResolver};
use crate::domain::value_objects::{CachePolicy, IsolationKey, ViewRef};

/// True iff an artifact exists and is strictly younger than `ttl` at `now`.
///
/// A zero or negative `ttl` never reuses. Staleness is purely time based.
pub fn is_fresh(modified_at: Option<DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> bool {
    if ttl <= Duration::zero() {
        return false;
    }
    match modified_at {
        Some(modified_at) => now.signed_duration_since(modified_at) < ttl,
        None => false,
    }
}

pub trait FreshnessPolicy: Send + Sync {
    fn kind(&self) -> CachePolicy;

    /// Where the artifact for this request lives.
    fn locate(
        &self,
        resolver: &CacheKeyResolver,
        key: &IsolationKey,
        view: &ViewRef,
    ) -> ArtifactLocation;

    /// Whether an artifact last modified at `modified_at` may be served at `now`.
    fn is_fresh(&self, modified_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool;

    /// Whether an artifact is removed when its source view no longer exists.
    fn evicts_on_missing_source(&self) -> bool;

    /// Whether an artifact is removed once it has been streamed.
    fn deletes_after_serve(&self) -> bool;

    /// Whether concurrent misses for one location should be serialised.
    fn serialises_generation(&self) -> bool;

    /// Age beyond which the sweeper removes an artifact.
    fn expiry(&self, grace: Duration) -> Duration;
}

/// Persistent, credential-partitioned cache with a time-to-live.
#[derive(Debug, Clone, Copy)]
pub struct TtlFreshness {
    ttl: Duration,
}

impl TtlFreshness {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

impl FreshnessPolicy for TtlFreshness {
    fn kind(&self) -> CachePolicy {
        CachePolicy::Cached { ttl: self.ttl }
    }

    fn locate(
        &self,
        resolver: &CacheKeyResolver,
        key: &IsolationKey,
        view: &ViewRef,
    ) -> ArtifactLocation {
        resolver.resolve(key, view)
    }

    fn is_fresh(&self, modified_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        is_fresh(modified_at, self.ttl, now)
    }

    fn evicts_on_missing_source(&self) -> bool {
        true
    }

    fn deletes_after_serve(&self) -> bool {
        false
    }

    fn serialises_generation(&self) -> bool {
        true
    }

    fn expiry(&self, grace: Duration) -> Duration {
        self.ttl.max(Duration::zero()) + grace
    }
}

/// Always regenerate into a unique path and delete after one response.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneShotFreshness;

impl FreshnessPolicy for OneShotFreshness {
    fn kind(&self) -> CachePolicy {
        CachePolicy::OneShot
    }

    fn locate(
        &self,
        resolver: &CacheKeyResolver,
        _key: &IsolationKey,
        view: &ViewRef,
    ) -> ArtifactLocation {
        resolver.resolve_unique(view)
    }

    fn is_fresh(&self, _modified_at: Option<DateTime<Utc>>, _now: DateTime<Utc>) -> bool {
        false
    }

    fn evicts_on_missing_source(&self) -> bool {
        false
    }

    fn deletes_after_serve(&self) -> bool {
        true
    }

    fn serialises_generation(&self) -> bool {
        false
    }

    fn expiry(&self, grace: Duration) -> Duration {
        grace
    }
}

/// Build the strategy selected by configuration.
pub fn policy_for(policy: CachePolicy) -> Arc<dyn FreshnessPolicy> {
    match policy {
        CachePolicy::Cached { ttl } => Arc::new(TtlFreshness::new(ttl)),
        CachePolicy::OneShot => Arc::new(OneShotFreshness),
    }
}
