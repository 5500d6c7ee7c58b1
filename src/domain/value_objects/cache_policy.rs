use chrono::Duration;

use crate::domain::errors::DomainError;

/// Artifact reuse policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Artifacts are partitioned per credential and reused while younger than `ttl`.
    Cached { ttl: Duration },
    /// Every request exports to a unique path that is deleted after serving.
    OneShot,
}

impl CachePolicy {
    /// Upper bound on the configurable TTL, roughly a century.
    pub const MAX_TTL_MINUTES: i64 = 100 * 365 * 24 * 60;

    pub fn cached_minutes(minutes: i64) -> Self {
        let minutes = minutes.clamp(-Self::MAX_TTL_MINUTES, Self::MAX_TTL_MINUTES);
        CachePolicy::Cached {
            ttl: Duration::minutes(minutes),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CachePolicy::Cached { .. } => "cached",
            CachePolicy::OneShot => "oneshot",
        }
    }

    /// Parse a policy name; `ttl_minutes` applies to the cached policy.
    pub fn parse(name: &str, ttl_minutes: i64) -> Result<Self, DomainError> {
        match name.trim().to_lowercase().as_str() {
            "cached" | "cache" | "ttl" => Ok(Self::cached_minutes(ttl_minutes)),
            "oneshot" | "one-shot" | "nocache" | "no-cache" => Ok(CachePolicy::OneShot),
            _ => Err(DomainError::InvalidCachePolicy(name.to_string())),
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::cached_minutes(1)
    }
}

impl std::fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CachePolicy::Cached { ttl } => write!(f, "cached(ttl={}m)", ttl.num_minutes()),
            CachePolicy::OneShot => write!(f, "oneshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            CachePolicy::parse("Cached", 5).unwrap(),
            CachePolicy::Cached {
                ttl: Duration::minutes(5)
            }
        );
        assert_eq!(CachePolicy::parse("no-cache", 5).unwrap(), CachePolicy::OneShot);
        assert_eq!(CachePolicy::parse(" oneshot ", 5).unwrap(), CachePolicy::OneShot);
    }

    #[test]
    fn test_parse_unknown() {
        assert!(matches!(
            CachePolicy::parse("forever", 5),
            Err(DomainError::InvalidCachePolicy(_))
        ));
    }

    #[test]
    fn test_ttl_is_clamped() {
        assert_eq!(
            CachePolicy::cached_minutes(i64::MAX),
            CachePolicy::cached_minutes(CachePolicy::MAX_TTL_MINUTES)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CachePolicy::cached_minutes(3).to_string(), "cached(ttl=3m)");
        assert_eq!(CachePolicy::OneShot.to_string(), "oneshot");
    }
}
