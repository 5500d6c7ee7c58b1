use std::path::PathBuf;

use crate::domain::value_objects::CachePolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_root: PathBuf,
    pub ttl_minutes: i64,
    /// `cached` or `oneshot`, see [`CachePolicy::parse`]
    pub cache_policy: String,
    /// Connection string used when a request carries no credential.
    pub default_connection: String,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    /// 0 disables rate limiting
    pub rate_limit_per_minute: u32,
    /// 0 disables the background sweeper
    pub sweep_interval_secs: u64,
    pub request_timeout_secs: u64,
}

const LOG_LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            cache_root: PathBuf::from(env_or("CACHE_DIR", "cache")),
            ttl_minutes: env_parse("CACHE_MINUTES", 1),
            cache_policy: env_or("CACHE_POLICY", "cached"),
            default_connection: env_or("DB_PATH", "local.db"),
            log_file: match env_or("LOG_FILE", "app.log") {
                path if path.is_empty() => None,
                path => Some(PathBuf::from(path)),
            },
            log_level: env_or("LOG_LEVEL", "INFO"),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse("PORT", 3500),
            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE", 0),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 300),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 300),
        }
    }

    /// Configuration for tests and embedding: cached policy, no limits, no sweeper.
    pub fn for_cache_root(cache_root: impl Into<PathBuf>, default_connection: &str) -> Self {
        Self {
            cache_root: cache_root.into(),
            ttl_minutes: 1,
            cache_policy: "cached".to_string(),
            default_connection: default_connection.to_string(),
            log_file: None,
            log_level: "INFO".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3500,
            rate_limit_per_minute: 0,
            sweep_interval_secs: 0,
            request_timeout_secs: 300,
        }
    }

    pub fn policy(&self) -> Result<CachePolicy, String> {
        CachePolicy::parse(&self.cache_policy, self.ttl_minutes).map_err(|e| e.to_string())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether HTTP server internals should log.
    pub fn is_verbose(&self) -> bool {
        matches!(self.log_level.to_uppercase().as_str(), "DEBUG" | "TRACE")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_root.as_os_str().is_empty() {
            return Err("CACHE_DIR cannot be empty".to_string());
        }

        if self.default_connection.trim().is_empty() {
            return Err("DB_PATH cannot be empty".to_string());
        }

        self.policy()?;

        if self.port == 0 {
            return Err("PORT must be between 1 and 65535".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_uppercase().as_str()) {
            return Err(format!(
                "LOG_LEVEL must be one of {}",
                LOG_LEVELS.join(", ")
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err("REQUEST_TIMEOUT_SECS must be at least 1".to_string());
        }

        Ok(())
    }
}
