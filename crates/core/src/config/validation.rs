//! Configuration validation rules.
//!
//! Rejects settings the cache manager or countdown could not run with:
//! an unusable origin, an empty cache generation name, a zero entry limit,
//! out-of-range timeouts and inconsistent tick intervals.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `app_version` or `cache_prefix` is empty
    /// - `max_cache_entries` is 0
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - tick intervals are 0 or the minimum exceeds the tick interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.origin) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            Ok(u) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported scheme: {}", u.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        if self.app_version.is_empty() {
            return Err(ConfigError::Invalid { field: "app_version".into(), reason: "must not be empty".into() });
        }
        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }

        if self.max_cache_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "max_cache_entries".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid { field: "tick_interval_ms".into(), reason: "must be greater than 0".into() });
        }
        if self.min_tick_interval_ms > self.tick_interval_ms {
            return Err(ConfigError::Invalid {
                field: "min_tick_interval_ms".into(),
                reason: "must not exceed tick_interval_ms".into(),
            });
        }
        if self.quote_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "quote_interval_ms".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.precache_urls.is_empty() {
            tracing::warn!("precache_urls is empty; install will store nothing");
        }

        Ok(())
    }
}
