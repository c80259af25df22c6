//! Application configuration with layered loading.
//!
//! Settings for storage, the served origin, cache generations and the
//! countdown clocks, loaded with figment from multiple sources:
//!
//! 1. Environment variables (EXPEDITION_*)
//! 2. TOML config file (if EXPEDITION_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Critical URLs stored when a cache generation is installed.
pub const DEFAULT_PRECACHE_URLS: &[&str] = &["./", "./index.html", "./app.js", "./style.css", "./manifest.json"];

/// URLs re-fetched on background sync.
pub const DEFAULT_SYNC_URLS: &[&str] = &["./", "./index.html", "./app.js", "./style.css"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EXPEDITION_*)
/// 2. TOML config file (if EXPEDITION_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding local storage and caches.
    ///
    /// Set via EXPEDITION_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL the countdown page is served from.
    ///
    /// Relative manifest entries (`./app.js`) resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version string embedded in the cache generation name.
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Prefix shared by every cache generation of this application.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Maximum entries per named cache before eviction kicks in.
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport-level HTTP timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Countdown tick interval in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks closer together than this are skipped.
    #[serde(default = "default_min_tick_interval_ms")]
    pub min_tick_interval_ms: u64,

    /// Quote rotation interval in milliseconds.
    #[serde(default = "default_quote_interval_ms")]
    pub quote_interval_ms: u64,

    /// URLs stored on install.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// URLs refreshed on background sync.
    #[serde(default = "default_sync_urls")]
    pub sync_urls: Vec<String>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./expedition.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_app_version() -> String {
    "1.0.0".into()
}

fn default_cache_prefix() -> String {
    "countdown-app-".into()
}

fn default_max_cache_entries() -> usize {
    50
}

fn default_user_agent() -> String {
    "expedition-countdown/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_min_tick_interval_ms() -> u64 {
    100
}

fn default_quote_interval_ms() -> u64 {
    5_000
}

fn default_precache_urls() -> Vec<String> {
    DEFAULT_PRECACHE_URLS.iter().map(|s| s.to_string()).collect()
}

fn default_sync_urls() -> Vec<String> {
    DEFAULT_SYNC_URLS.iter().map(|s| s.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            app_version: default_app_version(),
            cache_prefix: default_cache_prefix(),
            max_cache_entries: default_max_cache_entries(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            min_tick_interval_ms: default_min_tick_interval_ms(),
            quote_interval_ms: default_quote_interval_ms(),
            precache_urls: default_precache_urls(),
            sync_urls: default_sync_urls(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn min_tick_interval(&self) -> Duration {
        Duration::from_millis(self.min_tick_interval_ms)
    }

    pub fn quote_interval(&self) -> Duration {
        Duration::from_millis(self.quote_interval_ms)
    }

    /// Name of the current cache generation, e.g. `countdown-app-1.0.0`.
    pub fn cache_name(&self) -> String {
        format!("{}{}", self.cache_prefix, self.app_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EXPEDITION_`
    /// 2. TOML file from `EXPEDITION_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EXPEDITION_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EXPEDITION_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./expedition.sqlite"));
        assert_eq!(config.origin, "http://localhost:8080/");
        assert_eq!(config.app_version, "1.0.0");
        assert_eq!(config.max_cache_entries, 50);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.precache_urls.len(), 5);
        assert_eq!(config.sync_urls.len(), 4);
    }

    #[test]
    fn test_cache_name() {
        let config = AppConfig::default();
        assert_eq!(config.cache_name(), "countdown-app-1.0.0");
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.min_tick_interval(), Duration::from_millis(100));
        assert_eq!(config.quote_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("EXPEDITION_APP_VERSION", "2.0.0");
            jail.set_env("EXPEDITION_MAX_CACHE_ENTRIES", "10");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.cache_name(), "countdown-app-2.0.0");
            assert_eq!(config.max_cache_entries, 10);
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("expedition.toml", "origin = \"https://trip.example/\"\nquote_interval_ms = 2000\n")?;
            jail.set_env("EXPEDITION_CONFIG_FILE", "expedition.toml");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.origin, "https://trip.example/");
            assert_eq!(config.quote_interval_ms, 2000);
            Ok(())
        });
    }
}
