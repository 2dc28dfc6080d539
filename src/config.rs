// src/config.rs

//! Application configuration structures.
//!
//! Configuration is loaded from a TOML file, then overridden by environment
//! variables, then validated. A missing auth token is a fatal startup error.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Image host authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Update monitoring behavior
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Outbound identity rotation
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Download worker pool
    #[serde(default)]
    pub workers: WorkerConfig,

    /// Outbound request rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Local storage layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote blog API
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is absent.
    ///
    /// Environment overrides are applied in either case.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Override individual settings from environment variables.
    fn apply_env_overrides(&mut self) {
        let mut overrides = Vec::new();

        fn take<T: std::str::FromStr>(key: &str, slot: &mut T, seen: &mut Vec<String>) {
            if let Ok(raw) = env::var(key) {
                if let Ok(value) = raw.parse::<T>() {
                    *slot = value;
                    seen.push(format!("{key}={raw}"));
                } else {
                    log::warn!("Ignoring unparseable env override {key}={raw}");
                }
            }
        }

        fn take_bool(key: &str, slot: &mut bool, seen: &mut Vec<String>) {
            if let Ok(raw) = env::var(key) {
                *slot = matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes");
                seen.push(format!("{key}={raw}"));
            }
        }

        take("AUTH_TOKEN", &mut self.auth.token, &mut overrides);
        take(
            "MONITOR_INTERVAL",
            &mut self.monitor.interval_secs,
            &mut overrides,
        );
        take_bool(
            "AUTO_DOWNLOAD",
            &mut self.monitor.auto_download,
            &mut overrides,
        );
        take_bool(
            "FORCE_DOWNLOAD",
            &mut self.monitor.force_download,
            &mut overrides,
        );
        take("UA_FILE", &mut self.identity.file, &mut overrides);
        take(
            "UA_CHANGE_INTERVAL",
            &mut self.identity.change_interval,
            &mut overrides,
        );
        take("MAX_WORKERS", &mut self.workers.max_workers, &mut overrides);
        take(
            "RATE_LIMIT",
            &mut self.rate_limit.max_requests,
            &mut overrides,
        );
        take(
            "RATE_WINDOW",
            &mut self.rate_limit.window_secs,
            &mut overrides,
        );
        take("STORAGE_PATH", &mut self.storage.path, &mut overrides);

        if !overrides.is_empty() {
            log::info!("Environment overrides: {}", overrides.join(", "));
        }
    }

    /// Validate configuration values for basic sanity.
    ///
    /// A missing auth token is fatal: the image host rejects anonymous
    /// uploads and every sync would silently degrade.
    pub fn validate(&self) -> Result<()> {
        if self.auth.token.trim().is_empty() {
            return Err(AppError::config("auth.token is required"));
        }
        if self.workers.max_workers == 0 {
            return Err(AppError::config("workers.max_workers must be > 0"));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(AppError::config("rate_limit.max_requests must be > 0"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(AppError::config("rate_limit.window_secs must be > 0"));
        }
        if self.identity.change_interval == 0 {
            return Err(AppError::config("identity.change_interval must be > 0"));
        }
        if self.monitor.interval_secs == 0 {
            return Err(AppError::config("monitor.interval_secs must be > 0"));
        }
        Ok(())
    }

    /// Root storage directory.
    pub fn storage_root(&self) -> PathBuf {
        PathBuf::from(&self.storage.path)
    }
}

/// Image host authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Upload token for the image host
    #[serde(default)]
    pub token: String,
}

/// Update monitoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between update checks in watch mode
    #[serde(default = "defaults::interval_secs")]
    pub interval_secs: u64,

    /// Download automatically when an update is detected
    #[serde(default = "defaults::auto_download")]
    pub auto_download: bool,

    /// Re-download everything once, then exit
    #[serde(default)]
    pub force_download: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval_secs(),
            auto_download: defaults::auto_download(),
            force_download: false,
        }
    }
}

/// Outbound identity rotation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// File with one identity string per line
    #[serde(default = "defaults::identity_file")]
    pub file: String,

    /// Every Nth request rotates sequentially instead of randomly
    #[serde(default = "defaults::change_interval")]
    pub change_interval: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            file: defaults::identity_file(),
            change_interval: defaults::change_interval(),
        }
    }
}

/// Download worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum concurrent article downloads
    #[serde(default = "defaults::max_workers")]
    pub max_workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: defaults::max_workers(),
        }
    }
}

/// Sliding-window rate limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    #[serde(default = "defaults::max_requests")]
    pub max_requests: usize,

    /// Window size in seconds
    #[serde(default = "defaults::window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: defaults::max_requests(),
            window_secs: defaults::window_secs(),
        }
    }
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for markdown, scratch files, and metadata
    #[serde(default = "defaults::storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: defaults::storage_path(),
        }
    }
}

/// Remote blog API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the blog API
    #[serde(default = "defaults::api_base_url")]
    pub base_url: String,

    /// Base URL of the image host upload endpoint
    #[serde(default = "defaults::image_host_url")]
    pub image_host_url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::api_base_url(),
            image_host_url: defaults::image_host_url(),
            timeout_secs: defaults::timeout_secs(),
        }
    }
}

mod defaults {
    pub fn interval_secs() -> u64 {
        3600
    }
    pub fn auto_download() -> bool {
        true
    }
    pub fn identity_file() -> String {
        "./ua.txt".into()
    }
    pub fn change_interval() -> u64 {
        60
    }
    pub fn max_workers() -> usize {
        5
    }
    pub fn max_requests() -> usize {
        5
    }
    pub fn window_secs() -> u64 {
        60
    }
    pub fn storage_path() -> String {
        "./storage".into()
    }
    pub fn api_base_url() -> String {
        "https://api.cuiliangblog.cn/v1/blog".into()
    }
    pub fn image_host_url() -> String {
        "http://158.178.236.241/api/index.php".into()
    }
    pub fn timeout_secs() -> u64 {
        30
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = Config::default();
        assert_eq!(config.workers.max_workers, 5);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.monitor.interval_secs, 3600);
        assert!(config.monitor.auto_download);
    }

    #[test]
    fn validate_rejects_missing_token() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn validate_accepts_token() {
        let mut config = Config::default();
        config.auth.token = "7ef80fab".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.auth.token = "t".into();
        config.workers.max_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        // SAFETY: no other test in this binary touches these variables.
        unsafe {
            env::set_var("AUTH_TOKEN", "env-token");
            env::set_var("RATE_LIMIT", "9");
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        unsafe {
            env::remove_var("AUTH_TOKEN");
            env::remove_var("RATE_LIMIT");
        }

        assert_eq!(config.auth.token, "env-token");
        assert_eq!(config.rate_limit.max_requests, 9);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [auth]
            token = "abc"

            [rate_limit]
            max_requests = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.token, "abc");
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.workers.max_workers, 5);
    }
}
