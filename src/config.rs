//! Configuration module for feedsync.

use serde::Deserialize;
use std::path::Path;

use crate::{FeedsyncError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedsync.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedsync.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Feed fetching configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// User agent sent with every feed request.
    ///
    /// Many feed hosts reject or redirect clients that do not look like a browser.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Accept header sent with every feed request.
    #[serde(default = "default_accept")]
    pub accept: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Allow feed URLs that resolve to loopback or private addresses.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36"
        .to_string()
}

fn default_accept() -> String {
    "application/rss+xml, application/atom+xml, application/xml, text/xml;q=0.9, */*;q=0.8"
        .to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept: default_accept(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            allow_private_hosts: false,
        }
    }
}

/// On-demand import configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Item limit used when the caller does not give one.
    #[serde(default = "default_item_limit")]
    pub default_item_limit: usize,
    /// Upper bound for a caller-given item limit.
    #[serde(default = "default_max_item_limit")]
    pub max_item_limit: usize,
}

fn default_item_limit() -> usize {
    20
}

fn default_max_item_limit() -> usize {
    100
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_item_limit: default_item_limit(),
            max_item_limit: default_max_item_limit(),
        }
    }
}

/// Scheduled sync configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Whether the background sync timer runs.
    #[serde(default = "default_sync_enabled")]
    pub enabled: bool,
    /// Seconds between two sync runs.
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    /// Maximum items taken from each feed per run.
    #[serde(default = "default_sync_max_items")]
    pub max_items_per_feed: usize,
    /// Shared token for the HTTP sync trigger (empty disables the endpoint).
    #[serde(default)]
    pub trigger_token: String,
}

fn default_sync_enabled() -> bool {
    true
}

fn default_sync_interval() -> u64 {
    3600 // 1 hour
}

fn default_sync_max_items() -> usize {
    100
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: default_sync_enabled(),
            interval_secs: default_sync_interval(),
            max_items_per_feed: default_sync_max_items(),
            trigger_token: String::new(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// JWT secret used to verify caller tokens.
    #[serde(default)]
    pub jwt_secret: String,
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed fetching configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// On-demand import configuration.
    #[serde(default)]
    pub import: ImportConfig,
    /// Scheduled sync configuration.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedsyncError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedsyncError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDSYNC_JWT_SECRET`: JWT secret key
    /// - `FEEDSYNC_SYNC_TOKEN`: HTTP sync trigger token
    /// - `FEEDSYNC_DATABASE_PATH`: database file path
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) = non_empty_env("FEEDSYNC_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(token) = non_empty_env("FEEDSYNC_SYNC_TOKEN") {
            self.sync.trigger_token = token;
        }
        if let Some(path) = non_empty_env("FEEDSYNC_DATABASE_PATH") {
            self.database.path = path;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(FeedsyncError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via FEEDSYNC_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.import.default_item_limit == 0
            || self.import.default_item_limit > self.import.max_item_limit
        {
            return Err(FeedsyncError::Config(format!(
                "import.default_item_limit must be between 1 and {}",
                self.import.max_item_limit
            )));
        }
        if self.sync.enabled && self.sync.interval_secs == 0 {
            return Err(FeedsyncError::Config(
                "sync.interval_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
