//! Configuration management for the FileDeck daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/filedeck/config.toml`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default address the HTTP server binds to.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "FILEDECK_SESSION";

/// Default idle lifetime of a session, in seconds.
pub const DEFAULT_IDLE_TIMEOUT: u64 = 1440;

/// Longest allowed session idle lifetime (one week).
const MAX_IDLE_TIMEOUT: u64 = 7 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bind must be a socket address like 127.0.0.1:8080, got {0}")]
    InvalidBindAddress(String),

    #[error("auth.username must not be empty")]
    MissingUsername,

    #[error("auth.password_hash must be a bcrypt hash ($2a$/$2b$/$2y$); run `filedeck hash-password` to create one")]
    InvalidPasswordHash,

    #[error("auth.hash_cost must be between 4 and 31, got {0}")]
    InvalidHashCost(u32),

    #[error("max_upload_size must be greater than 0, got {0}")]
    InvalidMaxUploadSize(u64),

    #[error("idle_timeout must be between 1 and 604800 seconds, got {0}")]
    InvalidIdleTimeout(u64),

    #[error("cleanup_interval must be greater than 0, got {0}")]
    InvalidCleanupInterval(u64),

    #[error("cookie_name must be a non-empty token without separators, got {0:?}")]
    InvalidCookieName(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the FileDeck daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// HTTP server configuration.
    pub server: ServerConfig,

    /// File manager configuration.
    pub file: FileConfig,

    /// Login credentials.
    pub auth: AuthConfig,

    /// Session management configuration.
    pub session: SessionConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Optional log file; logs are written to stdout as well.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

/// File manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// Top directory served; also the fallback for invalid `dir` values.
    pub root: PathBuf,

    /// Keep every resolved path inside `root`.
    pub confine_to_root: bool,

    /// Maximum upload size in bytes (default: 100MB).
    pub max_upload_size: u64,
}

/// Login credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Username compared for exact equality.
    pub username: String,

    /// Salted bcrypt hash of the password.
    pub password_hash: String,

    /// bcrypt cost used by `filedeck hash-password`.
    pub hash_cost: u32,
}

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session identifier.
    pub cookie_name: String,

    /// Seconds of inactivity after which a session expires.
    pub idle_timeout: u64,

    /// Seconds between sweeps of expired sessions.
    pub cleanup_interval: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            confine_to_root: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password_hash: String::new(),
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            cleanup_interval: 60,
        }
    }
}

impl SessionConfig {
    /// Idle timeout as a duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    /// Cleanup interval as a duration.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval)
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filedeck")
        .join("config.toml")
}

/// Whether a string looks like a bcrypt hash in modular crypt format.
fn is_bcrypt_hash(hash: &str) -> bool {
    let prefix_ok = ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|p| hash.starts_with(p));
    // $2b$12$ + 53 characters of salt and digest
    prefix_ok && hash.len() == 60
}

fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FILEDECK_ROOT: Override the served root directory
    /// - FILEDECK_BIND: Override the listen address
    /// - FILEDECK_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - FILEDECK_USERNAME: Override the login username
    /// - FILEDECK_PASSWORD_HASH: Override the bcrypt password hash
    ///
    /// Returns the overridden settings. Overrides run before logging is set
    /// up, so the caller logs them.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Some(root) = env_override("FILEDECK_ROOT") {
            self.file.root = PathBuf::from(root);
            applied.push("file.root");
        }

        if let Some(bind) = env_override("FILEDECK_BIND") {
            self.server.bind = bind;
            applied.push("server.bind");
        }

        if let Some(level) = env_override("FILEDECK_LOG_LEVEL") {
            self.daemon.log_level = level;
            applied.push("daemon.log_level");
        }

        if let Some(username) = env_override("FILEDECK_USERNAME") {
            self.auth.username = username;
            applied.push("auth.username");
        }

        if let Some(hash) = env_override("FILEDECK_PASSWORD_HASH") {
            self.auth.password_hash = hash;
            applied.push("auth.password_hash");
        }

        applied
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddress(self.server.bind.clone()));
        }

        if self.auth.username.is_empty() {
            return Err(ConfigError::MissingUsername);
        }

        if !is_bcrypt_hash(&self.auth.password_hash) {
            return Err(ConfigError::InvalidPasswordHash);
        }

        if !(4..=31).contains(&self.auth.hash_cost) {
            return Err(ConfigError::InvalidHashCost(self.auth.hash_cost));
        }

        if self.file.max_upload_size == 0 {
            return Err(ConfigError::InvalidMaxUploadSize(self.file.max_upload_size));
        }

        if self.session.idle_timeout == 0 || self.session.idle_timeout > MAX_IDLE_TIMEOUT {
            return Err(ConfigError::InvalidIdleTimeout(self.session.idle_timeout));
        }

        if self.session.cleanup_interval == 0 {
            return Err(ConfigError::InvalidCleanupInterval(
                self.session.cleanup_interval,
            ));
        }

        if !is_cookie_token(&self.session.cookie_name) {
            return Err(ConfigError::InvalidCookieName(
                self.session.cookie_name.clone(),
            ));
        }

        // Validate log_level is a known value
        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Parsed listen address. Call [`Config::validate`] first for a typed error.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind))
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
