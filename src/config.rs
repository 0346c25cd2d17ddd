//! Configuration module for Stowage.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, StowageError};

/// Paths owned by the HTTP API; stored content cannot be served beneath them.
const RESERVED_PATHS: &[&str] = &["/items", "/health"];

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024 // 64MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            max_body_bytes: default_max_body_bytes(),
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
    "data/stowage.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Content storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding committed file content.
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Directory for content received but not yet committed.
    ///
    /// Must be on the same volume as `upload_path`.
    #[serde(default = "default_staging_path")]
    pub staging_path: String,
    /// URL prefix under which committed content is served.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Ceiling on the summed size of all file items, in bytes.
    #[serde(default = "default_max_storage_bytes")]
    pub max_storage_bytes: u64,
}

fn default_upload_path() -> String {
    "data/uploads".to_string()
}

fn default_staging_path() -> String {
    "data/staging".to_string()
}

fn default_url_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_storage_bytes() -> u64 {
    10 * 1024 * 1024 // 10MB
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_path: default_upload_path(),
            staging_path: default_staging_path(),
            url_prefix: default_url_prefix(),
            max_storage_bytes: default_max_storage_bytes(),
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
    "logs/stowage.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
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
    /// Content storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(StowageError::Io)?;
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
        toml::from_str(s).map_err(|e| StowageError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `STOWAGE_MAX_STORAGE_BYTES`: Override the storage ceiling
    /// - `STOWAGE_DATABASE_PATH`: Override the SQLite database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("STOWAGE_MAX_STORAGE_BYTES") {
            match value.trim().parse::<u64>() {
                Ok(max) => self.storage.max_storage_bytes = max,
                Err(_) => {
                    tracing::warn!(value = %value, "Ignoring unparsable STOWAGE_MAX_STORAGE_BYTES")
                }
            }
        }

        if let Ok(path) = std::env::var("STOWAGE_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The storage ceiling is zero
    /// - The URL prefix does not start with `/`, is `/` itself, or collides
    ///   with the API routes
    /// - Staging and upload directories are the same
    pub fn validate(&self) -> Result<()> {
        if self.storage.max_storage_bytes == 0 {
            return Err(StowageError::Config(
                "storage.max_storage_bytes must be greater than zero".to_string(),
            ));
        }
        if !self.storage.url_prefix.starts_with('/') {
            return Err(StowageError::Config(
                "storage.url_prefix must start with '/'".to_string(),
            ));
        }
        let prefix = self.storage.url_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return Err(StowageError::Config(
                "storage.url_prefix must not be the site root".to_string(),
            ));
        }
        if let Some(route) = RESERVED_PATHS
            .iter()
            .find(|route| prefix == **route || prefix.starts_with(&format!("{route}/")))
        {
            return Err(StowageError::Config(format!(
                "storage.url_prefix must not be under {route}"
            )));
        }
        if Path::new(&self.storage.staging_path) == Path::new(&self.storage.upload_path) {
            return Err(StowageError::Config(
                "storage.staging_path must differ from storage.upload_path".to_string(),
            ));
        }
        Ok(())
    }
}
