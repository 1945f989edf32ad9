//! Configuration management for the fileshare daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/fileshare/config.toml`.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default address the HTTP server binds to (all interfaces).
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Default edge length limit for thumbnails, in pixels.
pub const DEFAULT_THUMBNAIL_DIMENSION: u32 = 100;

/// Largest accepted thumbnail edge length.
const MAX_THUMBNAIL_DIMENSION: u32 = 1024;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bind_addr must be an IP address, got {0}")]
    InvalidBindAddr(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("max_dimension must be between 1 and 1024, got {0}")]
    InvalidThumbnailDimension(u32),

    #[error("thumbnail workers must be greater than 0")]
    InvalidWorkers,

    #[error("shared root is not an existing directory: {0}")]
    InvalidRoot(PathBuf),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the fileshare daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// HTTP listener configuration.
    pub server: ServerConfig,

    /// The shared folder and upload limits.
    pub share: ShareConfig,

    /// Thumbnail generation.
    pub thumbnail: ThumbnailConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Optional file that receives log output in addition to stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind.
    pub bind_addr: String,

    /// TCP port. 0 picks an ephemeral port.
    pub port: u16,
}

/// Shared folder configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShareConfig {
    /// Folder exposed to clients. `None` serves an informational page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Whether entries starting with '.' are listed.
    pub show_hidden: bool,

    /// Maximum request body size for uploads in bytes (0 = unlimited).
    pub max_upload_size: u64,
}

/// Thumbnail generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Generate previews for images and videos in listings.
    pub enabled: bool,

    /// Neither edge of a thumbnail exceeds this many pixels.
    pub max_dimension: u32,

    /// Maximum number of listings building thumbnails at the same time.
    pub workers: usize,

    /// Explicit ffmpeg binary for video frames. Looked up on PATH if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
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
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            root: None,
            show_hidden: true,
            max_upload_size: 1024 * 1024 * 1024, // 1GB
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_dimension: DEFAULT_THUMBNAIL_DIMENSION,
            workers: 10,
            ffmpeg_path: None,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fileshare")
        .join("config.toml")
}

/// One environment variable consulted by [`Config::apply_env_overrides`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOverride {
    /// The variable replaced a config value.
    Applied { var: &'static str, value: String },
    /// The variable was set but could not be used.
    Ignored { var: &'static str, value: String },
}

impl EnvOverride {
    /// Report the override through `tracing`.
    ///
    /// Overrides are applied before the subscriber exists, so callers log
    /// them once logging is initialised.
    pub fn log(&self) {
        match self {
            Self::Applied { var, value } => {
                tracing::info!("Overriding config from environment: {}={}", var, value)
            }
            Self::Ignored { var, value } => {
                tracing::warn!("Ignoring invalid {}: {}", var, value)
            }
        }
    }
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FILESHARE_ROOT: Override the shared folder
    /// - FILESHARE_PORT: Override the HTTP port
    /// - FILESHARE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    ///
    /// Returns what was applied or ignored, in that order of variables.
    pub fn apply_env_overrides(&mut self) -> Vec<EnvOverride> {
        let mut overrides = Vec::new();

        if let Ok(root) = std::env::var("FILESHARE_ROOT") {
            if !root.is_empty() {
                self.share.root = Some(PathBuf::from(&root));
                overrides.push(EnvOverride::Applied {
                    var: "FILESHARE_ROOT",
                    value: root,
                });
            }
        }

        if let Ok(port) = std::env::var("FILESHARE_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) => {
                    self.server.port = parsed;
                    overrides.push(EnvOverride::Applied {
                        var: "FILESHARE_PORT",
                        value: port,
                    });
                }
                Err(_) if port.is_empty() => {}
                Err(_) => overrides.push(EnvOverride::Ignored {
                    var: "FILESHARE_PORT",
                    value: port,
                }),
            }
        }

        if let Ok(level) = std::env::var("FILESHARE_LOG_LEVEL") {
            if !level.is_empty() {
                self.daemon.log_level = level.clone();
                overrides.push(EnvOverride::Applied {
                    var: "FILESHARE_LOG_LEVEL",
                    value: level,
                });
            }
        }

        overrides
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_addr.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.server.bind_addr.clone()));
        }

        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        let dim = self.thumbnail.max_dimension;
        if dim == 0 || dim > MAX_THUMBNAIL_DIMENSION {
            return Err(ConfigError::InvalidThumbnailDimension(dim));
        }

        if self.thumbnail.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }

        if let Some(root) = &self.share.root {
            if !root.is_dir() {
                return Err(ConfigError::InvalidRoot(root.clone()));
            }
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
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
