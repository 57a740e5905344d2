//! Configuration management for fs-engine.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/fs-engine/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use model::ThumbnailFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::permissions::{PathRule, PermissionLevel};
use crate::thumbnail::{DEFAULT_MAX_DIMENSION, DEFAULT_MAX_SOURCE_SIZE, DEFAULT_QUALITY};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("max_dimension must be between 1 and 4096, got {0}")]
    InvalidMaxDimension(u32),

    #[error("default_quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    #[error("max_source_size must be greater than 0, got {0}")]
    InvalidMaxSourceSize(u64),

    #[error("permission rule path must not be empty")]
    EmptyRulePath,

    #[error("allowed root must be an absolute path, got {0}")]
    RelativeAllowedRoot(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Largest thumbnail edge accepted by [`Config::validate`].
const MAX_THUMBNAIL_DIMENSION: u32 = 4096;

/// Main configuration structure for fs-engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General engine configuration.
    pub engine: EngineConfig,

    /// Permission oracle configuration.
    pub permissions: PermissionsConfig,

    /// Listing defaults.
    pub listing: ListingConfig,

    /// Thumbnail generation settings.
    pub thumbnail: ThumbnailConfig,
}

/// General engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Rule-based permission oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Level applied where no rule matches.
    pub default_level: PermissionLevel,

    /// Hard outer boundary. Empty means every path is in bounds.
    pub allowed_roots: Vec<PathBuf>,

    /// Path rules; the most specific match wins.
    pub rules: Vec<PathRule>,

    /// Optional JSON rule store loaded at startup.
    pub store_path: Option<PathBuf>,
}

/// Listing defaults for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ListingConfig {
    /// Include hidden entries when no flag says otherwise.
    pub include_hidden: bool,
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Longest edge of a thumbnail in pixels (default: 256).
    pub max_dimension: u32,

    /// JPEG quality used when a request does not name one (default: 80).
    pub default_quality: u8,

    /// Output encoding.
    pub format: ThumbnailFormat,

    /// Largest source file accepted, in bytes (default: 24MB).
    pub max_source_size: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            default_level: PermissionLevel::Full,
            allowed_roots: Vec::new(),
            rules: Vec::new(),
            store_path: None,
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            default_quality: DEFAULT_QUALITY,
            format: ThumbnailFormat::Jpeg,
            max_source_size: DEFAULT_MAX_SOURCE_SIZE,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fs-engine")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FS_ENGINE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - FS_ENGINE_DEFAULT_LEVEL: Override the fallback permission level
    ///   (none, read, readwrite, full)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("FS_ENGINE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.engine.log_level = level;
            }
        }

        if let Ok(level) = std::env::var("FS_ENGINE_DEFAULT_LEVEL") {
            if !level.is_empty() {
                match level.parse::<PermissionLevel>() {
                    Ok(parsed) => {
                        tracing::info!(
                            "Overriding permissions.default_level from environment: {}",
                            level
                        );
                        self.permissions.default_level = parsed;
                    }
                    Err(e) => {
                        tracing::warn!("Ignoring FS_ENGINE_DEFAULT_LEVEL: {}", e);
                    }
                }
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.engine.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.engine.log_level.clone()));
        }

        let dimension = self.thumbnail.max_dimension;
        if dimension == 0 || dimension > MAX_THUMBNAIL_DIMENSION {
            return Err(ConfigError::InvalidMaxDimension(dimension));
        }

        let quality = self.thumbnail.default_quality;
        if !(1..=100).contains(&quality) {
            return Err(ConfigError::InvalidQuality(quality));
        }

        if self.thumbnail.max_source_size == 0 {
            return Err(ConfigError::InvalidMaxSourceSize(0));
        }

        if self
            .permissions
            .rules
            .iter()
            .any(|rule| rule.path.as_os_str().is_empty())
        {
            return Err(ConfigError::EmptyRulePath);
        }

        // Accept both host-absolute paths and drive roots written on another OS
        for root in &self.permissions.allowed_roots {
            let text = root.to_string_lossy();
            let drive = text.len() >= 2 && text.as_bytes()[1] == b':';
            if !root.is_absolute() && !text.starts_with('/') && !drive {
                return Err(ConfigError::RelativeAllowedRoot(text.into_owned()));
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
