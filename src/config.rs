//! Application configuration module.
//!
//! Handles loading, validating, and merging `image-effect.toml`. Stock
//! defaults are overridden by the user file, which in turn is overridden by
//! command-line flags.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! backend = "raster"           # "raster" or "array"
//! output_dir = "saved_images"  # Fallback directory for saves
//!
//! [resize]
//! min_dimension = 120          # Smallest accepted width/height (inclusive)
//! max_dimension = 1080         # Largest accepted width/height (inclusive)
//!
//! [fetch]
//! connect_timeout_secs = 10
//! read_timeout_secs = 30
//!
//! [viewer]
//! # command = "feh --scale-down"   # Omit to use the platform opener
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{BackendKind, BackendSettings, FetchSettings, ResizeBounds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = "image-effect.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `image-effect.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Engine used for the whole session.
    pub backend: BackendKind,
    /// Where saves land when the given directory is missing or absent.
    pub output_dir: PathBuf,
    pub resize: ResizeConfig,
    pub fetch: FetchConfig,
    pub viewer: ViewerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Raster,
            output_dir: PathBuf::from("saved_images"),
            resize: ResizeConfig::default(),
            fetch: FetchConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resize.min_dimension == 0 {
            return Err(ConfigError::Validation(
                "resize.min_dimension must be at least 1".into(),
            ));
        }
        if self.resize.min_dimension > self.resize.max_dimension {
            return Err(ConfigError::Validation(
                "resize.min_dimension must not exceed resize.max_dimension".into(),
            ));
        }
        if self.fetch.connect_timeout_secs == 0 || self.fetch.read_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch timeouts must be non-zero".into(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn resize_bounds(&self) -> ResizeBounds {
        ResizeBounds {
            min: self.resize.min_dimension,
            max: self.resize.max_dimension,
        }
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            output_dir: self.output_dir.clone(),
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
                read_timeout: Duration::from_secs(self.fetch.read_timeout_secs),
            },
            viewer: self.viewer.command.clone(),
        }
    }
}

/// Accepted target dimensions (closed range, both axes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub min_dimension: u32,
    pub max_dimension: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        let bounds = ResizeBounds::default();
        Self {
            min_dimension: bounds.min,
            max_dimension: bounds.max,
        }
    }
}

/// Network limits for URL sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
        }
    }
}

/// External viewer used by `show`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Command line; the image path is appended as the last argument.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `image-effect.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `dir`, merged over stock defaults and validated.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(stock_defaults_value()?, overlay),
        None => stock_defaults_value()?,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `image-effect.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-effect configuration
# ==========================
# Every key is optional. Values below are the built-in defaults.

# Engine for the whole session: "raster" (bitmap object) or "array"
# (height x width x channel array). The two are not mixed in one session.
backend = "raster"

# Saves go here when the requested path has no directory, or names a
# directory that does not exist. Created on first use.
output_dir = "saved_images"

[resize]
# Accepted target width and height, both inclusive.
min_dimension = 120
max_dimension = 1080

[fetch]
# Timeouts for loading from an http(s) URL. One attempt, no retries.
connect_timeout_secs = 10
read_timeout_secs = 30

[viewer]
# Program used to show images; the preview path is appended.
# Defaults to xdg-open / open / start depending on the platform.
# command = "feh --scale-down"
"##
}
