//! Configuration management for rollcall.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::DEFAULT_PADDING_DEGREES;
use crate::participant::DEFAULT_TIME_FORMAT;
use crate::registry::DuplicatePolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "rollcall";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "attendance.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "ROLLCALL_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`, sections split on `__`)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Scan configuration.
    pub scan: ScanConfig,
    /// Registry configuration.
    pub registry: RegistryConfig,
    /// Map configuration.
    pub map: MapConfig,
    /// Export configuration.
    pub export: ExportConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/rollcall/attendance.db`
    pub database_path: Option<PathBuf>,
}

/// Scan-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Match scans against the secondary identifier too.
    pub match_secondary: bool,
    /// Normalize scanned text before matching (default: trim only).
    pub normalize_input: bool,
    /// strftime format for check-in/out display stamps.
    pub time_format: String,
}

/// Registry-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How to treat identifiers that are already registered.
    pub duplicate_policy: DuplicatePolicy,
}

/// Map-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Degrees added around a bounding box whose points all coincide.
    pub padding_degrees: f64,
}

/// Export-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Title printed above the attendance report.
    pub report_title: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            match_secondary: true,
            normalize_input: false,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            padding_degrees: DEFAULT_PADDING_DEGREES,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            report_title: "รายงานการเข้าร่วมงาน".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.scan.time_format.is_empty()
            || StrftimeItems::new(&self.scan.time_format).any(|item| matches!(item, Item::Error))
        {
            return Err(Error::ConfigValidation {
                message: format!("invalid time_format: {:?}", self.scan.time_format),
            });
        }

        let padding = self.map.padding_degrees;
        if !padding.is_finite() || padding <= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!("padding_degrees must be a positive number, got {padding}"),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}
