//! Configuration management for tasksync
//!
//! This module handles loading, parsing, and validation of configuration files.

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, CONFIG_GENERATED, DATABASE_FILE_NAME, DEFAULT_MAX_RETRIES, DEFAULT_PACING_AFTER_MS,
    DEFAULT_PACING_BEFORE_MS, DEFAULT_SETTLE_DELAY_MS, DEFAULT_SYNC_INTERVAL_SECS, DEFAULT_UPDATE_RETRY_ATTEMPTS,
    DEFAULT_UPDATE_RETRY_BACKOFF_MS, LOCAL_CONFIG_FILE_NAME, MAX_DELAY_MS, MAX_SYNC_INTERVAL_SECS,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Local database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite file. Empty means `<data dir>/tasksync/tasksync.db`.
    pub database_path: String,
    /// Keep everything in memory (tests, throwaway sessions)
    pub in_memory: bool,
    /// Pause after each serialized store operation, in milliseconds
    pub settle_delay_ms: u64,
}

/// Sync queue and processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between periodic passes of the processor
    pub interval_seconds: u64,
    /// Delay before each remote call, in milliseconds
    pub pacing_before_ms: u64,
    /// Delay after each applied operation, in milliseconds
    pub pacing_after_ms: u64,
    /// Failures allowed before an operation is parked as failed
    pub max_retries: i32,
    /// Extra existence checks performed when updating a task
    pub update_retry_attempts: u32,
    /// Backoff unit between those checks, in milliseconds
    pub update_retry_backoff_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Minimum level: "error", "warn", "info", "debug" or "trace"
    pub level: String,
    /// Also write to `<data dir>/tasksync/tasksync.log`
    pub log_to_file: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            in_memory: false,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_SYNC_INTERVAL_SECS,
            pacing_before_ms: DEFAULT_PACING_BEFORE_MS,
            pacing_after_ms: DEFAULT_PACING_AFTER_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            update_retry_attempts: DEFAULT_UPDATE_RETRY_ATTEMPTS,
            update_retry_backoff_ms: DEFAULT_UPDATE_RETRY_BACKOFF_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".to_string(),
            log_to_file: true,
        }
    }
}

impl StorageConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Resolve the database file location, falling back to the XDG data directory
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        if !self.database_path.is_empty() {
            return Ok(PathBuf::from(&self.database_path));
        }
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
            .map(|dir| dir.join(APP_DIR_NAME).join(DATABASE_FILE_NAME))
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn pacing_before(&self) -> Duration {
        Duration::from_millis(self.pacing_before_ms)
    }

    pub fn pacing_after(&self) -> Duration {
        Duration::from_millis(self.pacing_after_ms)
    }

    pub fn update_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.update_retry_backoff_ms)
    }
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file()?;

        if let Some(path) = config_path {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Result<Option<PathBuf>> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return Ok(Some(current_dir_config));
        }

        // 2. Check XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
            if xdg_config.exists() {
                return Ok(Some(xdg_config));
            }
        }

        Ok(None)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sync.interval_seconds == 0 {
            anyhow::bail!("interval_seconds must be at least 1");
        }
        if self.sync.interval_seconds > MAX_SYNC_INTERVAL_SECS {
            anyhow::bail!("interval_seconds cannot exceed {} (24 hours)", MAX_SYNC_INTERVAL_SECS);
        }

        if self.sync.max_retries < 1 {
            anyhow::bail!("max_retries must be at least 1, got {}", self.sync.max_retries);
        }

        for (name, value) in [
            ("settle_delay_ms", self.storage.settle_delay_ms),
            ("pacing_before_ms", self.sync.pacing_before_ms),
            ("pacing_after_ms", self.sync.pacing_after_ms),
            ("update_retry_backoff_ms", self.sync.update_retry_backoff_ms),
        ] {
            if value > MAX_DELAY_MS {
                anyhow::bail!("{} cannot exceed {}ms, got {}", name, MAX_DELAY_MS, value);
            }
        }

        if let Err(e) = self.logging.level.parse::<log::LevelFilter>() {
            anyhow::bail!("Invalid logging level '{}': {}", self.logging.level, e);
        }

        Ok(())
    }

    /// Generate default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let toml_content = toml::to_string_pretty(&config).context("Failed to serialize default config")?;

        let header = format!(
            "# tasksync configuration file\n# Generated on {}\n\n",
            chrono::Local::now().format("%Y-%m-%d")
        );

        let full_content = header + &toml_content;

        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(&path, full_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        println!("{}: {}", CONFIG_GENERATED, path.as_ref().display());
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn get_xdg_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
            .map(|dir| dir.join(APP_DIR_NAME))
    }

    /// Get the default config file path
    pub fn get_default_config_path() -> Result<PathBuf> {
        Ok(Self::get_xdg_config_dir()?.join(CONFIG_FILE_NAME))
    }
}
