//! Logging setup built on `fern`
//!
//! Everything in the crate logs through the `log` facade. This module wires the
//! facade to stderr and, when enabled, to a log file in the data directory.

use anyhow::{Context, Result};
use chrono::Local;
use log::LevelFilter;
use std::path::PathBuf;

use crate::config::LoggingConfig;
use crate::constants::{APP_DIR_NAME, LOG_FILE_NAME};

/// Install the global logger described by `config`.
///
/// Does nothing when logging is disabled. Fails if a logger was already
/// installed for this process.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    build_dispatch(config)?
        .apply()
        .context("Failed to install logger (already initialized?)")?;
    Ok(())
}

/// Build the dispatch without installing it
pub fn build_dispatch(config: &LoggingConfig) -> Result<fern::Dispatch> {
    let level = level_filter(config)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {:<5} {}] {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        // sqlx logs every statement at info; keep it to warnings
        .level_for("sqlx", LevelFilter::Warn)
        .level_for("sea_orm", LevelFilter::Warn)
        .chain(std::io::stderr());

    if config.log_to_file {
        let path = get_log_file_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = fern::log_file(&path).with_context(|| format!("Failed to open log file: {}", path.display()))?;
        dispatch = dispatch.chain(file);
    }

    Ok(dispatch)
}

/// Parse the configured level
pub fn level_filter(config: &LoggingConfig) -> Result<LevelFilter> {
    config
        .level
        .parse::<LevelFilter>()
        .with_context(|| format!("Invalid logging level '{}'", config.level))
}

/// Location of the log file
pub fn get_log_file_path() -> Result<PathBuf> {
    dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
        .map(|dir| dir.join(APP_DIR_NAME).join(LOG_FILE_NAME))
}
