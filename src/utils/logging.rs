//! Logging system initialization
//!
//! Writes tracing output to %APPDATA%\ParsecVDisplay\app.log. Every start shifts the
//! previous session logs down one slot (`app.log` → `app.log.1` → ... → `app.log.9`).

use crate::config::ConfigManager;
use crate::error::{Result, StringError, VdisplayError};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt};

/// Number of previous session logs kept next to the current one
const MAX_LOG_FILES: u8 = 9;

const LOG_FILE_NAME: &str = "app.log";

/// Install the global tracing subscriber
///
/// The level defaults to INFO and can be overridden with `RUST_LOG`.
pub fn init_logging() -> Result<()> {
    let log_dir = ConfigManager::ensure_config_dir()?;
    rotate_session_logs(&log_dir.join(LOG_FILE_NAME))?;

    // Size/time rotation is not wanted; sessions are rotated above
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("app")
        .filename_suffix("log")
        .build(&log_dir)
        .map_err(|e| VdisplayError::ConfigError(Box::new(e)))?;

    let subscriber = fmt()
        .with_writer(file_appender)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| VdisplayError::ConfigError(Box::new(e)))?;

    tracing::info!(
        "ParsecVDisplay v{} started, logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );
    Ok(())
}

/// Shift `log_path` and its numbered predecessors down one slot, dropping the oldest
fn rotate_session_logs(log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        return Ok(());
    }

    let (Some(dir), Some(name)) = (log_path.parent(), log_path.file_name()) else {
        return Err(VdisplayError::ConfigError(StringError::new(format!(
            "Invalid log path: {}",
            log_path.display()
        ))));
    };
    let name = name.to_string_lossy();
    let numbered = |i: u8| dir.join(format!("{name}.{i}"));

    let oldest = numbered(MAX_LOG_FILES);
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }

    for i in (1..MAX_LOG_FILES).rev() {
        let from = numbered(i);
        if from.exists() {
            std::fs::rename(&from, numbered(i + 1))?;
        }
    }

    std::fs::rename(log_path, numbered(1))?;
    Ok(())
}
