//! Logging for the hologram console client.
//!
//! Dual output (colored stdout + plain log file) with thread-safe initialization.

use crate::error::HologramError;

use common::ErrorLocation;

use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "hologram.log";

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Frame payloads are logged at trace; keep tungstenite's own chatter out.
const DEPENDENCY_LOG_LEVEL: LevelFilter = LevelFilter::Warn;

/// Initialize the logger, writing `hologram.log` into `log_dir`.
///
/// Safe to call more than once: later calls log a warning and return `Ok`.
///
/// # Errors
///
/// Returns [`HologramError::Hologram`] if the log file cannot be created or
/// another global logger is already installed.
pub fn initialize(log_dir: &Path) -> Result<(), HologramError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir);
        if result.is_ok() {
            info!("Logger initialized with level: {LOG_LEVEL:?}");
        }
    });

    result
}

#[track_caller]
fn initialize_internal(log_dir: &Path) -> Result<(), HologramError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);

    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let base_dispatch = Dispatch::new()
        .level(LOG_LEVEL)
        .level_for("tungstenite", DEPENDENCY_LOG_LEVEL)
        .level_for("tokio_tungstenite", DEPENDENCY_LOG_LEVEL);

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
                target = record.target(),
            ))
        })
        .chain(stdout());

    // Plain text, no colors
    let file_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = record.level(),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0)
            ))
        })
        .chain(
            fern::log_file(&log_file_path).map_err(|e| HologramError::Hologram {
                message: format!("Failed to create log file {}: {e}", log_file_path.display()),
                location: ErrorLocation::from(Location::caller()),
            })?,
        );

    base_dispatch
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| HologramError::Hologram {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    Ok(())
}
