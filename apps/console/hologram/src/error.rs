use common::ErrorLocation;
use mirror_core::error::CoreError;
use mirror_core::error::config::ConfigError;

use std::panic::Location;

use thiserror::Error;

/// Errors raised by the console client.
#[derive(Debug, Error)]
pub enum HologramError {
    /// Error from this App
    #[error("Hologram Error: {message} {location}")]
    Hologram {
        message: String,
        location: ErrorLocation,
    },

    /// A console line that names no command
    #[error("Unknown Command Error: {command:?} {location}")]
    UnknownCommand {
        command: String,
        location: ErrorLocation,
    },

    /// Error from mirror-core (config, channel, store)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}

impl From<CoreError> for HologramError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        HologramError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for HologramError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        HologramError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
