//! Client configuration: where the backend lives and how the channel paces itself.
//!
//! Stored as `config.json` in the hologram config directory. A missing file
//! means defaults; a present but broken file is an error so a typo in the
//! endpoint never silently points the client at the wrong backend.

use crate::error::config::ConfigError;
use crate::{DEFAULT_ENDPOINT, DEFAULT_MODE_THROTTLE, DEFAULT_RECONNECT_DELAY};

use common::ErrorLocation;

use std::io::ErrorKind;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_VERSION: u32 = 1;
const APP_DIR_NAME: &str = "hologram";
const WEBSOCKET_SCHEME: &str = "ws";

/// Environment variable (or `.env` entry) overriding the configured endpoint.
pub const ENDPOINT_ENV_VAR: &str = "HOLOGRAM_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// WebSocket URL of the backend.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Fixed delay between a close and the next connection attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Minimum spacing between non-forced mode-sync sends.
    #[serde(default = "default_mode_throttle_ms")]
    pub mode_throttle_ms: u64,

    /// View to show once the client starts (`vision`, `voice`, `home`).
    #[serde(default)]
    pub initial_view: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            endpoint: default_endpoint(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            mode_throttle_ms: default_mode_throttle_ms(),
            initial_view: None,
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY.as_millis() as u64
}
fn default_mode_throttle_ms() -> u64 {
    DEFAULT_MODE_THROTTLE.as_millis() as u64
}

impl ClientConfig {
    /// Platform config directory for the client (`~/.config/hologram` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DirectoryNotFound`] if the platform has no config directory.
    #[track_caller]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| ConfigError::DirectoryNotFound {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("Platform has no config directory"),
            })
    }

    /// Load `{config_dir}/config.json`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, parsed or validated.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE_NAME);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No config at {}; using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                warn!("Cannot read {}: {source}", path.display());
                return Err(ConfigError::ReadError {
                    location: ErrorLocation::from(Location::caller()),
                    path,
                    source,
                });
            }
        };

        let config: ClientConfig =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.clone(),
                reason: e.to_string(),
            })?;
        config.validate()?;

        info!("Loaded config from {} (endpoint {})", path.display(), config.endpoint);
        Ok(config)
    }

    /// Validate, then write `{config_dir}/config.json` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, serialization or any filesystem step fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        let path = config_dir.join(CONFIG_FILE_NAME);
        write_atomically(config_dir, &path, json.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        self.endpoint_url()?;

        if self.reconnect_delay_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("reconnect_delay_ms must be greater than zero"),
            });
        }

        if self.mode_throttle_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("mode_throttle_ms must be greater than zero"),
            });
        }

        if let Some(ref view) = self.initial_view {
            models::InteractionMode::from_view(view).map_err(|e| {
                ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: e.to_string(),
                }
            })?;
        }

        Ok(())
    }

    /// Parsed backend endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the endpoint is not a `ws://` URL with a host.
    #[track_caller]
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("Invalid endpoint {:?}: {e}", self.endpoint),
        })?;

        if url.scheme() != WEBSOCKET_SCHEME || url.host_str().is_none() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Endpoint must be a {WEBSOCKET_SCHEME}:// URL with a host: {}",
                    self.endpoint
                ),
            });
        }

        Ok(url)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn mode_throttle(&self) -> Duration {
        Duration::from_millis(self.mode_throttle_ms)
    }

    /// Replace the endpoint when an override is present.
    pub fn with_endpoint_override(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            info!("Endpoint overridden: {} -> {}", self.endpoint, endpoint);
            self.endpoint = endpoint;
        }
        self
    }

    /// Read [`ENDPOINT_ENV_VAR`] from the environment, loading `.env` first if present.
    pub fn endpoint_from_env() -> Option<String> {
        dotenvy::var(ENDPOINT_ENV_VAR).ok()
    }
}

/// Write through a sibling temp file and rename, so readers never see a partial file.
#[track_caller]
fn write_atomically(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    let write_error = |path: &Path, source: std::io::Error| ConfigError::WriteError {
        location: ErrorLocation::from(Location::caller()),
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, contents).map_err(|e| write_error(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| write_error(path, e))
}
