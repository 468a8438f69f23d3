//! The three independently mirrored state fields.
//!
//! Wire literals are the upper-case names the backend sends
//! (`"VOICE"`, `"LISTENING"`, ...).

use crate::{ErrorLocation, ModelError};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle of the single backend connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionStatus {
    /// Not connected; a retry may be scheduled.
    #[default]
    Disconnected,
    Connected,
    /// A scheduled retry has fired and a new attempt is in flight.
    Reconnecting,
}

/// Top-level interaction context the backend is servicing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InteractionMode {
    #[default]
    None,
    Vision,
    Voice,
}

/// Fine-grained progress of a voice interaction. Backend-authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoiceState {
    #[default]
    Idle,
    Requested,
    Listening,
    Waiting,
    Playing,
}

/// Full state handed to every subscriber on every change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub status: ConnectionStatus,
    pub mode: InteractionMode,
    pub voice_state: VoiceState,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "DISCONNECTED",
            ConnectionStatus::Connected => "CONNECTED",
            ConnectionStatus::Reconnecting => "RECONNECTING",
        }
    }
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionMode::None => "NONE",
            InteractionMode::Vision => "VISION",
            InteractionMode::Voice => "VOICE",
        }
    }

    /// `true` for every mode the backend can actually service.
    pub fn is_active(&self) -> bool {
        !matches!(self, InteractionMode::None)
    }

    /// Resolve a UI view name to the mode it activates.
    ///
    /// `home`, `menu` and `none` are the idle views; matching is
    /// case-insensitive.
    #[track_caller]
    pub fn from_view(name: &str) -> Result<Self, ModelError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "vision" => Ok(InteractionMode::Vision),
            "voice" => Ok(InteractionMode::Voice),
            "home" | "menu" | "none" => Ok(InteractionMode::None),
            other => Err(ModelError::Validation {
                message: format!("Unknown view: {other:?}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl VoiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceState::Idle => "IDLE",
            VoiceState::Requested => "REQUESTED",
            VoiceState::Listening => "LISTENING",
            VoiceState::Waiting => "WAITING",
            VoiceState::Playing => "PLAYING",
        }
    }
}

impl Display for ConnectionStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

impl Display for InteractionMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

impl Display for VoiceState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for InteractionMode {
    type Err = ModelError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "NONE" => Ok(InteractionMode::None),
            "VISION" => Ok(InteractionMode::Vision),
            "VOICE" => Ok(InteractionMode::Voice),
            other => Err(ModelError::Validation {
                message: format!("Unknown interaction mode: {other:?}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl FromStr for VoiceState {
    type Err = ModelError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "IDLE" => Ok(VoiceState::Idle),
            "REQUESTED" => Ok(VoiceState::Requested),
            "LISTENING" => Ok(VoiceState::Listening),
            "WAITING" => Ok(VoiceState::Waiting),
            "PLAYING" => Ok(VoiceState::Playing),
            other => Err(ModelError::Validation {
                message: format!("Unknown voice state: {other:?}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
