//! JSON text frames exchanged with the backend.
//!
//! Inbound frames are discriminated by `type` and, for `type: "action"`, by a
//! nested `action` name. Decoding distinguishes frames that are not JSON at
//! all ([`ModelError::Parse`]) from well-formed JSON nobody understands
//! ([`ModelError::Unrecognized`]); the channel logs the former as an error
//! and treats the latter as inert.

use crate::{ErrorLocation, InteractionMode, ModelError, VoiceState};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level `type` discriminator of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Video,
    Action,
    Transcribe,
    State,
    Error,
    Mode,
}

/// A decoded backend message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Base64-encoded camera frame.
    Video { data: String },
    Action(Action),
    Transcribe { text: String },
    State { value: VoiceState },
    Error { message: String },
    /// Authoritative echo of the mode the backend is servicing.
    Mode { value: InteractionMode },
}

/// Payload of a `type: "action"` message.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Wave,
    MotionDetected,
    Speak(SpeakAction),
    /// Any action name this client has no dedicated variant for. Still routed.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeakAction {
    pub audio_path: String,
    pub text: Option<String>,
    /// Playback length in seconds, when the backend knows it.
    pub duration: Option<f64>,
}

/// A message sent to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Mode { value: InteractionMode },
    VoiceControl { action: VoiceControl },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceControl {
    Start,
    Stop,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawInbound {
    Video {
        data: String,
    },
    Action {
        action: String,
        audio_path: Option<String>,
        text: Option<String>,
        duration: Option<f64>,
    },
    Transcribe {
        text: String,
    },
    State {
        value: VoiceState,
    },
    Error {
        message: String,
    },
    Mode {
        value: InteractionMode,
    },
}

impl InboundMessage {
    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// - [`ModelError::Parse`] if the frame is not JSON
    /// - [`ModelError::Unrecognized`] if the JSON has an unknown `type` or is
    ///   missing fields its `type` requires
    #[track_caller]
    pub fn decode(frame: &str) -> Result<Self, ModelError> {
        let value: serde_json::Value =
            serde_json::from_str(frame).map_err(|e| ModelError::Parse {
                message: format!("Frame is not valid JSON: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let raw: RawInbound =
            serde_json::from_value(value).map_err(|e| ModelError::Unrecognized {
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(match raw {
            RawInbound::Video { data } => InboundMessage::Video { data },
            RawInbound::Action {
                action,
                audio_path,
                text,
                duration,
            } => InboundMessage::Action(Action::from_parts(action, audio_path, text, duration)?),
            RawInbound::Transcribe { text } => InboundMessage::Transcribe { text },
            RawInbound::State { value } => InboundMessage::State { value },
            RawInbound::Error { message } => InboundMessage::Error { message },
            RawInbound::Mode { value } => InboundMessage::Mode { value },
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            InboundMessage::Video { .. } => MessageKind::Video,
            InboundMessage::Action(_) => MessageKind::Action,
            InboundMessage::Transcribe { .. } => MessageKind::Transcribe,
            InboundMessage::State { .. } => MessageKind::State,
            InboundMessage::Error { .. } => MessageKind::Error,
            InboundMessage::Mode { .. } => MessageKind::Mode,
        }
    }
}

impl Action {
    #[track_caller]
    fn from_parts(
        name: String,
        audio_path: Option<String>,
        text: Option<String>,
        duration: Option<f64>,
    ) -> Result<Self, ModelError> {
        Ok(match name.as_str() {
            "wave" => Action::Wave,
            "motion_detected" => Action::MotionDetected,
            "speak" => {
                let audio_path = audio_path.ok_or_else(|| ModelError::Unrecognized {
                    message: String::from("speak action without audio_path"),
                    location: ErrorLocation::from(Location::caller()),
                })?;
                Action::Speak(SpeakAction {
                    audio_path,
                    text,
                    duration,
                })
            }
            _ => Action::Other(name),
        })
    }

    /// The wire name, used to build the `action:<name>` route.
    pub fn name(&self) -> &str {
        match self {
            Action::Wave => "wave",
            Action::MotionDetected => "motion_detected",
            Action::Speak(_) => "speak",
            Action::Other(name) => name,
        }
    }
}

impl OutboundMessage {
    /// Mode-sync request. Only modes the backend can service are sendable.
    #[track_caller]
    pub fn mode(mode: InteractionMode) -> Result<Self, ModelError> {
        if !mode.is_active() {
            return Err(ModelError::Validation {
                message: format!("Mode {mode} cannot be sent to the backend"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(OutboundMessage::Mode { value: mode })
    }

    pub fn voice_control(action: VoiceControl) -> Self {
        OutboundMessage::VoiceControl { action }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Mode { .. } => "mode",
            OutboundMessage::VoiceControl { .. } => "voice_control",
        }
    }
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Video => "video",
            MessageKind::Action => "action",
            MessageKind::Transcribe => "transcribe",
            MessageKind::State => "state",
            MessageKind::Error => "error",
            MessageKind::Mode => "mode",
        }
    }
}

impl Display for MessageKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ModelError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "video" => Ok(MessageKind::Video),
            "action" => Ok(MessageKind::Action),
            "transcribe" => Ok(MessageKind::Transcribe),
            "state" => Ok(MessageKind::State),
            "error" => Ok(MessageKind::Error),
            "mode" => Ok(MessageKind::Mode),
            other => Err(ModelError::Validation {
                message: format!("Unknown message type: {other:?}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
