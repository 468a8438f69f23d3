//! Domain models for the hologram client.
//!
//! Pure data: the three mirrored state fields, the snapshot handed to
//! subscribers, and the JSON messages exchanged with the backend. No
//! runtime, no I/O.
//!
//! ## Architecture
//!
//! - **models** (this crate): state enums and wire messages
//! - **mirror-core**: channel, router, store and mode sync operating on them
//! - **hologram**: console app wiring everything together

pub mod error;
pub mod state;
pub mod wire;


pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use state::{ConnectionStatus, InteractionMode, StateSnapshot, VoiceState};
pub use wire::{Action, InboundMessage, MessageKind, OutboundMessage, SpeakAction, VoiceControl};
