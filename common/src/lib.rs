//! Shared building blocks for the hologram workspace.
//!
//! Everything in here is dependency-light so that `models`, `mirror-core`
//! and the console app can all use it without pulling in the runtime.

pub mod error;


pub use error::error_location::ErrorLocation;
