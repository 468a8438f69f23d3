use crate::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ModelError {
    /// Frame was not valid JSON at all.
    #[error("Parse Error: {message} {location}")]
    Parse {
        message: String,
        location: ErrorLocation,
    },

    /// Valid JSON that no listener understands (unknown `type`, missing fields).
    #[error("Unrecognized Message Error: {message} {location}")]
    Unrecognized {
        message: String,
        location: ErrorLocation,
    },

    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },
}
