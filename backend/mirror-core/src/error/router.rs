use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RouterError {
    #[error("Unknown Route Key Error: {key:?} {location}")]
    UnknownKey {
        key: String,
        location: ErrorLocation,
    },
}
