use common::ErrorLocation;
use models::ModelError;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("Unknown View Error: {message} {location}")]
    UnknownView {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ModelError> for StoreError {
    #[track_caller]
    fn from(error: ModelError) -> Self {
        StoreError::UnknownView {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
