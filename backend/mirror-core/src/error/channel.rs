use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ChannelError {
    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Runtime Error: {message} {location}")]
    Runtime {
        message: String,
        location: ErrorLocation,
    },
}
