pub mod channel;
pub mod config;
pub mod router;
pub mod store;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Channel(#[from] channel::ChannelError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Router(#[from] router::RouterError),

    #[error(transparent)]
    Store(#[from] store::StoreError),
}
