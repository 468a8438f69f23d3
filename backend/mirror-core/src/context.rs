//! The explicit context object replacing page-wide singletons.
//!
//! [`MirrorContext`] is built once at startup and handed to every adapter.
//! It owns the one [`Channel`], the [`Store`], the [`Router`] and the
//! [`ModeSync`], and wires backend authority into the store:
//!
//! - `state` messages set the voice state
//! - `error` messages force the voice state back to `IDLE`
//! - `mode` messages (backend echo) set the mode without syncing it back

use crate::channel::Channel;
use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::error::store::StoreError;
use crate::retry::RetryPolicy;
use crate::router::Router;
use crate::store::{ModeSink, Store};
use crate::sync::ModeSync;
use crate::transport::{Connector, WebSocketConnector};

use models::{
    InboundMessage, InteractionMode, MessageKind, OutboundMessage, VoiceControl, VoiceState,
};

use std::sync::{Arc, Weak};

use log::{info, warn};

/// Cheap-to-clone handle; all clones share the same channel and store.
#[derive(Clone)]
pub struct MirrorContext {
    store: Store,
    router: Router,
    channel: Channel,
    mode_sync: Arc<ModeSync>,
}

impl MirrorContext {
    /// Build a context connecting over WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the configured endpoint is invalid.
    pub fn new(config: &ClientConfig) -> Result<Self, CoreError> {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    /// Build a context on top of any [`Connector`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if the configured endpoint is invalid.
    pub fn with_connector(
        config: &ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, CoreError> {
        let endpoint = config.endpoint_url()?;

        let store = Store::new();
        let router = Router::new();
        let channel = Channel::new(
            endpoint,
            connector,
            RetryPolicy::fixed(config.reconnect_delay()),
            store.clone(),
            router.clone(),
        );
        let mode_sync = Arc::new(ModeSync::new(channel.clone(), config.mode_throttle()));

        let sink = Arc::downgrade(&mode_sync);
        let sink: Weak<dyn ModeSink> = sink;
        store.bind_mode_sink(sink);

        let context = Self {
            store,
            router,
            channel,
            mode_sync,
        };
        context.route_backend_authority();

        Ok(context)
    }

    fn route_backend_authority(&self) {
        let store = self.store.clone();
        self.router.on(MessageKind::State, move |message| {
            if let InboundMessage::State { value } = message {
                store.set_voice_state(*value);
            }
        });

        let store = self.store.clone();
        self.router.on(MessageKind::Error, move |message| {
            if let InboundMessage::Error { message } = message {
                warn!("Backend reported error: {message}");
                store.set_voice_state(VoiceState::Idle);
            }
        });

        let store = self.store.clone();
        self.router.on(MessageKind::Mode, move |message| {
            if let InboundMessage::Mode { value } = message {
                store.set_mode(*value);
            }
        });
    }

    /// Open the connection. Idempotent while a connection is open or opening.
    pub fn start(&self) -> bool {
        info!("Starting mirror of {}", self.channel.endpoint());
        self.channel.connect()
    }

    pub fn shutdown(&self) {
        self.channel.shutdown();
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn mode_sync(&self) -> &ModeSync {
        &self.mode_sync
    }

    /// See [`Store::show_view`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownView`] for unknown view names.
    pub fn show_view(&self, name: &str) -> Result<InteractionMode, StoreError> {
        self.store.show_view(name)
    }

    /// Start or stop voice capture on the backend. Not throttled.
    pub fn send_voice_control(&self, action: VoiceControl) -> bool {
        self.channel.send(&OutboundMessage::voice_control(action))
    }
}
