//! Mode-scoped activation for presentation adapters.
//!
//! Adapters receive every message for the keys they register, including
//! messages meant for a mode that is not active. Wrapping their listeners in
//! a [`ModeGate`] makes them react only while the store's mode matches.

use crate::router::{RouteKey, Router};
use crate::store::Store;

use models::{InboundMessage, InteractionMode};

use log::trace;

#[derive(Clone)]
pub struct ModeGate {
    store: Store,
    mode: InteractionMode,
}

impl ModeGate {
    pub fn new(store: Store, mode: InteractionMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// `true` while the store's mode equals this gate's mode.
    pub fn is_open(&self) -> bool {
        self.store.mode() == self.mode
    }

    /// Register `listener` on `router`, gated on this mode.
    pub fn on<F>(&self, router: &Router, key: impl Into<RouteKey>, listener: F)
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let gate = self.clone();
        let key = key.into();
        let gated_key = key.clone();

        router.on(key, move |message| {
            if gate.is_open() {
                listener(message);
            } else {
                trace!("{gated_key} ignored outside {} mode", gate.mode);
            }
        });
    }
}
