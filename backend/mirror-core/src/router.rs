//! Two-tier inbound message dispatch.
//!
//! Every message is delivered to the listeners of its type. Action messages
//! are then delivered a second time to the listeners of `action:<name>`, so
//! a consumer interested in all actions and one interested in a single
//! action can coexist without the backend knowing about either.

use crate::error::router::RouterError;
use crate::lock;

use common::ErrorLocation;
use models::{InboundMessage, MessageKind};

use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use log::trace;

const ACTION_KEY_PREFIX: &str = "action:";

pub type Listener = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Where a listener is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteKey {
    /// Every message of a type.
    Kind(MessageKind),
    /// Only `action` messages with this action name.
    Action(String),
}

impl RouteKey {
    pub fn action(name: impl Into<String>) -> Self {
        RouteKey::Action(name.into())
    }
}

impl From<MessageKind> for RouteKey {
    fn from(kind: MessageKind) -> Self {
        RouteKey::Kind(kind)
    }
}

impl FromStr for RouteKey {
    type Err = RouterError;

    /// Parses the string form used by UI code: `"video"`, `"action:wave"`.
    #[track_caller]
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        if let Some(name) = key.strip_prefix(ACTION_KEY_PREFIX) {
            if name.is_empty() {
                return Err(RouterError::UnknownKey {
                    key: key.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            return Ok(RouteKey::action(name));
        }

        MessageKind::from_str(key)
            .map(RouteKey::Kind)
            .map_err(|_| RouterError::UnknownKey {
                key: key.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}

impl Display for RouteKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            RouteKey::Kind(kind) => formatter.write_str(kind.as_str()),
            RouteKey::Action(name) => write!(formatter, "{ACTION_KEY_PREFIX}{name}"),
        }
    }
}

/// Listener registry shared by the channel and every adapter.
///
/// `Clone` hands out another handle to the same registry.
#[derive(Clone, Default)]
pub struct Router {
    listeners: Arc<Mutex<HashMap<RouteKey, Vec<Listener>>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners for one key run in registration order.
    pub fn on<F>(&self, key: impl Into<RouteKey>, listener: F)
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let key = key.into();
        trace!("Registering listener for {key}");
        lock(&self.listeners)
            .entry(key)
            .or_default()
            .push(Arc::new(listener));
    }

    /// Register a listener by its string key (`"transcribe"`, `"action:speak"`).
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnknownKey`] if the key names no message type.
    pub fn on_key<F>(&self, key: &str, listener: F) -> Result<(), RouterError>
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let key = RouteKey::from_str(key)?;
        self.on(key, listener);
        Ok(())
    }

    /// Deliver a message to its type listeners, then to its action listeners.
    ///
    /// Returns the number of listeners invoked. Messages nobody listens for
    /// are dropped silently.
    pub fn dispatch(&self, message: &InboundMessage) -> usize {
        let mut invoked = self.invoke(&RouteKey::Kind(message.kind()), message);

        if let InboundMessage::Action(action) = message {
            invoked += self.invoke(&RouteKey::action(action.name()), message);
        }

        invoked
    }

    pub fn listener_count(&self, key: &RouteKey) -> usize {
        lock(&self.listeners).get(key).map_or(0, Vec::len)
    }

    fn invoke(&self, key: &RouteKey, message: &InboundMessage) -> usize {
        // Snapshot so listeners can register further listeners without deadlocking.
        let listeners: Vec<Listener> = match lock(&self.listeners).get(key) {
            Some(listeners) => listeners.clone(),
            None => return 0,
        };

        trace!("Dispatching {key} to {} listener(s)", listeners.len());
        for listener in &listeners {
            listener(message);
        }
        listeners.len()
    }
}
