//! The single reconnecting connection to the backend.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --connect()--> Connecting --open--> Open
//!   ^                     |                  |
//!   |                   error              close (any code)
//!   |                     v                  v
//!   +---- retry fires <-- status DISCONNECTED, delay from RetryPolicy
//!         (status RECONNECTING, then connect())
//! ```
//!
//! - At most one connection is open or opening at any time; `connect()` is a
//!   no-op otherwise, and a retry is only scheduled after the previous
//!   connection's close has been handled.
//! - Status becomes `DISCONNECTED` at close time and `RECONNECTING` only when
//!   the retry actually fires. A retry that fires after someone else already
//!   reopened the connection is skipped and leaves the status alone.
//! - A failed attempt is treated like an error followed by an abnormal close.
//! - Transport errors are logged; the close that follows drives recovery.
//! - Unparseable frames are logged and dropped; the connection stays up.
//!
//! Every attempt carries an id. Lifecycle events from an attempt that is no
//! longer current (after [`Channel::shutdown`]) are ignored.

use crate::error::channel::ChannelError;
use crate::lock;
use crate::retry::RetryPolicy;
use crate::router::Router;
use crate::store::Store;
use crate::transport::{
    ABNORMAL_CLOSURE, Connection, Connector, NORMAL_CLOSURE, TransportEvent,
};

use common::ErrorLocation;
use models::{ConnectionStatus, InboundMessage, ModelError, OutboundMessage};

use std::panic::Location;
use std::sync::{Arc, Mutex};

use log::{debug, error, info, trace, warn};
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::sleep as TokioSleep;
use url::Url;
use uuid::Uuid;

/// Handle to the process-wide channel. Clones share one connection.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    endpoint: Url,
    connector: Arc<dyn Connector>,
    retry: Mutex<RetryPolicy>,
    link: Mutex<Link>,
    store: Store,
    router: Router,
}

enum Link {
    Idle,
    Connecting {
        attempt: Uuid,
    },
    Open {
        attempt: Uuid,
        outgoing: UnboundedSender<String>,
    },
    /// Terminal; set by `shutdown()`.
    Shutdown,
}

impl Link {
    fn attempt(&self) -> Option<Uuid> {
        match self {
            Link::Connecting { attempt } | Link::Open { attempt, .. } => Some(*attempt),
            Link::Idle | Link::Shutdown => None,
        }
    }
}

impl Channel {
    pub fn new(
        endpoint: Url,
        connector: Arc<dyn Connector>,
        retry: RetryPolicy,
        store: Store,
        router: Router,
    ) -> Self {
        debug!("Channel for {endpoint} using retry policy {retry:?}");
        Self {
            inner: Arc::new(ChannelInner {
                endpoint,
                connector,
                retry: Mutex::new(retry),
                link: Mutex::new(Link::Idle),
                store,
                router,
            }),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    pub fn is_open(&self) -> bool {
        matches!(*lock(&self.inner.link), Link::Open { .. })
    }

    /// Open a connection unless one is already open or opening.
    ///
    /// Returns `true` if a new attempt was started. Must be called from
    /// within a tokio runtime; outside one the request is logged and ignored.
    pub fn connect(&self) -> bool {
        let Some(runtime) = current_runtime() else {
            return false;
        };
        let Some(attempt) = self.claim_idle_link() else {
            return false;
        };

        self.spawn_attempt(&runtime, attempt);
        true
    }

    /// Move the link from `Idle` to `Connecting` and return the new attempt id.
    fn claim_idle_link(&self) -> Option<Uuid> {
        let mut link = lock(&self.inner.link);
        match *link {
            Link::Idle => {
                let attempt = Uuid::new_v4();
                *link = Link::Connecting { attempt };
                Some(attempt)
            }
            Link::Connecting { .. } | Link::Open { .. } => {
                debug!("Connect requested while a connection is open or opening");
                None
            }
            Link::Shutdown => {
                debug!("Connect requested after shutdown");
                None
            }
        }
    }

    fn spawn_attempt(&self, runtime: &RuntimeHandle, attempt: Uuid) {
        info!("Connecting to {} (attempt {attempt})", self.inner.endpoint);
        runtime.spawn(self.clone().run(attempt));
    }

    /// Serialize and transmit a message if the connection is open.
    ///
    /// Never fails loudly: returns `false` (and logs) when the channel is
    /// not open or the message cannot be encoded.
    pub fn send(&self, message: &OutboundMessage) -> bool {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} message: {e}", message.type_name());
                return false;
            }
        };

        let link = lock(&self.inner.link);
        let Link::Open { outgoing, .. } = &*link else {
            warn!(
                "Channel not open; dropping {} message",
                message.type_name()
            );
            return false;
        };

        trace!("Sending frame: {frame}");
        match outgoing.send(frame) {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    "Connection is closing; dropping {} message",
                    message.type_name()
                );
                false
            }
        }
    }

    /// Close the connection for good. No further reconnects are scheduled.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *lock(&self.inner.link), Link::Shutdown);
        if previous.attempt().is_some() {
            info!("Shutting down channel to {}", self.inner.endpoint);
        }
        // Dropping `previous` drops the outgoing sender, which closes the socket.
    }

    async fn run(self, attempt: Uuid) {
        let (code, reason) = match self.inner.connector.connect(&self.inner.endpoint).await {
            Ok(Connection { outgoing, mut incoming }) => {
                if self.handle_open(attempt, outgoing) {
                    self.pump(&mut incoming).await
                } else {
                    (NORMAL_CLOSURE, String::from("superseded"))
                }
            }
            Err(e) => {
                warn!("Transport error: {e}");
                (ABNORMAL_CLOSURE, String::new())
            }
        };

        self.handle_close(attempt, code, &reason).await;
    }

    fn handle_open(&self, attempt: Uuid, outgoing: UnboundedSender<String>) -> bool {
        {
            let mut link = lock(&self.inner.link);
            if link.attempt() != Some(attempt) {
                debug!("Ignoring open of superseded attempt {attempt}");
                return false;
            }
            *link = Link::Open { attempt, outgoing };
        }

        lock(&self.inner.retry).reset();
        info!("Connected to {}", self.inner.endpoint);

        self.inner.store.set_status(ConnectionStatus::Connected);
        self.inner.store.resync_mode();
        true
    }

    async fn pump(&self, incoming: &mut UnboundedReceiver<TransportEvent>) -> (u16, String) {
        while let Some(event) = incoming.recv().await {
            match event {
                TransportEvent::Text(frame) => self.handle_frame(&frame),
                TransportEvent::Binary(length) => {
                    warn!("Dropping {length}-byte binary frame; protocol is text-only");
                }
                TransportEvent::Error(message) => warn!("Transport error: {message}"),
                TransportEvent::Closed { code, reason } => return (code, reason),
            }
        }

        (ABNORMAL_CLOSURE, String::new())
    }

    fn handle_frame(&self, frame: &str) {
        trace!("Received frame: {frame}");
        match InboundMessage::decode(frame) {
            Ok(message) => {
                self.inner.router.dispatch(&message);
            }
            Err(e @ ModelError::Parse { .. }) => error!("Dropping malformed frame: {e}"),
            Err(e) => debug!("Ignoring unrecognized message: {e}"),
        }
    }

    async fn handle_close(&self, attempt: Uuid, code: u16, reason: &str) {
        let shut_down = {
            let mut link = lock(&self.inner.link);
            if matches!(*link, Link::Shutdown) {
                true
            } else if link.attempt() == Some(attempt) {
                *link = Link::Idle;
                false
            } else {
                debug!("Ignoring close of superseded attempt {attempt}");
                return;
            }
        };

        if reason.is_empty() {
            info!("Connection to {} closed (code {code})", self.inner.endpoint);
        } else {
            info!(
                "Connection to {} closed (code {code}: {reason})",
                self.inner.endpoint
            );
        }
        self.inner.store.set_status(ConnectionStatus::Disconnected);

        if shut_down {
            return;
        }

        let Some(delay) = lock(&self.inner.retry).next_delay() else {
            warn!("Retry policy exhausted; staying disconnected");
            return;
        };

        debug!("Reconnecting in {delay:?}");
        TokioSleep(delay).await;

        self.retry();
    }

    /// Fired by the retry timer. Skipped when something else already opened
    /// a connection (or shut the channel down) during the delay.
    fn retry(&self) {
        let Some(runtime) = current_runtime() else {
            return;
        };
        let Some(attempt) = self.claim_idle_link() else {
            debug!("Retry skipped; link is no longer idle");
            return;
        };

        self.inner.store.set_status(ConnectionStatus::Reconnecting);
        self.spawn_attempt(&runtime, attempt);
    }
}

fn current_runtime() -> Option<RuntimeHandle> {
    match RuntimeHandle::try_current() {
        Ok(runtime) => Some(runtime),
        Err(e) => {
            let error = ChannelError::Runtime {
                message: format!("connect() called outside a tokio runtime: {e}"),
                location: ErrorLocation::from(Location::caller()),
            };
            error!("{error}");
            None
        }
    }
}
