//! In-memory transport for driving the channel state machine in tests.

use crate::config::ClientConfig;
use crate::context::MirrorContext;
use crate::error::channel::ChannelError;
use crate::transport::{Connection, Connector, TransportEvent};

use common::ErrorLocation;
use models::StateSnapshot;

use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use url::Url;

/// The backend's end of one accepted fake connection.
pub(crate) struct FakeBackend {
    pub frames: UnboundedReceiver<String>,
    pub events: UnboundedSender<TransportEvent>,
}

impl FakeBackend {
    pub fn push(&self, frame: &str) {
        self.events
            .send(TransportEvent::Text(frame.to_string()))
            .expect("channel should be listening");
    }

    pub fn close(&self, code: u16) {
        self.events
            .send(TransportEvent::Closed {
                code,
                reason: String::new(),
            })
            .expect("channel should be listening");
    }

    /// Next frame the client sent, if any is queued.
    pub fn sent(&mut self) -> Option<serde_json::Value> {
        self.frames
            .try_recv()
            .ok()
            .map(|frame| serde_json::from_str(&frame).expect("client sends JSON"))
    }
}

pub(crate) struct FakeConnector {
    accepted: UnboundedSender<FakeBackend>,
    attempts: AtomicUsize,
    refuse: AtomicBool,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<FakeBackend>) {
        let (accepted, backends) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            accepted,
            attempts: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
        });
        (connector, backends)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl Connector for FakeConnector {
    fn connect(&self, _endpoint: &Url) -> BoxFuture<'static, Result<Connection, ChannelError>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.refuse.load(Ordering::SeqCst) {
            return Box::pin(async {
                Err(ChannelError::Connect {
                    message: String::from("connection refused"),
                    location: ErrorLocation::from(Location::caller()),
                })
            });
        }

        let (outgoing, frames) = mpsc::unbounded_channel();
        let (events, incoming) = mpsc::unbounded_channel();
        let _ = self.accepted.send(FakeBackend { frames, events });

        Box::pin(async move { Ok(Connection { outgoing, incoming }) })
    }
}

pub(crate) fn test_config() -> ClientConfig {
    ClientConfig {
        endpoint: String::from("ws://127.0.0.1:8765"),
        ..ClientConfig::default()
    }
}

pub(crate) fn fake_context() -> (
    MirrorContext,
    Arc<FakeConnector>,
    UnboundedReceiver<FakeBackend>,
) {
    let (connector, backends) = FakeConnector::new();
    let context = MirrorContext::with_connector(&test_config(), connector.clone())
        .expect("test config is valid");
    (context, connector, backends)
}

/// Every snapshot a subscriber saw, with the (virtual) time it arrived.
pub(crate) type History = Arc<Mutex<Vec<(Instant, StateSnapshot)>>>;

pub(crate) fn record(context: &MirrorContext) -> History {
    let history: History = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&history);
    let _subscription = context.store().subscribe(move |snapshot| {
        sink.lock().expect("history lock").push((Instant::now(), *snapshot));
    });
    history
}

/// Let spawned channel tasks run until they block again.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub(crate) async fn accept(backends: &mut UnboundedReceiver<FakeBackend>) -> FakeBackend {
    let backend = backends.recv().await.expect("connector still alive");
    settle().await;
    backend
}
