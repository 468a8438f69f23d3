//! Duplex frame transport underneath the channel.
//!
//! A [`Connector`] turns an endpoint into a [`Connection`]: an outgoing queue
//! of text frames and an incoming stream of [`TransportEvent`]s that always
//! ends with exactly one [`TransportEvent::Closed`] (or the sender being
//! dropped, which the channel treats as an abnormal closure).
//!
//! [`WebSocketConnector`] is the production implementation on top of
//! `tokio-tungstenite`. Keeping the channel on this narrow seam lets its
//! reconnect state machine run against in-memory connections in tests.

use crate::error::channel::ChannelError;

use common::ErrorLocation;

use std::panic::Location;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use tokio::spawn as TokioSpawn;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Close code reported when a close frame carried no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    /// A binary frame of the given length. The protocol is text-only.
    Binary(usize),
    /// Connection-level failure. Always followed by `Closed`.
    Error(String),
    Closed { code: u16, reason: String },
}

/// An open connection as seen by the channel.
pub struct Connection {
    pub outgoing: UnboundedSender<String>,
    pub incoming: UnboundedReceiver<TransportEvent>,
}

pub trait Connector: Send + Sync + 'static {
    /// Open a connection. Resolves once the connection is usable.
    fn connect(&self, endpoint: &Url) -> BoxFuture<'static, Result<Connection, ChannelError>>;
}

/// Connects with `tokio-tungstenite` and pumps frames through two tasks.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(&self, endpoint: &Url) -> BoxFuture<'static, Result<Connection, ChannelError>> {
        let endpoint = endpoint.to_string();

        Box::pin(async move {
            let (ws_stream, _response) = connect_async(endpoint.as_str()).await.map_err(|e| {
                ChannelError::Connect {
                    message: format!("WebSocket connect to {endpoint} failed: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

            let (mut write, mut read) = ws_stream.split();
            let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
            let (incoming_tx, incoming) = mpsc::unbounded_channel();

            // Writer: ends when the channel drops its sender.
            TokioSpawn(async move {
                while let Some(frame) = outgoing_rx.recv().await {
                    if let Err(e) = write.send(Message::text(frame)).await {
                        warn!("WebSocket write failed: {e}");
                        break;
                    }
                }
                if let Err(e) = write.close().await {
                    debug!("WebSocket close after writer shutdown failed: {e}");
                }
            });

            TokioSpawn(async move {
                let (code, reason) = read_until_closed(&mut read, &incoming_tx).await;
                trace!("WebSocket reader finished with code {code}");
                let _ = incoming_tx.send(TransportEvent::Closed { code, reason });
            });

            Ok(Connection { outgoing, incoming })
        })
    }
}

async fn read_until_closed<S>(
    read: &mut S,
    incoming: &UnboundedSender<TransportEvent>,
) -> (u16, String)
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let event = match message {
            Ok(Message::Text(text)) => TransportEvent::Text(text.to_string()),
            Ok(Message::Binary(data)) => TransportEvent::Binary(data.len()),
            Ok(Message::Close(Some(frame))) => {
                return (u16::from(frame.code), frame.reason.to_string());
            }
            Ok(Message::Close(None)) => return (NO_STATUS_RECEIVED, String::new()),
            // Ping/pong are answered by tungstenite itself.
            Ok(_) => continue,
            Err(e) => {
                let _ = incoming.send(TransportEvent::Error(e.to_string()));
                return (ABNORMAL_CLOSURE, String::new());
            }
        };

        if incoming.send(event).is_err() {
            // Channel stopped listening.
            break;
        }
    }

    (ABNORMAL_CLOSURE, String::new())
}
