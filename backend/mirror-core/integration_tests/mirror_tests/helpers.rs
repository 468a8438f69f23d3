//! Test helpers for mirror integration tests.
//!
//! This module stands up a real WebSocket backend on an ephemeral port:
//! - Accepting connections from the client under test
//! - Sending frames to the client
//! - Reading frames the client sent, with a timeout

use mirror_core::config::ClientConfig;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

pub type BackendSocket = WebSocketStream<TcpStream>;

/// How long any single wait in these tests may take before failing.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Reconnect delay used by the client under test.
pub const TEST_RECONNECT_DELAY_MS: u64 = 50;

/// Test helper: Start a WebSocket backend and return its URL plus accepted sockets.
pub async fn start_backend() -> (String, UnboundedReceiver<BackendSocket>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test backend");
    let port = listener
        .local_addr()
        .expect("Bound listener has an address")
        .port();
    let (accepted_tx, accepted) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            match accept_async(stream).await {
                Ok(ws) => {
                    if accepted_tx.send(ws).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("Test backend handshake failed: {e}"),
            }
        }
    });

    (format!("ws://127.0.0.1:{port}"), accepted)
}

/// Test helper: Client config pointing at the test backend with a short retry delay.
pub fn client_config(endpoint: &str) -> ClientConfig {
    ClientConfig {
        endpoint: endpoint.to_string(),
        reconnect_delay_ms: TEST_RECONNECT_DELAY_MS,
        ..ClientConfig::default()
    }
}

/// Test helper: Wait for the next accepted client connection.
pub async fn next_client(accepted: &mut UnboundedReceiver<BackendSocket>) -> BackendSocket {
    timeout(TEST_TIMEOUT, accepted.recv())
        .await
        .expect("Client did not connect in time")
        .expect("Test backend stopped accepting")
}

/// Test helper: Send a JSON text frame to the client.
pub async fn send_frame(ws: &mut BackendSocket, frame: &str) {
    ws.send(Message::text(frame.to_string()))
        .await
        .expect("Failed to send frame");
}

/// Test helper: Receive the next text frame from the client, parsed as JSON.
pub async fn next_json(ws: &mut BackendSocket) -> serde_json::Value {
    loop {
        let message = timeout(TEST_TIMEOUT, ws.next())
            .await
            .expect("No frame received in time")
            .expect("Client closed the connection")
            .expect("Error receiving frame");

        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("Client sent invalid JSON");
        }
    }
}

/// Test helper: Assert the client sends nothing for a short while.
pub async fn expect_silence(ws: &mut BackendSocket, period: Duration) {
    if let Ok(Some(Ok(Message::Text(text)))) = timeout(period, ws.next()).await {
        panic!("Expected no frames, got {text}");
    }
}

/// Test helper: Poll `condition` until it holds or the test timeout elapses.
pub async fn wait_until(description: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + TEST_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "Timed out waiting for {description}");
        sleep(Duration::from_millis(10)).await;
    }
}
