use crate::mirror_tests::helpers::{
    client_config, expect_silence, next_client, next_json, send_frame, start_backend, wait_until,
};

use mirror_core::context::MirrorContext;
use models::{ConnectionStatus, InteractionMode, VoiceControl, VoiceState};

use std::time::Duration;

use serde_json::json;

/// **VALUE**: Verifies the client re-asserts its mode on a real WebSocket as soon as it connects.
///
/// **WHY THIS MATTERS**: The backend starts in its own default mode. If the client does not
/// tell it which view is up, camera or microphone pipelines stay off until the user navigates.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The forced sync is sent before the connection is open (and dropped)
/// - The frame shape drifts from `{"type":"mode","value":"VISION"}`
#[tokio::test]
async fn given_vision_view_when_client_connects_then_backend_receives_mode() {
    // GIVEN: A backend and a client already showing the vision view
    let (endpoint, mut accepted) = start_backend().await;
    let context = MirrorContext::new(&client_config(&endpoint)).expect("Valid config");
    context.store().set_mode(InteractionMode::Vision);

    // WHEN: The client starts
    context.start();
    let mut ws = next_client(&mut accepted).await;

    // THEN: The first frame is the mode request
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "mode", "value": "VISION"})
    );
    wait_until("connected status", || {
        context.store().status() == ConnectionStatus::Connected
    })
    .await;

    context.shutdown();
}

#[tokio::test]
async fn given_home_view_when_client_connects_then_backend_receives_nothing() {
    let (endpoint, mut accepted) = start_backend().await;
    let context = MirrorContext::new(&client_config(&endpoint)).expect("Valid config");

    context.start();
    let mut ws = next_client(&mut accepted).await;

    expect_silence(&mut ws, Duration::from_millis(200)).await;
    context.shutdown();
}

#[tokio::test]
async fn given_backend_state_frames_when_received_then_store_mirrors_them() {
    let (endpoint, mut accepted) = start_backend().await;
    let context = MirrorContext::new(&client_config(&endpoint)).expect("Valid config");
    context.start();
    let mut ws = next_client(&mut accepted).await;

    send_frame(&mut ws, r#"{"type":"state","value":"LISTENING"}"#).await;
    wait_until("LISTENING", || {
        context.store().voice_state() == VoiceState::Listening
    })
    .await;

    send_frame(&mut ws, r#"{"type":"error","message":"no microphone"}"#).await;
    wait_until("IDLE after error", || {
        context.store().voice_state() == VoiceState::Idle
    })
    .await;

    context.shutdown();
}

/// **VALUE**: Verifies a malformed frame from a real socket is dropped without closing it.
///
/// **BUG THIS CATCHES**: Would catch if a decode error propagated out of the read loop and
/// tore the connection down, forcing a reconnect on every bad frame.
#[tokio::test]
async fn given_malformed_frame_when_received_then_connection_survives() {
    let (endpoint, mut accepted) = start_backend().await;
    let context = MirrorContext::new(&client_config(&endpoint)).expect("Valid config");
    context.start();
    let mut ws = next_client(&mut accepted).await;

    send_frame(&mut ws, "{{{ definitely not json").await;
    send_frame(&mut ws, r#"{"type":"state","value":"PLAYING"}"#).await;

    wait_until("PLAYING", || {
        context.store().voice_state() == VoiceState::Playing
    })
    .await;
    assert!(context.channel().is_open());
    context.shutdown();
}

/// **VALUE**: Verifies the client recovers from a dropped connection and restores backend mode.
///
/// **WHY THIS MATTERS**: The backend restarts independently of the display. After it comes back
/// the mirror must reconnect on its own and put the backend back into the mode on screen.
#[tokio::test]
async fn given_connection_dropped_when_retry_fires_then_reconnects_and_reasserts_mode() {
    // GIVEN: A connected client in voice mode
    let (endpoint, mut accepted) = start_backend().await;
    let context = MirrorContext::new(&client_config(&endpoint)).expect("Valid config");
    context.store().set_mode(InteractionMode::Voice);
    context.start();
    let mut first = next_client(&mut accepted).await;
    assert_eq!(
        next_json(&mut first).await,
        json!({"type": "mode", "value": "VOICE"})
    );

    // WHEN: The backend drops the socket without a close handshake
    drop(first);

    // THEN: The client reconnects and sends its mode again
    let mut second = next_client(&mut accepted).await;
    assert_eq!(
        next_json(&mut second).await,
        json!({"type": "mode", "value": "VOICE"})
    );
    wait_until("reconnected status", || {
        context.store().status() == ConnectionStatus::Connected
    })
    .await;

    context.shutdown();
}

#[tokio::test]
async fn given_backend_closes_cleanly_when_handled_then_client_reconnects() {
    let (endpoint, mut accepted) = start_backend().await;
    let context = MirrorContext::new(&client_config(&endpoint)).expect("Valid config");
    context.start();
    let mut first = next_client(&mut accepted).await;

    first.close(None).await.expect("Failed to close");

    let _second = next_client(&mut accepted).await;
    wait_until("reconnected status", || {
        context.store().status() == ConnectionStatus::Connected
    })
    .await;
    context.shutdown();
}

#[tokio::test]
async fn given_open_connection_when_voice_control_sent_then_backend_receives_it() {
    let (endpoint, mut accepted) = start_backend().await;
    let context = MirrorContext::new(&client_config(&endpoint)).expect("Valid config");
    context.start();
    let mut ws = next_client(&mut accepted).await;
    wait_until("open channel", || context.channel().is_open()).await;

    assert!(context.send_voice_control(VoiceControl::Start));

    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "voice_control", "action": "start"})
    );
    context.shutdown();
}

#[tokio::test]
async fn given_no_backend_when_started_then_stays_disconnected_and_keeps_trying() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        listener.local_addr().expect("Has address").port()
    };
    let context = MirrorContext::new(&client_config(&format!("ws://127.0.0.1:{port}")))
        .expect("Valid config");

    context.start();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_ne!(context.store().status(), ConnectionStatus::Connected);
    assert!(!context.channel().is_open());
    context.shutdown();
}
