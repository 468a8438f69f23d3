use super::support::{accept, fake_context, settle};

use models::InteractionMode;

use std::time::Duration;

use serde_json::json;
use tokio::time::advance;

/// **VALUE**: Rapid view changes do not flood the backend with mode switches.
///
/// **BUG THIS CATCHES**: A throttle that compares against the wrong clock or
/// resets on every request would let both requests through.
#[tokio::test(start_paused = true)]
async fn given_open_channel_when_two_modes_requested_200ms_apart_then_only_first_sent() {
    // GIVEN: An open channel
    let (context, _connector, mut backends) = fake_context();
    context.start();
    let mut backend = accept(&mut backends).await;

    // WHEN: VOICE, then VISION 200 ms later
    let sync = context.mode_sync();
    assert!(sync.send_mode(InteractionMode::Voice, false));
    advance(Duration::from_millis(200)).await;
    assert!(!sync.send_mode(InteractionMode::Vision, false));

    // THEN: Only the VOICE request went out
    assert_eq!(backend.sent(), Some(json!({"type": "mode", "value": "VOICE"})));
    assert_eq!(backend.sent(), None);
}

#[tokio::test(start_paused = true)]
async fn given_window_elapsed_when_mode_requested_then_sent() {
    let (context, _connector, mut backends) = fake_context();
    context.start();
    let mut backend = accept(&mut backends).await;
    let sync = context.mode_sync();

    assert!(sync.send_mode(InteractionMode::Voice, false));
    advance(sync.window()).await;
    assert!(sync.send_mode(InteractionMode::Vision, false));

    assert_eq!(backend.sent(), Some(json!({"type": "mode", "value": "VOICE"})));
    assert_eq!(backend.sent(), Some(json!({"type": "mode", "value": "VISION"})));
}

#[tokio::test(start_paused = true)]
async fn given_recent_send_when_forced_then_throttle_bypassed() {
    let (context, _connector, mut backends) = fake_context();
    context.start();
    let mut backend = accept(&mut backends).await;
    let sync = context.mode_sync();

    assert!(sync.send_mode(InteractionMode::Voice, false));
    assert!(sync.send_mode(InteractionMode::Vision, true));

    assert_eq!(backend.sent(), Some(json!({"type": "mode", "value": "VOICE"})));
    assert_eq!(backend.sent(), Some(json!({"type": "mode", "value": "VISION"})));
}

/// **VALUE**: A request dropped because the channel was closed does not eat
/// the throttle window.
#[tokio::test(start_paused = true)]
async fn given_closed_channel_when_mode_requested_then_window_not_consumed() {
    // GIVEN: A request while nothing is connected
    let (context, _connector, mut backends) = fake_context();
    let sync = context.mode_sync();
    assert!(!sync.send_mode(InteractionMode::Voice, false));

    // WHEN: The channel opens right after and the request is repeated
    context.start();
    let mut backend = accept(&mut backends).await;
    let sent = sync.send_mode(InteractionMode::Voice, false);

    // THEN: It goes through immediately
    assert!(sent);
    assert_eq!(backend.sent(), Some(json!({"type": "mode", "value": "VOICE"})));
}

#[tokio::test(start_paused = true)]
async fn given_mode_none_when_requested_then_never_sent() {
    let (context, _connector, mut backends) = fake_context();
    context.start();
    let mut backend = accept(&mut backends).await;

    assert!(!context.mode_sync().send_mode(InteractionMode::None, true));

    settle().await;
    assert_eq!(backend.sent(), None);
}
