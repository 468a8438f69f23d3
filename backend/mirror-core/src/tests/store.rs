use crate::error::store::StoreError;
use crate::store::{ModeSink, Store};

use models::{ConnectionStatus, InteractionMode, StateSnapshot, VoiceState};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

#[derive(Default)]
struct RecordingSink {
    requests: Mutex<Vec<(InteractionMode, bool)>>,
}

impl ModeSink for RecordingSink {
    fn send_mode(&self, mode: InteractionMode, force: bool) -> bool {
        self.requests.lock().unwrap().push((mode, force));
        true
    }
}

fn store_with_sink() -> (Store, Arc<RecordingSink>) {
    let store = Store::new();
    let sink = Arc::new(RecordingSink::default());
    let weak = Arc::downgrade(&sink);
    let weak: Weak<dyn ModeSink> = weak;
    store.bind_mode_sink(weak);
    (store, sink)
}

fn counting_subscriber(store: &Store) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let _subscription = store.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    calls
}

#[test]
fn given_new_store_when_snapshot_taken_then_defaults_apply() {
    let store = Store::new();

    assert_eq!(
        store.snapshot(),
        StateSnapshot {
            status: ConnectionStatus::Disconnected,
            mode: InteractionMode::None,
            voice_state: VoiceState::Idle,
        }
    );
}

/// **VALUE**: Every field change notifies each subscriber exactly once.
///
/// **BUG THIS CATCHES**: Setters that notify unconditionally would re-render
/// the UI on every backend echo of an unchanged state.
#[test]
fn given_subscriber_when_fields_change_then_notified_once_per_change() {
    // GIVEN: A subscriber (the replay counts as the first call)
    let store = Store::new();
    let calls = counting_subscriber(&store);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "Replay on subscribe");

    // WHEN: Each field changes once
    assert!(store.set_status(ConnectionStatus::Connected));
    assert!(store.set_mode(InteractionMode::Voice));
    assert!(store.set_voice_state(VoiceState::Listening));

    // THEN: One notification per change
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn given_equal_value_when_set_then_no_notification() {
    let store = Store::new();
    store.set_mode(InteractionMode::Vision);
    let calls = counting_subscriber(&store);

    assert!(!store.set_mode(InteractionMode::Vision));
    assert!(!store.set_status(ConnectionStatus::Disconnected));
    assert!(!store.set_voice_state(VoiceState::Idle));

    assert_eq!(calls.load(Ordering::SeqCst), 1, "Only the replay");
}

/// **VALUE**: A subscriber registered late still sees the current truth.
///
/// **BUG THIS CATCHES**: A view mounted after the connection opened would
/// show DISCONNECTED until the next change.
#[test]
fn given_state_already_changed_when_late_subscriber_added_then_receives_current_snapshot() {
    // GIVEN: State that changed before anyone subscribed
    let store = Store::new();
    store.set_status(ConnectionStatus::Connected);
    store.set_voice_state(VoiceState::Playing);

    // WHEN: Subscribing
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = store.subscribe(move |snapshot| sink.lock().unwrap().push(*snapshot));

    // THEN: The current snapshot is delivered immediately
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].status, ConnectionStatus::Connected);
    assert_eq!(seen[0].voice_state, VoiceState::Playing);
}

#[test]
fn given_unsubscribed_when_state_changes_then_not_notified() {
    let store = Store::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let subscription = store.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(subscription.unsubscribe());
    store.set_mode(InteractionMode::Voice);

    assert_eq!(calls.load(Ordering::SeqCst), 1, "Only the replay");
}

#[test]
fn given_subscriber_when_notified_then_receives_full_snapshot() {
    let store = Store::new();
    store.set_status(ConnectionStatus::Connected);
    let last = Arc::new(Mutex::new(StateSnapshot::default()));
    let sink = Arc::clone(&last);
    let _subscription = store.subscribe(move |snapshot| *sink.lock().unwrap() = *snapshot);

    store.set_voice_state(VoiceState::Waiting);

    let last = *last.lock().unwrap();
    assert_eq!(last.status, ConnectionStatus::Connected, "Unchanged fields included");
    assert_eq!(last.voice_state, VoiceState::Waiting);
}

/// **VALUE**: A subscriber may call a setter, and every subscriber still ends
/// on the latest snapshot.
///
/// **BUG THIS CATCHES**: Delivering the nested change before the outer one
/// finishes would leave later subscribers holding the older snapshot.
#[test]
fn given_subscriber_calling_setter_when_notified_then_all_subscribers_end_on_latest() {
    // GIVEN: Subscriber A resets the voice state whenever it sees REQUESTED,
    // and subscriber B records everything it sees
    let store = Store::new();
    let inner = store.clone();
    let _resetter = store.subscribe(move |snapshot| {
        if snapshot.voice_state == VoiceState::Requested {
            inner.set_voice_state(VoiceState::Idle);
        }
    });
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _recorder = store.subscribe(move |snapshot| sink.lock().unwrap().push(snapshot.voice_state));

    // WHEN: The voice state changes
    store.set_voice_state(VoiceState::Requested);

    // THEN: The nested change won and B saw both changes in order
    assert_eq!(store.voice_state(), VoiceState::Idle);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![VoiceState::Idle, VoiceState::Requested, VoiceState::Idle]
    );
}

#[test]
fn given_subscriber_added_during_delivery_when_replayed_then_sees_no_older_snapshot() {
    let store = Store::new();
    let late_seen = Arc::new(Mutex::new(Vec::new()));

    let inner = store.clone();
    let sink = Arc::clone(&late_seen);
    let _adder = store.subscribe(move |snapshot| {
        if snapshot.status == ConnectionStatus::Connected {
            let sink = Arc::clone(&sink);
            let _late = inner.subscribe(move |snapshot| sink.lock().unwrap().push(snapshot.status));
        }
    });

    store.set_status(ConnectionStatus::Connected);

    assert_eq!(*late_seen.lock().unwrap(), vec![ConnectionStatus::Connected]);
}

#[test]
fn given_setters_on_many_threads_when_all_done_then_subscriber_holds_final_snapshot() {
    // GIVEN: A subscriber remembering the last snapshot it was given
    let store = Store::new();
    let last = Arc::new(Mutex::new(StateSnapshot::default()));
    let sink = Arc::clone(&last);
    let _subscription = store.subscribe(move |snapshot| *sink.lock().unwrap() = *snapshot);

    // WHEN: Several threads race through voice states and modes
    let states = [
        VoiceState::Requested,
        VoiceState::Listening,
        VoiceState::Waiting,
        VoiceState::Playing,
        VoiceState::Idle,
    ];
    let modes = [InteractionMode::Vision, InteractionMode::Voice, InteractionMode::None];
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let store = store.clone();
            std::thread::spawn(move || {
                for step in 0..200 {
                    store.set_voice_state(states[(worker + step) % states.len()]);
                    store.set_mode(modes[(worker * 7 + step) % modes.len()]);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // THEN: The subscriber is not left behind the store
    assert_eq!(*last.lock().unwrap(), store.snapshot());
}

#[test]
fn given_voice_view_when_shown_then_mode_set_and_synced_unforced() {
    let (store, sink) = store_with_sink();

    let mode = store.show_view("voice").unwrap();

    assert_eq!(mode, InteractionMode::Voice);
    assert_eq!(store.mode(), InteractionMode::Voice);
    assert_eq!(
        *sink.requests.lock().unwrap(),
        vec![(InteractionMode::Voice, false)]
    );
}

#[test]
fn given_view_names_in_any_case_when_shown_then_mapped_to_modes() {
    let (store, _sink) = store_with_sink();

    assert_eq!(store.show_view("VISION").unwrap(), InteractionMode::Vision);
    assert_eq!(store.show_view("Home").unwrap(), InteractionMode::None);
    assert_eq!(store.show_view("menu").unwrap(), InteractionMode::None);
    assert_eq!(store.show_view("none").unwrap(), InteractionMode::None);
}

/// **VALUE**: Going home never asks the backend to switch to NONE.
#[test]
fn given_active_mode_when_home_shown_then_mode_cleared_without_sync() {
    let (store, sink) = store_with_sink();
    store.set_mode(InteractionMode::Vision);

    store.show_view("home").unwrap();

    assert_eq!(store.mode(), InteractionMode::None);
    assert!(sink.requests.lock().unwrap().is_empty());
}

#[test]
fn given_unknown_view_when_shown_then_error_and_state_untouched() {
    let (store, sink) = store_with_sink();
    store.set_mode(InteractionMode::Voice);
    let before = store.snapshot();

    let result = store.show_view("settings");

    assert!(matches!(result, Err(StoreError::UnknownView { .. })));
    assert_eq!(store.snapshot(), before);
    assert!(sink.requests.lock().unwrap().is_empty());
}

#[test]
fn given_connection_state_when_view_shown_then_status_and_voice_untouched() {
    let (store, _sink) = store_with_sink();
    store.set_status(ConnectionStatus::Reconnecting);
    store.set_voice_state(VoiceState::Listening);

    store.show_view("vision").unwrap();

    assert_eq!(store.status(), ConnectionStatus::Reconnecting);
    assert_eq!(store.voice_state(), VoiceState::Listening);
}

#[test]
fn given_active_mode_when_resynced_then_forced_request_sent() {
    let (store, sink) = store_with_sink();
    store.set_mode(InteractionMode::Vision);

    assert!(store.resync_mode());

    assert_eq!(
        *sink.requests.lock().unwrap(),
        vec![(InteractionMode::Vision, true)]
    );
}

#[test]
fn given_mode_none_when_resynced_then_nothing_sent() {
    let (store, sink) = store_with_sink();

    assert!(!store.resync_mode());
    assert!(sink.requests.lock().unwrap().is_empty());
}

#[test]
fn given_no_sink_bound_when_view_shown_then_mode_still_changes() {
    let store = Store::new();

    store.show_view("voice").unwrap();

    assert_eq!(store.mode(), InteractionMode::Voice);
}

#[test]
fn given_sink_dropped_when_resynced_then_reports_not_sent() {
    let (store, sink) = store_with_sink();
    store.set_mode(InteractionMode::Voice);
    drop(sink);

    assert!(!store.resync_mode());
}
