//! Single source of truth for the mirrored state.
//!
//! Holds connection status, interaction mode and voice sub-state. A setter
//! only notifies when its field actually changes, and every subscriber gets
//! the full [`StateSnapshot`], not a diff. New subscribers are replayed the
//! current snapshot immediately so they never miss the current truth.
//!
//! # Delivery order
//!
//! Subscribers run after the state lock is released, so a subscriber may
//! call a setter. Every change is queued under the state lock and delivered
//! by a single drainer in the order the changes happened. A change made from
//! inside a subscriber (or from another thread while a delivery is running)
//! is delivered after the current round finishes, so each subscriber sees
//! snapshots in order and always ends on the latest one.

use crate::error::store::StoreError;
use crate::lock;

use models::{ConnectionStatus, InteractionMode, StateSnapshot, VoiceState};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use log::{debug, info, trace, warn};

pub type Subscriber = Arc<dyn Fn(&StateSnapshot) + Send + Sync>;

/// Receiver of outbound mode-sync requests triggered by the store.
///
/// Implemented by [`ModeSync`](crate::sync::ModeSync). The store only holds
/// it weakly; the context owns it.
pub trait ModeSink: Send + Sync {
    /// Returns `true` if the request reached the backend.
    fn send_mode(&self, mode: InteractionMode, force: bool) -> bool;
}

/// Cheap-to-clone handle to the shared store.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    state: Mutex<StateSnapshot>,
    subscribers: Mutex<Vec<(u64, Subscriber)>>,
    next_subscriber_id: AtomicU64,
    deliveries: Mutex<Deliveries>,
    mode_sink: OnceLock<Weak<dyn ModeSink>>,
}

#[derive(Default)]
struct Deliveries {
    queue: VecDeque<Delivery>,
    draining: bool,
}

struct Delivery {
    snapshot: StateSnapshot,
    audience: Audience,
}

enum Audience {
    /// Subscribers registered before the change (ids below the bound).
    RegisteredBefore(u64),
    /// The replay for one new subscriber.
    Only(u64),
}

impl Audience {
    fn includes(&self, id: u64) -> bool {
        match *self {
            Audience::RegisteredBefore(bound) => id < bound,
            Audience::Only(target) => id == target,
        }
    }
}

/// Releases the drainer role when a subscriber panics mid-delivery.
struct DrainGuard<'a> {
    deliveries: &'a Mutex<Deliveries>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(self.deliveries).draining = false;
        }
    }
}

/// Returned by [`Store::subscribe`]. Dropping it keeps the subscription alive.
#[derive(Debug)]
#[must_use = "keep the Subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    store: Weak<StoreInner>,
}

impl Subscription {
    /// Stop receiving notifications. Returns `false` if already removed.
    pub fn unsubscribe(self) -> bool {
        let Some(store) = self.store.upgrade() else {
            return false;
        };
        let mut subscribers = lock(&store.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != self.id);
        before != subscribers.len()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect the store to the outbound mode sync. Only the first binding counts.
    pub fn bind_mode_sink(&self, sink: Weak<dyn ModeSink>) {
        if self.inner.mode_sink.set(sink).is_err() {
            warn!("Mode sink already bound; ignoring second binding");
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        *lock(&self.inner.state)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.snapshot().status
    }

    pub fn mode(&self) -> InteractionMode {
        self.snapshot().mode
    }

    pub fn voice_state(&self) -> VoiceState {
        self.snapshot().voice_state
    }

    /// Register a subscriber and replay the current snapshot to it.
    ///
    /// The replay is immediate unless a delivery round is already running,
    /// in which case it follows that round.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StateSnapshot) + Send + Sync + 'static,
    {
        let callback: Subscriber = Arc::new(callback);

        let id = {
            let state = lock(&self.inner.state);
            let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
            lock(&self.inner.subscribers).push((id, callback));
            self.enqueue(*state, Audience::Only(id));
            id
        };
        self.drain();

        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Only called from channel lifecycle events.
    pub fn set_status(&self, status: ConnectionStatus) -> bool {
        self.transition(|state| match replace_if_changed(&mut state.status, status) {
            Some(old) => {
                info!("Connection status: {old} -> {status}");
                true
            }
            None => false,
        })
    }

    pub fn set_mode(&self, mode: InteractionMode) -> bool {
        self.transition(|state| match replace_if_changed(&mut state.mode, mode) {
            Some(old) => {
                info!("Interaction mode: {old} -> {mode}");
                true
            }
            None => false,
        })
    }

    /// Only called for backend-originated state (and backend errors).
    pub fn set_voice_state(&self, voice_state: VoiceState) -> bool {
        self.transition(|state| match replace_if_changed(&mut state.voice_state, voice_state) {
            Some(old) => {
                debug!("Voice state: {old} -> {voice_state}");
                true
            }
            None => false,
        })
    }

    /// Switch the UI to a named view.
    ///
    /// Sets the mode the view implies and, unless that mode is `NONE`, asks
    /// the backend to switch too (throttled). Status and voice state are
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownView`] for names that map to no view;
    /// nothing changes in that case.
    pub fn show_view(&self, name: &str) -> Result<InteractionMode, StoreError> {
        let mode = InteractionMode::from_view(name)?;

        self.set_mode(mode);
        if mode.is_active() {
            self.sync_mode(mode, false);
        }

        Ok(mode)
    }

    /// Re-assert the current mode with the backend, bypassing the throttle.
    ///
    /// Called once per successful (re)connection so a backend that lost its
    /// state is brought back in line. No-op while the mode is `NONE`.
    pub fn resync_mode(&self) -> bool {
        let mode = self.mode();
        if !mode.is_active() {
            return false;
        }
        debug!("Re-asserting mode {mode} after connect");
        self.sync_mode(mode, true)
    }

    fn sync_mode(&self, mode: InteractionMode, force: bool) -> bool {
        match self.inner.mode_sink.get().and_then(Weak::upgrade) {
            Some(sink) => sink.send_mode(mode, force),
            None => {
                debug!("No mode sink bound; mode {mode} stays local");
                false
            }
        }
    }

    fn transition(&self, update: impl FnOnce(&mut StateSnapshot) -> bool) -> bool {
        {
            let mut state = lock(&self.inner.state);
            if !update(&mut state) {
                return false;
            }
            let bound = self.inner.next_subscriber_id.load(Ordering::SeqCst);
            self.enqueue(*state, Audience::RegisteredBefore(bound));
        }

        self.drain();
        true
    }

    /// Called with the state lock held, so queue order is change order.
    fn enqueue(&self, snapshot: StateSnapshot, audience: Audience) {
        lock(&self.inner.deliveries)
            .queue
            .push_back(Delivery { snapshot, audience });
    }

    fn drain(&self) {
        {
            let mut deliveries = lock(&self.inner.deliveries);
            if deliveries.draining {
                trace!("Delivery in progress; change queued behind it");
                return;
            }
            deliveries.draining = true;
        }
        let _guard = DrainGuard {
            deliveries: &self.inner.deliveries,
        };

        loop {
            // Popping and releasing the drainer role happen under one lock.
            let delivery = {
                let mut deliveries = lock(&self.inner.deliveries);
                match deliveries.queue.pop_front() {
                    Some(delivery) => delivery,
                    None => {
                        deliveries.draining = false;
                        return;
                    }
                }
            };

            let subscribers: Vec<Subscriber> = lock(&self.inner.subscribers)
                .iter()
                .filter(|(id, _)| delivery.audience.includes(*id))
                .map(|(_, subscriber)| Arc::clone(subscriber))
                .collect();

            for subscriber in subscribers {
                subscriber(&delivery.snapshot);
            }
        }
    }
}

fn replace_if_changed<T: PartialEq + Copy>(slot: &mut T, value: T) -> Option<T> {
    if *slot == value {
        return None;
    }
    let old = *slot;
    *slot = value;
    Some(old)
}
