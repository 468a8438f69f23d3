//! State synchronization and transport layer of the hologram client.
//!
//! Keeps a live mirror of backend-reported state and exposes it to
//! presentation adapters:
//!
//! - [`channel::Channel`] - the single reconnecting WebSocket connection
//! - [`router::Router`] - two-tier (`type`, then `action`) message dispatch
//! - [`store::Store`] - the source of truth for status, mode and voice state
//! - [`sync::ModeSync`] - throttled outbound mode requests
//! - [`context::MirrorContext`] - constructs and wires all of the above once
//!
//! The backend is the only authority for mode and voice state. Nothing here
//! guesses: every transition is either a transport lifecycle event or a
//! backend message.

pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod retry;
pub mod router;
pub mod store;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod tests;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const BACKEND_HOSTNAME: &str = "localhost";
pub const BACKEND_PORT: u16 = 8765;
pub const DEFAULT_ENDPOINT: &str =
    const_format::concatcp!("ws://", BACKEND_HOSTNAME, ":", BACKEND_PORT);

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);
pub const DEFAULT_MODE_THROTTLE: Duration = Duration::from_millis(1000);

/// Lock a std mutex, recovering the data if a callback panicked while holding it.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
