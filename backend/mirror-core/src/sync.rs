//! Rate-limited outbound mode changes.
//!
//! Non-forced requests closer than the throttle window to the last
//! *delivered* request are dropped. A request the channel refused (because it
//! was not open) does not count, so the first attempt after a reconnect is
//! never throttled away. Forced requests, issued once per successful
//! connection, always go through.

use crate::channel::Channel;
use crate::lock;
use crate::store::ModeSink;

use models::{InteractionMode, OutboundMessage};

use std::sync::Mutex;
use std::time::Duration;

use log::{debug, info};
use tokio::time::Instant;

pub struct ModeSync {
    channel: Channel,
    window: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl ModeSync {
    pub fn new(channel: Channel, window: Duration) -> Self {
        Self {
            channel,
            window,
            last_sent: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Ask the backend to switch to `mode`.
    ///
    /// Returns `true` only if the request was handed to an open channel.
    pub fn send_mode(&self, mode: InteractionMode, force: bool) -> bool {
        let message = match OutboundMessage::mode(mode) {
            Ok(message) => message,
            Err(e) => {
                debug!("Not syncing mode: {e}");
                return false;
            }
        };

        let mut last_sent = lock(&self.last_sent);

        if !force {
            if let Some(sent_at) = *last_sent {
                let elapsed = sent_at.elapsed();
                if elapsed < self.window {
                    debug!(
                        "Throttled mode sync to {mode}: {elapsed:?} since last send, window {:?}",
                        self.window
                    );
                    return false;
                }
            }
        }

        if !self.channel.send(&message) {
            return false;
        }

        *last_sent = Some(Instant::now());
        info!(
            "Mode sync sent: {mode}{}",
            if force { " (forced)" } else { "" }
        );
        true
    }
}

impl ModeSink for ModeSync {
    fn send_mode(&self, mode: InteractionMode, force: bool) -> bool {
        ModeSync::send_mode(self, mode, force)
    }
}
