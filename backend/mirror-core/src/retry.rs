//! Reconnect pacing as a swappable value object.
//!
//! The channel only asks "how long until the next attempt?" and "we connected,
//! start over". Whatever answers lives behind [`backoff::backoff::Backoff`], so
//! the fixed default can be replaced with exponential growth without touching
//! channel logic.

use std::fmt::{Debug, Formatter, Result as FormatResult};
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::{Backoff, Constant};

pub struct RetryPolicy {
    backoff: Box<dyn Backoff + Send>,
    description: String,
}

impl RetryPolicy {
    /// Retry forever at the same interval.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            backoff: Box::new(Constant::new(delay)),
            description: format!("fixed {delay:?}"),
        }
    }

    pub fn exponential(backoff: ExponentialBackoff) -> Self {
        let description = format!(
            "exponential from {:?}, max elapsed {:?}",
            backoff.initial_interval, backoff.max_elapsed_time
        );
        Self {
            backoff: Box::new(backoff),
            description,
        }
    }

    pub fn from_backoff<B>(backoff: B, description: impl Into<String>) -> Self
    where
        B: Backoff + Send + 'static,
    {
        Self {
            backoff: Box::new(backoff),
            description: description.into(),
        }
    }

    /// Delay before the next attempt, or `None` if the policy gave up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.backoff.next_backoff()
    }

    /// Called after every successful connection.
    pub fn reset(&mut self) {
        self.backoff.reset();
    }
}

impl Debug for RetryPolicy {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter
            .debug_struct("RetryPolicy")
            .field("policy", &self.description)
            .finish()
    }
}
