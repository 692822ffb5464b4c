//! Reconnection delay policies.
//!
//! When a target's stream fails, the registry asks its policy how long
//! to wait before attempt `n`. The default is a fixed five-second delay
//! with no attempt cap; [`ExponentialBackoff`] and an optional cap are
//! available for deployments where an unreachable backend should not be
//! polled forever.

use std::fmt;
use std::time::Duration;

/// Decides the delay before each reconnect attempt.
pub trait ReconnectPolicy: Send + Sync + fmt::Debug {
    /// Delay before reconnect attempt `attempt` (1-based), or `None` to
    /// stop reconnecting.
    fn delay_for(&self, attempt: u32) -> Option<Duration>;
}

/// Same delay before every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelay {
    pub delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy for FixedDelay {
    fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if exceeds(attempt, self.max_attempts) {
            return None;
        }
        Some(self.delay)
    }
}

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if exceeds(attempt, self.max_attempts) {
            return None;
        }
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..attempt {
            if delay >= self.max_delay {
                break;
            }
            delay = next_delay(delay, self);
        }
        Some(delay)
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ExponentialBackoff::max_delay`].
pub fn next_delay(current: Duration, config: &ExponentialBackoff) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

fn exceeds(attempt: u32, max_attempts: Option<u32>) -> bool {
    max_attempts.is_some_and(|max| attempt > max)
}
