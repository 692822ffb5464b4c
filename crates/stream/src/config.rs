use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::reconnect::{ExponentialBackoff, FixedDelay, ReconnectPolicy};

/// Default heartbeat watchdog: 1.5x the server's 30-second heartbeat.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(45);

/// Connection registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// API base URL; target streams live at `{base_url}/notifications/{target}/stream`.
    pub base_url: String,
    /// Delay policy between reconnect attempts.
    pub reconnect: Arc<dyn ReconnectPolicy>,
    /// A connection with no system frame for this long is considered dead.
    pub heartbeat_timeout: Duration,
}

impl RegistryConfig {
    /// Defaults: fixed 5-second reconnect delay, unbounded, 45-second
    /// heartbeat timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            reconnect: Arc::new(FixedDelay::default()),
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        }
    }

    pub fn with_reconnect(mut self, policy: impl ReconnectPolicy + 'static) -> Self {
        self.reconnect = Arc::new(policy);
        self
    }

    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Load tuning from environment variables with defaults.
    ///
    /// | Env Var                          | Default  |
    /// |----------------------------------|----------|
    /// | `BRIGADE_RECONNECT_DELAY_SECS`   | `5`      |
    /// | `BRIGADE_RECONNECT_MAX_ATTEMPTS` | unset    |
    /// | `BRIGADE_RECONNECT_BACKOFF`      | `fixed`  |
    /// | `BRIGADE_HEARTBEAT_TIMEOUT_SECS` | `45`     |
    ///
    /// With `BRIGADE_RECONNECT_BACKOFF=exponential` the delay variable is
    /// the initial delay, doubling up to 60 seconds.
    pub fn from_env(base_url: impl Into<String>) -> Self {
        Self::from_lookup(base_url, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(base_url: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let delay_secs: u64 = parse_or(&lookup, "BRIGADE_RECONNECT_DELAY_SECS", 5);
        let max_attempts: Option<u32> = lookup("BRIGADE_RECONNECT_MAX_ATTEMPTS")
            .and_then(|raw| parse_value("BRIGADE_RECONNECT_MAX_ATTEMPTS", &raw));
        let heartbeat_secs: u64 = parse_or(&lookup, "BRIGADE_HEARTBEAT_TIMEOUT_SECS", 45);

        let delay = Duration::from_secs(delay_secs);
        let reconnect: Arc<dyn ReconnectPolicy> = match lookup("BRIGADE_RECONNECT_BACKOFF")
            .as_deref()
            .map(str::trim)
        {
            Some("exponential") => Arc::new(ExponentialBackoff {
                initial_delay: delay,
                max_delay: Duration::from_secs(60).max(delay),
                multiplier: 2.0,
                max_attempts,
            }),
            None | Some("fixed") => Arc::new(FixedDelay {
                delay,
                max_attempts,
            }),
            Some(other) => {
                tracing::warn!(value = other, "Unknown BRIGADE_RECONNECT_BACKOFF, using fixed");
                Arc::new(FixedDelay {
                    delay,
                    max_attempts,
                })
            }
        };

        Self {
            base_url: base_url.into(),
            reconnect,
            heartbeat_timeout: Duration::from_secs(heartbeat_secs),
        }
    }
}

/// Parse `key` from `lookup`, logging and falling back to `default` when
/// the value is missing or invalid.
pub fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|raw| parse_value(key, &raw))
        .unwrap_or(default)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "Invalid configuration value, using default");
            None
        }
    }
}
