//! `brigade-monitor` -- terminal order-notification monitor.
//!
//! Connects to the kitchen and/or service notification streams of the
//! restaurant backend, turns incoming order events into notifications
//! with an audible cue, and prints them with every connection status
//! change. Exits cleanly on SIGINT, SIGTERM or SIGHUP.
//!
//! # Environment variables
//!
//! | Variable                         | Required | Default           | Description                           |
//! |----------------------------------|----------|-------------------|---------------------------------------|
//! | `BRIGADE_API_URL`                | yes      | --                | Backend base URL, e.g. `https://host/api` |
//! | `BRIGADE_TOKEN_FILE`             | no       | --                | File holding the bearer token, re-read per attempt |
//! | `BRIGADE_TOKEN`                  | no       | --                | Bearer token                          |
//! | `BRIGADE_TARGETS`                | no       | `kitchen,service` | Streams to follow                     |
//! | `BRIGADE_RECONNECT_DELAY_SECS`   | no       | `5`               | Delay before reconnecting             |
//! | `BRIGADE_RECONNECT_MAX_ATTEMPTS` | no       | unbounded         | Give up after this many attempts      |
//! | `BRIGADE_RECONNECT_BACKOFF`      | no       | `fixed`           | `fixed` or `exponential`              |
//! | `BRIGADE_HEARTBEAT_TIMEOUT_SECS` | no       | `45`              | Silence before a stream is dropped    |
//! | `BRIGADE_MAX_NOTIFICATIONS`      | no       | `50`              | Feed size                             |
//! | `BRIGADE_SOUND_ENABLED`          | no       | `true`            | Audible cues                          |
//! | `BRIGADE_SOUND_VOLUME`           | no       | `0.5`             | Cue volume in `[0, 1]`                |

use std::sync::Arc;

use brigade_monitor::app::Monitor;
use brigade_monitor::config::MonitorConfig;
use brigade_notifications::{AudioSink, BellSink, NotificationManager};
use brigade_stream::{CleanupCoordinator, ConnectionRegistry};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "brigade_monitor=info,brigade_stream=info,brigade_notifications=info";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        api_url = %config.api_url,
        targets = ?config.targets,
        sound = config.notifications.sound_enabled,
        "Starting brigade-monitor",
    );

    let registry = ConnectionRegistry::http(config.registry.clone(), config.token_provider());
    let manager = Arc::new(NotificationManager::new(
        config.notifications.clone(),
        audio_sink(),
    ));

    let coordinator = CleanupCoordinator::new(registry.clone());
    coordinator.initialize();

    let monitor = Monitor::start(
        registry,
        Arc::clone(&manager),
        &config.targets,
        Arc::new(|line: &str| println!("{line}")),
    );

    coordinator.teardown_requested().await;
    monitor.stop();

    tracing::info!(unread = manager.unread_count(), "brigade-monitor shut down");
}

#[cfg(feature = "speaker")]
fn audio_sink() -> Arc<dyn AudioSink> {
    match brigade_notifications::speaker::SpeakerSink::open() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            tracing::warn!(error = %e, "Speaker unavailable, falling back to terminal bell");
            Arc::new(BellSink)
        }
    }
}

#[cfg(not(feature = "speaker"))]
fn audio_sink() -> Arc<dyn AudioSink> {
    Arc::new(BellSink)
}
