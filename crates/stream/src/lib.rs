//! Authenticated notification stream client.
//!
//! Opens the backend's per-role `text/event-stream` endpoints with a
//! bearer token, frames and parses their `data:` lines, and keeps each
//! target connected through transport errors and silent stalls
//! (heartbeat watchdog), fanning events out to registered listeners.

pub mod binding;
pub mod cleanup;
pub mod client;
pub mod config;
pub mod decoder;
pub mod event_stream;
pub mod listeners;
pub mod reconnect;
pub mod registry;
pub mod token;

pub use binding::TargetBinding;
pub use cleanup::{CleanupCoordinator, LifecycleSignal};
pub use client::{StreamClient, StreamClientError, StreamConnector};
pub use config::RegistryConfig;
pub use registry::ConnectionRegistry;
