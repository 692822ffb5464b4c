//! Per-target connection status record.

use serde::Serialize;

use crate::types::Timestamp;

/// Observable connection state of one target's stream.
///
/// `connected` and `connecting` are never both true; the transition
/// methods below are the only writers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    pub connecting: bool,
    pub error: Option<String>,
    pub last_heartbeat: Option<Timestamp>,
}

/// Coarse phase derived from a [`ConnectionStatus`], for status indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// The disconnected baseline.
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn mark_connecting(&mut self) {
        self.connected = false;
        self.connecting = true;
        self.error = None;
    }

    pub fn mark_connected(&mut self) {
        self.connected = true;
        self.connecting = false;
        self.error = None;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.connected = false;
        self.connecting = false;
        self.error = Some(message.into());
    }

    /// Back to the disconnected baseline. The last heartbeat is kept for
    /// diagnostics.
    pub fn reset(&mut self) {
        self.connected = false;
        self.connecting = false;
        self.error = None;
    }

    pub fn record_heartbeat(&mut self, at: Timestamp) {
        self.last_heartbeat = Some(at);
    }

    pub fn phase(&self) -> ConnectionPhase {
        if self.connected {
            ConnectionPhase::Connected
        } else if self.connecting {
            ConnectionPhase::Connecting
        } else if self.error.is_some() {
            ConnectionPhase::Error
        } else {
            ConnectionPhase::Idle
        }
    }
}
