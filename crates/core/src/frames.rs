//! Notification stream frame types and parser.
//!
//! Every `data:` line on a notification stream carries one JSON object
//! with a mandatory `"kind"` discriminant:
//!
//! ```json
//! {"kind":"domain","type":"order_created","target":"kitchen", ...}
//! {"kind":"system","message":"heartbeat","timestamp":"..."}
//! ```
//!
//! The discriminant is decided once, here, at the protocol boundary.
//! Frames without it are rejected rather than guessed at.

use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;
use crate::target::Audience;
use crate::types::Timestamp;

/// A decoded notification stream frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Frame {
    /// A business event about an order.
    Domain(NotificationEvent),
    /// A heartbeat or connection confirmation.
    System(SystemEvent),
}

/// Kind of order event emitted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    OrderCreated,
    OrderStatusUpdated,
    OrderReadyToServe,
}

/// A domain event about an order. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub target: Audience,
    pub timestamp: Timestamp,
    pub payload: OrderPayload,
    pub message: String,
}

/// Order details attached to a [`NotificationEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub order_id: String,
    pub table_number: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<OrderStatus>,
    pub dish_count: u32,
    pub total_price: f64,
}

/// Heartbeat and connection-confirmation frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub message: String,
    pub timestamp: Timestamp,
}

/// Parse the JSON payload of one `data:` line.
///
/// Returns `Err` for malformed JSON, a missing or unknown `kind`, or a
/// body that does not match the variant. Callers drop the frame and keep
/// the stream open.
pub fn parse_frame(text: &str) -> Result<Frame, serde_json::Error> {
    serde_json::from_str(text)
}
