//! Order lifecycle statuses as reported by the backend.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Status of a customer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    InPreparation,
    Ready,
    Delivered,
    Finish,
    Cancelled,
}

impl OrderStatus {
    /// Wire name, e.g. `IN_PREPARATION`.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InPreparation => "IN_PREPARATION",
            OrderStatus::Ready => "READY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Finish => "FINISH",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "IN_PREPARATION" => Ok(OrderStatus::InPreparation),
            "READY" => Ok(OrderStatus::Ready),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "FINISH" => Ok(OrderStatus::Finish),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}
