//! Shared domain and wire types for the brigade notification client.
//!
//! Everything that crosses the boundary between the backend's per-role
//! event streams and the client lives here: stream targets, order
//! statuses, the tagged frame envelope, and the per-target connection
//! status record.

pub mod error;
pub mod frames;
pub mod order;
pub mod status;
pub mod target;
pub mod types;
