//! Notification feed for kitchen and service staff.
//!
//! Turns order events into French user-facing notifications, keeps a
//! capped newest-first feed with read state, and cues each one with a
//! synthesised tone.

pub mod manager;
pub mod mapping;
pub mod model;
pub mod sound;
#[cfg(feature = "speaker")]
pub mod speaker;

pub use manager::{ManagerConfig, NotificationManager};
pub use model::{NotificationDraft, NotificationKind, UiNotification};
pub use sound::{AudioSink, BellSink, SilentSink, SoundError, SoundKind};
