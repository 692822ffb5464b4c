//! User-facing notification records.

use brigade_core::frames::NotificationEvent;
use brigade_core::types::Timestamp;
use serde::Serialize;
use uuid::Uuid;

/// Severity of a notification, driving its colour and icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
        }
    }
}

/// A notification stored in the feed.
///
/// Only `read` changes after creation, through the
/// [`NotificationManager`](crate::manager::NotificationManager).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiNotification {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: Timestamp,
    pub read: bool,
    /// Stays on screen until dismissed instead of auto-hiding.
    pub persistent: bool,
    /// A tone was requested when this notification was added.
    pub sound: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationEvent>,
}

/// Everything needed to add a notification; the manager assigns the id,
/// timestamp and read flag.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub persistent: bool,
    pub sound: bool,
    pub data: Option<NotificationEvent>,
}

impl NotificationDraft {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            persistent: false,
            sound: false,
            data: None,
        }
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_sound(mut self, sound: bool) -> Self {
        self.sound = sound;
        self
    }

    pub fn with_data(mut self, event: NotificationEvent) -> Self {
        self.data = Some(event);
        self
    }

    pub(crate) fn into_notification(self, id: Uuid, timestamp: Timestamp) -> UiNotification {
        UiNotification {
            id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            timestamp,
            read: false,
            persistent: self.persistent,
            sound: self.sound,
            data: self.data,
        }
    }
}
