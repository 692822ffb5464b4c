//! The capped, in-memory notification feed.
//!
//! [`NotificationManager`] is built once by the composition root and
//! shared behind an `Arc`. The feed is newest first; adding past the cap
//! drops the oldest entries. Unread count is recomputed from the feed on
//! every call rather than tracked separately.

use std::collections::VecDeque;
use std::sync::Arc;

use brigade_core::frames::NotificationEvent;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::mapping::draft_from_event;
use crate::model::{NotificationDraft, UiNotification};
use crate::sound::{clamp_volume, synthesize_tone, AudioSink, SilentSink, SoundKind};

pub const DEFAULT_MAX_NOTIFICATIONS: usize = 50;
pub const DEFAULT_SOUND_VOLUME: f32 = 0.5;

/// Initial feed settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Feed cap; at least one entry is always kept.
    pub max_notifications: usize,
    pub sound_enabled: bool,
    /// Clamped to `[0, 1]`.
    pub sound_volume: f32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_notifications: DEFAULT_MAX_NOTIFICATIONS,
            sound_enabled: true,
            sound_volume: DEFAULT_SOUND_VOLUME,
        }
    }
}

struct FeedState {
    notifications: VecDeque<UiNotification>,
    sound_enabled: bool,
    sound_volume: f32,
}

pub struct NotificationManager {
    state: Mutex<FeedState>,
    max_notifications: usize,
    sink: Arc<dyn AudioSink>,
}

impl NotificationManager {
    pub fn new(config: ManagerConfig, sink: Arc<dyn AudioSink>) -> Self {
        let max_notifications = config.max_notifications.max(1);
        Self {
            state: Mutex::new(FeedState {
                notifications: VecDeque::with_capacity(max_notifications),
                sound_enabled: config.sound_enabled,
                sound_volume: clamp_volume(config.sound_volume),
            }),
            max_notifications,
            sink,
        }
    }

    /// Add a notification at the head of the feed and play its tone if
    /// requested and sound is enabled. Returns the stored record.
    pub fn add_notification(&self, draft: NotificationDraft) -> UiNotification {
        let notification = draft.into_notification(Uuid::new_v4(), chrono::Utc::now());

        let (play, volume) = {
            let mut state = self.state.lock();
            state.notifications.push_front(notification.clone());
            state.notifications.truncate(self.max_notifications);
            (notification.sound && state.sound_enabled, state.sound_volume)
        };

        tracing::debug!(
            id = %notification.id,
            kind = notification.kind.as_str(),
            title = %notification.title,
            "Notification added",
        );

        if play {
            self.play(SoundKind::for_notification(&notification), volume);
        }
        notification
    }

    /// Map a domain event to its notification template and add it.
    pub fn create_notification_from_event(&self, event: &NotificationEvent) -> UiNotification {
        self.add_notification(draft_from_event(event))
    }

    /// Returns `false` if no notification has this id.
    pub fn mark_as_read(&self, id: Uuid) -> bool {
        let mut state = self.state.lock();
        match state.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_as_read(&self) {
        for notification in self.state.lock().notifications.iter_mut() {
            notification.read = true;
        }
    }

    /// Returns `false` if no notification has this id.
    pub fn remove_notification(&self, id: Uuid) -> bool {
        let mut state = self.state.lock();
        let before = state.notifications.len();
        state.notifications.retain(|n| n.id != id);
        state.notifications.len() != before
    }

    pub fn clear_all(&self) {
        self.state.lock().notifications.clear();
    }

    /// Snapshot of the feed, newest first.
    pub fn notifications(&self) -> Vec<UiNotification> {
        self.state.lock().notifications.iter().cloned().collect()
    }

    pub fn unread_count(&self) -> usize {
        self.state
            .lock()
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    pub fn max_notifications(&self) -> usize {
        self.max_notifications
    }

    pub fn sound_enabled(&self) -> bool {
        self.state.lock().sound_enabled
    }

    /// Applies from the next tone on.
    pub fn set_sound_enabled(&self, enabled: bool) {
        self.state.lock().sound_enabled = enabled;
        tracing::info!(enabled, "Notification sound toggled");
    }

    pub fn sound_volume(&self) -> f32 {
        self.state.lock().sound_volume
    }

    /// Applies from the next tone on. Clamped to `[0, 1]`.
    pub fn set_sound_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        self.state.lock().sound_volume = volume;
        tracing::debug!(volume, "Notification volume changed");
    }

    /// Play `kind` at the current volume unless sound is disabled.
    pub fn play_sound(&self, kind: SoundKind) {
        let (enabled, volume) = {
            let state = self.state.lock();
            (state.sound_enabled, state.sound_volume)
        };
        if enabled {
            self.play(kind, volume);
        }
    }

    fn play(&self, kind: SoundKind, volume: f32) {
        let samples = synthesize_tone(kind, volume, self.sink.sample_rate());
        if let Err(e) = self.sink.play(&samples) {
            tracing::warn!(error = %e, sound = ?kind, "Failed to play notification sound");
        }
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default(), Arc::new(SilentSink))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::NotificationKind;

    use super::*;

    fn draft(title: &str) -> NotificationDraft {
        NotificationDraft::new(NotificationKind::Info, title, "corps")
    }

    #[test]
    fn newest_first() {
        let manager = NotificationManager::default();
        manager.add_notification(draft("a"));
        manager.add_notification(draft("b"));

        let titles: Vec<String> = manager.notifications().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[test]
    fn zero_cap_keeps_one_entry() {
        let manager = NotificationManager::new(
            ManagerConfig {
                max_notifications: 0,
                ..ManagerConfig::default()
            },
            Arc::new(SilentSink),
        );
        manager.add_notification(draft("a"));
        manager.add_notification(draft("b"));
        assert_eq!(manager.notifications().len(), 1);
        assert_eq!(manager.max_notifications(), 1);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let manager = NotificationManager::default();
        assert!(!manager.mark_as_read(Uuid::new_v4()));
        assert!(!manager.remove_notification(Uuid::new_v4()));
    }

    #[test]
    fn volume_setter_clamps() {
        let manager = NotificationManager::default();
        assert_eq!(manager.sound_volume(), DEFAULT_SOUND_VOLUME);
        manager.set_sound_volume(1.7);
        assert_eq!(manager.sound_volume(), 1.0);
        manager.set_sound_volume(-0.2);
        assert_eq!(manager.sound_volume(), 0.0);
    }
}
