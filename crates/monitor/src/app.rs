//! Wiring between target bindings and the notification feed.

use std::collections::VecDeque;
use std::sync::Arc;

use brigade_core::frames::{EventType, NotificationEvent};
use brigade_core::target::Target;
use brigade_core::types::Timestamp;
use brigade_notifications::NotificationManager;
use brigade_stream::{ConnectionRegistry, TargetBinding};
use parking_lot::Mutex;

use crate::render;

/// Receives each rendered output line.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// How many recent event keys are remembered for de-duplication.
const RECENT_EVENTS: usize = 256;

/// An event addressed to `all` reaches every bound target; this key lets
/// the second copy be recognised.
type EventKey = (String, EventType, Timestamp);

fn event_key(event: &NotificationEvent) -> EventKey {
    (event.payload.order_id.clone(), event.event_type, event.timestamp)
}

#[derive(Default)]
struct RecentEvents {
    keys: VecDeque<EventKey>,
}

impl RecentEvents {
    /// Returns `false` if the key was already seen.
    fn insert(&mut self, key: EventKey) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        if self.keys.len() == RECENT_EVENTS {
            self.keys.pop_back();
        }
        self.keys.push_front(key);
        true
    }
}

/// Forwards events from every bound target into one notification feed
/// and prints notifications and status changes.
pub struct Monitor {
    registry: ConnectionRegistry,
    manager: Arc<NotificationManager>,
    bindings: Vec<TargetBinding>,
}

impl Monitor {
    /// Mount one binding per target; each connects if needed.
    pub fn start(
        registry: ConnectionRegistry,
        manager: Arc<NotificationManager>,
        targets: &[Target],
        out: LineSink,
    ) -> Self {
        let recent = Arc::new(Mutex::new(RecentEvents::default()));

        let bindings = targets
            .iter()
            .map(|&target| {
                let feed = Arc::clone(&manager);
                let recent = Arc::clone(&recent);
                let event_out = Arc::clone(&out);
                let status_out = Arc::clone(&out);
                TargetBinding::builder(registry.clone(), target)
                    .on_event(move |event| {
                        if !recent.lock().insert(event_key(event)) {
                            tracing::debug!(
                                stream = %target,
                                order_id = %event.payload.order_id,
                                "Skipping event already received on another stream",
                            );
                            return;
                        }
                        let notification = feed.create_notification_from_event(event);
                        event_out(&render::notification_line(&notification));
                    })
                    .on_status(move |status| status_out(&render::status_line(target, status)))
                    .mount()
            })
            .collect();

        tracing::info!(targets = ?targets, "Monitor started");
        Self {
            registry,
            manager,
            bindings,
        }
    }

    pub fn manager(&self) -> &Arc<NotificationManager> {
        &self.manager
    }

    /// Unmount every binding and close every stream.
    pub fn stop(mut self) {
        self.bindings.clear();
        self.registry.disconnect_all();
        tracing::info!(
            feed_len = self.manager.notifications().len(),
            "Monitor stopped",
        );
    }
}
