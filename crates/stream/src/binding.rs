//! Per-screen binding of one consumer to one target.
//!
//! A [`TargetBinding`] subscribes a UI surface (a kitchen board, a
//! service screen, the terminal monitor) to a target's events, system
//! frames and status. Mounting registers listeners and starts the
//! connection if nobody has yet; dropping the binding unregisters its
//! listeners but leaves the shared connection running for other
//! consumers.

use std::collections::VecDeque;
use std::sync::Arc;

use brigade_core::frames::{NotificationEvent, SystemEvent};
use brigade_core::status::ConnectionStatus;
use brigade_core::target::Target;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::listeners::{Callback, Subscription};
use crate::registry::ConnectionRegistry;

/// Default number of recent events kept by a binding.
pub const DEFAULT_MAX_EVENTS: usize = 50;

/// Configures and mounts a [`TargetBinding`].
pub struct BindingBuilder {
    registry: ConnectionRegistry,
    target: Target,
    max_events: usize,
    on_event: Option<Callback<NotificationEvent>>,
    on_system: Option<Callback<SystemEvent>>,
    on_status: Option<Callback<ConnectionStatus>>,
}

impl BindingBuilder {
    /// Number of recent events to keep locally (newest first).
    pub fn max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn on_event(mut self, f: impl Fn(&NotificationEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(f));
        self
    }

    pub fn on_system(mut self, f: impl Fn(&SystemEvent) + Send + Sync + 'static) -> Self {
        self.on_system = Some(Arc::new(f));
        self
    }

    pub fn on_status(mut self, f: impl Fn(&ConnectionStatus) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Arc::new(f));
        self
    }

    /// Register listeners, read the current status and connect unless the
    /// target is already connected or connecting.
    pub fn mount(self) -> TargetBinding {
        let Self {
            registry,
            target,
            max_events,
            on_event,
            on_system,
            on_status,
        } = self;

        let events = Arc::new(Mutex::new(VecDeque::new()));
        let (status_tx, status_rx) = watch::channel(registry.connection_status(target));
        let mut subscriptions = Vec::with_capacity(3);

        let buffer = Arc::clone(&events);
        subscriptions.push(registry.add_event_listener(target, move |event| {
            {
                let mut buffer = buffer.lock();
                buffer.push_front(event.clone());
                buffer.truncate(max_events);
            }
            if let Some(on_event) = &on_event {
                on_event(event);
            }
        }));

        subscriptions.push(registry.add_system_listener(target, move |event| {
            if let Some(on_system) = &on_system {
                on_system(event);
            }
        }));

        subscriptions.push(registry.add_status_listener(target, move |status| {
            status_tx.send_replace(status.clone());
            if let Some(on_status) = &on_status {
                on_status(status);
            }
        }));

        let current = registry.connection_status(target);
        if !current.connected && !current.connecting {
            registry.connect(target);
        }

        tracing::debug!(stream = %target, "Binding mounted");

        TargetBinding {
            registry,
            target,
            events,
            status: status_rx,
            subscriptions,
        }
    }
}

/// A mounted consumer of one target.
pub struct TargetBinding {
    registry: ConnectionRegistry,
    target: Target,
    events: Arc<Mutex<VecDeque<NotificationEvent>>>,
    status: watch::Receiver<ConnectionStatus>,
    subscriptions: Vec<Subscription>,
}

impl TargetBinding {
    pub fn builder(registry: ConnectionRegistry, target: Target) -> BindingBuilder {
        BindingBuilder {
            registry,
            target,
            max_events: DEFAULT_MAX_EVENTS,
            on_event: None,
            on_system: None,
            on_status: None,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn connect(&self) {
        self.registry.connect(self.target);
    }

    pub fn disconnect(&self) {
        self.registry.disconnect(self.target);
    }

    /// Latest status seen by this binding.
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// A receiver that wakes on every status change, for redrawing a
    /// status indicator.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Recent events, newest first.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Forget locally buffered events. Server-side state is untouched.
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }
}

impl Drop for TargetBinding {
    fn drop(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        tracing::debug!(stream = %self.target, "Binding unmounted");
    }
}
