//! Per-target notification stream lifecycle and event fan-out.
//!
//! [`ConnectionRegistry`] owns one stream session per [`Target`]:
//! connect -> read frames -> (error -> delayed reconnect) -> disconnect.
//! It is constructed once by the application's composition root and
//! cloned (cheaply) into every consumer.
//!
//! Each target's status, listeners, session and reconnect timer live in
//! a single entry behind a short-lived lock that is never held across an
//! `.await`, and listener callbacks always run after the lock is
//! released. Status changes are queued on the entry and delivered in
//! the order they were made. A monotonically increasing generation
//! number per target lets stale sessions and timers recognise that they
//! have been superseded by a later `connect` or `disconnect`.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use brigade_core::frames::{parse_frame, Frame, NotificationEvent, SystemEvent};
use brigade_core::status::ConnectionStatus;
use brigade_core::target::Target;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::{StreamClient, StreamClientError, StreamConnector};
use crate::config::RegistryConfig;
use crate::listeners::{dispatch, ListenerSet, Subscription};
use crate::token::{TokenError, TokenProvider};

/// Status message for an ordinary lost connection.
pub const STATUS_CONNECTION_LOST: &str = "Connexion perdue";

/// Status message when no heartbeat arrived within the timeout.
pub const STATUS_HEARTBEAT_LOST: &str = "Connexion perdue (heartbeat manquant)";

/// Status message for a cross-origin rejection. Not retried.
pub const STATUS_CORS_BLOCKED: &str =
    "Connexion bloquée par CORS : vérifiez la configuration CORS du backend";

/// Status message when no bearer token is available. Not retried.
pub const STATUS_TOKEN_MISSING: &str = "Authentification requise : aucun jeton disponible";

/// Manages one live notification stream per target.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<Inner>,
}

struct Inner {
    config: RegistryConfig,
    connector: Arc<dyn StreamConnector>,
    tokens: Arc<dyn TokenProvider>,
    targets: Mutex<HashMap<Target, TargetEntry>>,
    next_listener_id: AtomicU64,
}

#[derive(Default)]
struct TargetEntry {
    status: ConnectionStatus,
    generation: u64,
    /// Cancels the running session task.
    session: Option<CancellationToken>,
    reconnect: Option<JoinHandle<()>>,
    /// Reconnect attempts since the last successful open.
    attempts: u32,
    events: ListenerSet<NotificationEvent>,
    system: ListenerSet<SystemEvent>,
    status_listeners: ListenerSet<ConnectionStatus>,
    /// Status changes not yet delivered to `status_listeners`.
    status_queue: VecDeque<ConnectionStatus>,
    /// Set while some caller is delivering `status_queue`.
    delivering: bool,
}

impl TargetEntry {
    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
        }
    }

    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.abort();
        }
    }

    /// Whether a session exists or a retry is pending.
    fn is_active(&self) -> bool {
        self.session.is_some()
            || self.reconnect.is_some()
            || self.status.connecting
            || self.status.connected
    }

    fn publish_status(&mut self) {
        self.status_queue.push_back(self.status.clone());
    }
}

/// Why a session ended.
#[derive(Debug)]
enum Failure {
    Token(TokenError),
    Stream(StreamClientError),
    HeartbeatTimeout,
    Ended,
}

impl Failure {
    fn is_permanent(&self) -> bool {
        match self {
            Failure::Token(TokenError::Missing) => true,
            Failure::Stream(e) => e.is_permanent(),
            _ => false,
        }
    }

    fn status_message(&self) -> String {
        match self {
            Failure::Token(TokenError::Missing) => STATUS_TOKEN_MISSING.to_string(),
            Failure::Stream(StreamClientError::Cors(_)) => STATUS_CORS_BLOCKED.to_string(),
            Failure::Stream(StreamClientError::Http { status, .. }) => {
                format!("{STATUS_CONNECTION_LOST} (HTTP {status})")
            }
            Failure::HeartbeatTimeout => STATUS_HEARTBEAT_LOST.to_string(),
            Failure::Token(TokenError::Unavailable(_))
            | Failure::Stream(_)
            | Failure::Ended => STATUS_CONNECTION_LOST.to_string(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Token(e) => write!(f, "{e}"),
            Failure::Stream(e) => write!(f, "{e}"),
            Failure::HeartbeatTimeout => f.write_str("heartbeat timeout"),
            Failure::Ended => f.write_str("stream ended by server"),
        }
    }
}

impl ConnectionRegistry {
    pub fn new(
        config: RegistryConfig,
        connector: Arc<dyn StreamConnector>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                tokens,
                targets: Mutex::new(HashMap::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registry backed by the HTTP [`StreamClient`].
    pub fn http(config: RegistryConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::new(config, Arc::new(StreamClient::new()), tokens)
    }

    /// Open `target`'s stream. No-op when it is already connected.
    ///
    /// Returns immediately; progress is reported through status listeners.
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self, target: Target) {
        self.inner.connect(target);
    }

    /// Connect every target in `targets`.
    pub fn connect_all(&self, targets: impl IntoIterator<Item = Target>) {
        for target in targets {
            self.inner.connect(target);
        }
    }

    /// Close `target`'s stream, cancel its timers and reset its status to
    /// the disconnected baseline. Idempotent.
    pub fn disconnect(&self, target: Target) {
        self.inner.disconnect(target);
    }

    /// Disconnect every target this registry has seen.
    pub fn disconnect_all(&self) {
        let targets: Vec<Target> = self.inner.targets.lock().keys().copied().collect();
        for target in targets {
            self.inner.disconnect(target);
        }
        tracing::info!("All notification streams disconnected");
    }

    /// Report an out-of-band failure for `target`'s current session.
    ///
    /// Closes the stream and schedules a reconnect unless one is already
    /// pending or the error is permanent. Ignored for a target that is
    /// idle, so an explicit `disconnect` stays in effect.
    pub fn handle_connection_error(&self, target: Target, error: StreamClientError) {
        let generation = {
            let targets = self.inner.targets.lock();
            match targets.get(&target) {
                Some(entry) if entry.is_active() => entry.generation,
                _ => {
                    tracing::debug!(stream = %target, error = %error, "Ignoring error for idle stream");
                    return;
                }
            }
        };
        self.inner.fail(target, generation, Failure::Stream(error));
    }

    pub fn connection_status(&self, target: Target) -> ConnectionStatus {
        self.inner
            .targets
            .lock()
            .get(&target)
            .map(|entry| entry.status.clone())
            .unwrap_or_default()
    }

    /// Status of every target this registry has seen.
    pub fn statuses(&self) -> BTreeMap<Target, ConnectionStatus> {
        self.inner
            .targets
            .lock()
            .iter()
            .map(|(target, entry)| (*target, entry.status.clone()))
            .collect()
    }

    /// Whether a reconnect timer is currently pending for `target`.
    pub fn has_pending_reconnect(&self, target: Target) -> bool {
        self.inner
            .targets
            .lock()
            .get(&target)
            .is_some_and(|entry| entry.reconnect.is_some())
    }

    /// Reconnect attempts scheduled since the last successful open.
    pub fn reconnect_attempts(&self, target: Target) -> u32 {
        self.inner
            .targets
            .lock()
            .get(&target)
            .map_or(0, |entry| entry.attempts)
    }

    pub fn add_event_listener<F>(&self, target: Target, callback: F) -> Subscription
    where
        F: Fn(&NotificationEvent) + Send + Sync + 'static,
    {
        self.inner
            .register(target, ListenerKind::Event, |entry, id| {
                entry.events.insert(id, Arc::new(callback));
                entry.events.len()
            })
    }

    pub fn add_system_listener<F>(&self, target: Target, callback: F) -> Subscription
    where
        F: Fn(&SystemEvent) + Send + Sync + 'static,
    {
        self.inner
            .register(target, ListenerKind::System, |entry, id| {
                entry.system.insert(id, Arc::new(callback));
                entry.system.len()
            })
    }

    pub fn add_status_listener<F>(&self, target: Target, callback: F) -> Subscription
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        self.inner
            .register(target, ListenerKind::Status, |entry, id| {
                entry.status_listeners.insert(id, Arc::new(callback));
                entry.status_listeners.len()
            })
    }
}

#[derive(Debug, Clone, Copy)]
enum ListenerKind {
    Event,
    System,
    Status,
}

impl ListenerKind {
    fn as_str(self) -> &'static str {
        match self {
            ListenerKind::Event => "event",
            ListenerKind::System => "system",
            ListenerKind::Status => "status",
        }
    }
}

impl Inner {
    fn register(
        self: &Arc<Self>,
        target: Target,
        kind: ListenerKind,
        insert: impl FnOnce(&mut TargetEntry, u64) -> usize,
    ) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let count = insert(self.targets.lock().entry(target).or_default(), id);
        tracing::debug!(stream = %target, kind = kind.as_str(), count, "Listener registered");

        let weak: Weak<Inner> = Arc::downgrade(self);
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut targets = inner.targets.lock();
            if let Some(entry) = targets.get_mut(&target) {
                let removed = match kind {
                    ListenerKind::Event => entry.events.remove(id),
                    ListenerKind::System => entry.system.remove(id),
                    ListenerKind::Status => entry.status_listeners.remove(id),
                };
                if removed {
                    tracing::debug!(stream = %target, kind = kind.as_str(), "Listener removed");
                }
            }
        })
    }

    fn connect(self: &Arc<Self>, target: Target) {
        {
            let mut targets = self.targets.lock();
            let entry = targets.entry(target).or_default();
            if entry.status.connected {
                tracing::debug!(stream = %target, "Already connected, ignoring connect");
                return;
            }

            entry.close_session();
            entry.cancel_reconnect();
            entry.generation += 1;
            entry.status.mark_connecting();

            let cancel = CancellationToken::new();
            tokio::spawn(run_session(
                Arc::clone(self),
                target,
                entry.generation,
                cancel.clone(),
            ));
            entry.session = Some(cancel);

            tracing::info!(stream = %target, generation = entry.generation, "Connecting notification stream");
            entry.publish_status();
        }
        self.deliver_status(target);
    }

    fn disconnect(&self, target: Target) {
        let changed = {
            let mut targets = self.targets.lock();
            let Some(entry) = targets.get_mut(&target) else {
                return;
            };

            entry.generation += 1;
            entry.close_session();
            entry.cancel_reconnect();
            entry.attempts = 0;

            let before = entry.status.clone();
            entry.status.reset();
            let changed = before != entry.status;
            if changed {
                entry.publish_status();
            }
            changed
        };

        if changed {
            tracing::info!(stream = %target, "Notification stream disconnected");
            self.deliver_status(target);
        }
    }

    /// Deliver queued status changes in order. A call made while another
    /// caller (or an outer frame of this one) is delivering leaves its
    /// change to that caller.
    fn deliver_status(&self, target: Target) {
        {
            let mut targets = self.targets.lock();
            let Some(entry) = targets.get_mut(&target) else {
                return;
            };
            if entry.delivering {
                return;
            }
            entry.delivering = true;
        }

        loop {
            let (status, listeners) = {
                let mut targets = self.targets.lock();
                let Some(entry) = targets.get_mut(&target) else {
                    return;
                };
                match entry.status_queue.pop_front() {
                    Some(status) => (status, entry.status_listeners.snapshot()),
                    None => {
                        entry.delivering = false;
                        return;
                    }
                }
            };
            dispatch(&listeners, &status, target, "status");
        }
    }

    /// Mark the session open. Returns `false` if it was superseded.
    fn mark_open(&self, target: Target, generation: u64) -> bool {
        {
            let mut targets = self.targets.lock();
            let Some(entry) = targets.get_mut(&target) else {
                return false;
            };
            if entry.generation != generation {
                return false;
            }
            entry.status.mark_connected();
            entry.attempts = 0;
            entry.publish_status();
        }

        tracing::info!(stream = %target, "Notification stream connected");
        self.deliver_status(target);
        true
    }

    /// Decode and route one `data:` payload. Returns `true` for system
    /// frames, which feed the heartbeat watchdog.
    fn dispatch_frame(&self, target: Target, generation: u64, data: &str) -> bool {
        let frame = match parse_frame(data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(
                    stream = %target,
                    error = %e,
                    raw_frame = %data,
                    "Dropping malformed notification frame",
                );
                return false;
            }
        };

        match frame {
            Frame::Domain(event) => {
                if !event.target.includes(target) {
                    tracing::warn!(
                        stream = %target,
                        audience = ?event.target,
                        "Dropping event addressed to another audience",
                    );
                    return false;
                }
                let listeners = {
                    let targets = self.targets.lock();
                    match targets.get(&target) {
                        Some(entry) if entry.generation == generation => entry.events.snapshot(),
                        _ => return false,
                    }
                };
                tracing::debug!(
                    stream = %target,
                    event_type = ?event.event_type,
                    order_id = %event.payload.order_id,
                    "Notification event received",
                );
                dispatch(&listeners, &event, target, "event");
                false
            }
            Frame::System(event) => {
                let listeners = {
                    let mut targets = self.targets.lock();
                    match targets.get_mut(&target) {
                        Some(entry) if entry.generation == generation => {
                            entry.status.record_heartbeat(chrono::Utc::now());
                            entry.system.snapshot()
                        }
                        _ => return false,
                    }
                };
                tracing::trace!(stream = %target, message = %event.message, "System frame received");
                dispatch(&listeners, &event, target, "system");
                true
            }
        }
    }

    /// Shared error path: record the failure, close the session and,
    /// unless the failure is permanent, schedule exactly one reconnect.
    fn fail(self: &Arc<Self>, target: Target, generation: u64, failure: Failure) {
        {
            let mut targets = self.targets.lock();
            let Some(entry) = targets.get_mut(&target) else {
                return;
            };
            if entry.generation != generation {
                tracing::debug!(stream = %target, error = %failure, "Ignoring failure from superseded session");
                return;
            }

            entry.close_session();
            entry.status.mark_failed(failure.status_message());

            if failure.is_permanent() {
                entry.cancel_reconnect();
                tracing::error!(
                    stream = %target,
                    error = %failure,
                    "Notification stream failed permanently, not reconnecting",
                );
            } else {
                tracing::warn!(stream = %target, error = %failure, "Notification stream lost");
                self.schedule_reconnect(entry, target);
            }
            entry.publish_status();
        }
        self.deliver_status(target);
    }

    fn schedule_reconnect(self: &Arc<Self>, entry: &mut TargetEntry, target: Target) {
        if entry.reconnect.is_some() {
            tracing::debug!(stream = %target, "Reconnect already scheduled");
            return;
        }

        let attempt = entry.attempts + 1;
        let Some(delay) = self.config.reconnect.delay_for(attempt) else {
            tracing::error!(stream = %target, attempts = entry.attempts, "Giving up reconnecting");
            entry.status.mark_failed(format!(
                "{STATUS_CONNECTION_LOST} (abandon après {} tentatives)",
                entry.attempts
            ));
            return;
        };
        entry.attempts = attempt;

        tracing::info!(
            stream = %target,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect",
        );

        let generation = entry.generation;
        let inner = Arc::clone(self);
        entry.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut targets = inner.targets.lock();
                match targets.get_mut(&target) {
                    Some(entry) if entry.generation == generation => entry.reconnect = None,
                    _ => return,
                }
            }
            inner.connect(target);
        }));
    }
}

/// Body of one connection attempt: token, open, then read until failure
/// or cancellation.
async fn run_session(inner: Arc<Inner>, target: Target, generation: u64, cancel: CancellationToken) {
    let token = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        token = inner.tokens.get_token() => token,
    };
    let token = match token {
        Ok(token) => token,
        Err(e) => {
            inner.fail(target, generation, Failure::Token(e));
            return;
        }
    };

    let url = target.stream_url(&inner.config.base_url);
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        opened = inner.connector.open(&url, &token) => opened,
    };
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            inner.fail(target, generation, Failure::Stream(e));
            return;
        }
    };

    if !inner.mark_open(target, generation) {
        stream.close();
        return;
    }

    let timeout = inner.config.heartbeat_timeout;
    let heartbeat = tokio::time::sleep(timeout);
    tokio::pin!(heartbeat);

    let failure = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                stream.close();
                return;
            }
            () = &mut heartbeat => break Failure::HeartbeatTimeout,
            message = stream.next_message() => match message {
                Some(Ok(data)) => {
                    if inner.dispatch_frame(target, generation, &data) {
                        heartbeat.as_mut().reset(Instant::now() + timeout);
                    }
                }
                Some(Err(StreamClientError::Decode(reason))) => {
                    tracing::warn!(stream = %target, reason = %reason, "Dropping undecodable line");
                }
                Some(Err(e)) => break Failure::Stream(e),
                None => break Failure::Ended,
            },
        }
    };

    stream.close();
    inner.fail(target, generation, failure);
}
