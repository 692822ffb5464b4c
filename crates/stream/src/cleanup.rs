//! Process-wide release of notification streams.
//!
//! [`CleanupCoordinator`] disconnects every target when the application
//! is torn down, hidden, or loses its network, so no stream outlives the
//! screen that needed it. [`initialize`](CleanupCoordinator::initialize)
//! installs OS signal handlers once; lifecycle events from an embedding
//! UI are delivered through [`notify`](CleanupCoordinator::notify).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::registry::ConnectionRegistry;

/// Application lifecycle events that release stream resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// The process or page is going away.
    Teardown,
    /// The UI was hidden or backgrounded.
    Hidden,
    /// The host reported loss of network connectivity.
    NetworkLost,
}

pub struct CleanupCoordinator {
    registry: ConnectionRegistry,
    initialized: AtomicBool,
    teardown: CancellationToken,
}

impl CleanupCoordinator {
    pub fn new(registry: ConnectionRegistry) -> Arc<Self> {
        Arc::new(Self {
            registry,
            initialized: AtomicBool::new(false),
            teardown: CancellationToken::new(),
        })
    }

    /// Install SIGINT/SIGTERM (and SIGHUP on Unix) handlers that deliver
    /// [`LifecycleSignal::Teardown`].
    ///
    /// Returns `false` without installing anything if already initialized.
    pub fn initialize(self: &Arc<Self>) -> bool {
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::debug!("Cleanup coordinator already initialized");
            return false;
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = coordinator.teardown.cancelled() => {}
                () = os_teardown_signal() => coordinator.notify(LifecycleSignal::Teardown),
            }
        });

        tracing::info!("Cleanup coordinator initialized");
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Handle a lifecycle event: every target is disconnected.
    pub fn notify(&self, signal: LifecycleSignal) {
        tracing::info!(?signal, "Releasing notification streams");
        self.registry.disconnect_all();
        if signal == LifecycleSignal::Teardown {
            self.teardown.cancel();
        }
    }

    /// Disconnect everything now, without signalling teardown.
    pub fn cleanup(&self) {
        self.registry.disconnect_all();
    }

    /// Resolves once a [`LifecycleSignal::Teardown`] has been handled.
    pub async fn teardown_requested(&self) {
        self.teardown.cancelled().await;
    }
}

/// Wait for a termination signal from the OS.
async fn os_teardown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = unix_signal(tokio::signal::unix::SignalKind::terminate(), "SIGTERM");
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    #[cfg(unix)]
    let hangup = unix_signal(tokio::signal::unix::SignalKind::hangup(), "SIGHUP");
    #[cfg(not(unix))]
    let hangup = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C)"),
        () = terminate => tracing::info!("Received SIGTERM"),
        () = hangup => tracing::info!("Received SIGHUP"),
    }
}

#[cfg(unix)]
async fn unix_signal(kind: tokio::signal::unix::SignalKind, name: &'static str) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, signal = name, "Failed to install signal handler");
            std::future::pending::<()>().await;
        }
    }
}
