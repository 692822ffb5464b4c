//! Listener bookkeeping shared by every target.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use brigade_core::target::Target;

/// A registered callback receiving `&A`.
pub type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Ordered set of callbacks for one target and one event kind.
pub(crate) struct ListenerSet<A> {
    entries: Vec<(u64, Callback<A>)>,
}

impl<A> Default for ListenerSet<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<A> ListenerSet<A> {
    pub(crate) fn insert(&mut self, id: u64, callback: Callback<A>) {
        self.entries.push((id, callback));
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// Clone the callbacks out so they can run without holding the
    /// registry lock.
    pub(crate) fn snapshot(&self) -> Vec<Callback<A>> {
        self.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Invoke each callback in registration order. A panicking callback is
/// logged and skipped; the rest still run.
pub(crate) fn dispatch<A>(callbacks: &[Callback<A>], value: &A, target: Target, kind: &'static str) {
    for callback in callbacks {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(value))) {
            tracing::warn!(
                stream = %target,
                kind,
                panic = panic_message(panic.as_ref()),
                "Notification listener panicked",
            );
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle returned by listener registration.
///
/// Dropping it leaves the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[must_use = "keep the subscription to be able to unsubscribe later"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(remove: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// Remove the listener. Later events are no longer delivered to it.
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
