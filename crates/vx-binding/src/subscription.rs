//! Subscription resource
//!
//! A [`Subscription`] owns exactly one channel task. Disposal is idempotent
//! and synchronous from the consumer's point of view: once [`Subscription::dispose`]
//! returns, no callback reaches the sink, even if the underlying channel is
//! still being torn down on another worker.

use parking_lot::{Mutex, ReentrantMutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Process-unique subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl SubscriptionId {
    /// Allocate next identifier
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Per-subscription liveness flag
///
/// Deliveries and disposal serialize on a re-entrant lock: a delivery that
/// started before disposal finishes first, and no delivery starts after it.
/// Re-entrancy lets a sink dispose its own subscription from inside a callback.
#[derive(Debug)]
pub(crate) struct Liveness {
    alive: AtomicBool,
    gate: ReentrantMutex<()>,
}

impl Liveness {
    pub(crate) fn new() -> Self {
        Self {
            alive: AtomicBool::new(true),
            gate: ReentrantMutex::new(()),
        }
    }

    /// Run `deliver` only while alive; returns whether it ran
    pub(crate) fn deliver(&self, deliver: impl FnOnce()) -> bool {
        let _gate = self.gate.lock();
        if !self.alive.load(Ordering::SeqCst) {
            return false;
        }
        deliver();
        true
    }

    /// Mark dead; returns whether this call did it
    pub(crate) fn kill(&self) -> bool {
        let _gate = self.gate.lock();
        self.alive.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Handle to one live binding
///
/// Dropping the handle disposes it.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    label: String,
    liveness: Arc<Liveness>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, label: String, liveness: Arc<Liveness>) -> Self {
        Self {
            id,
            label,
            liveness,
            task: Mutex::new(None),
        }
    }

    pub(crate) fn attach(&self, task: JoinHandle<()>) {
        *self.task.lock() = Some(task);
    }

    /// Subscription identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// What the subscription listens to
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Check if callbacks can still fire
    ///
    /// A subscription whose channel ended (error, store close) but that was
    /// not disposed reports `false` once its task has finished.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.liveness.is_alive()
            && self
                .task
                .lock()
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }

    /// Close the channel and silence all callbacks
    ///
    /// Idempotent. After it returns no callback reaches the consumer; the
    /// channel itself closes when the aborted task is dropped.
    pub fn dispose(&self) {
        if self.liveness.kill() {
            tracing::debug!("Disposed {} ({})", self.id, self.label);
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}
