//! Consumers of binding events

use crate::error::BindError;

/// Receiver of everything a binding reports
///
/// Every `on_snapshot` call carries the complete current result. Sinks must
/// replace what they held, never merge into it.
///
/// Callbacks run on the binding's channel task and must return quickly.
pub trait SnapshotSink<V>: Send + Sync + 'static {
    /// Full, authoritative result set
    fn on_snapshot(&self, value: V);

    /// Channel or query failure; no further events follow
    fn on_error(&self, error: BindError);

    /// No principal: the channel is closed (or was never opened)
    fn on_unauthenticated(&self) {}

    /// Single-document binding whose document does not exist
    fn on_missing(&self) {}
}

/// Sink built from a pair of closures
pub struct FnSink<S, E> {
    on_snapshot: S,
    on_error: E,
}

impl<S, E> FnSink<S, E> {
    /// Create new closure sink
    #[inline]
    #[must_use]
    pub fn new(on_snapshot: S, on_error: E) -> Self {
        Self {
            on_snapshot,
            on_error,
        }
    }
}

impl<V, S, E> SnapshotSink<V> for FnSink<S, E>
where
    S: Fn(V) + Send + Sync + 'static,
    E: Fn(BindError) + Send + Sync + 'static,
{
    fn on_snapshot(&self, value: V) {
        (self.on_snapshot)(value);
    }

    fn on_error(&self, error: BindError) {
        (self.on_error)(error);
    }
}

impl<S, E> std::fmt::Debug for FnSink<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}
