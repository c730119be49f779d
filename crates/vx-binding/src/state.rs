//! Loading / error / data contract exposed to consumers
//!
//! [`LiveBinding`] pairs a [`Subscription`] with a watch cell holding the
//! latest [`BindingState`]. Observers see the most recent state; the binder
//! itself never coalesces, but a slow observer of the cell may skip
//! intermediate states.

use crate::error::BindError;
use crate::sink::SnapshotSink;
use crate::subscription::Subscription;
use tokio::sync::watch;

/// Observable state of one binding
#[derive(Debug, Clone, PartialEq)]
pub enum BindingState<V> {
    /// Channel not yet delivered anything
    Loading,
    /// Latest full snapshot
    Ready(V),
    /// No principal; channel closed
    Unauthenticated,
    /// Single document does not exist
    NotFound,
    /// Channel or query failed; terminal until re-bound
    Failed(BindError),
}

impl<V> BindingState<V> {
    /// Check if still loading
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Check if ready
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Check if unauthenticated
    #[inline]
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Borrow data, if ready
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&V> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow error, if failed
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&BindError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Short state name for logs and display
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Unauthenticated => "unauthenticated",
            Self::NotFound => "not-found",
            Self::Failed(_) => "failed",
        }
    }
}

/// Sink writing every event into a watch cell
#[derive(Debug)]
pub(crate) struct StatePublisher<V> {
    tx: watch::Sender<BindingState<V>>,
}

impl<V> StatePublisher<V> {
    pub(crate) fn channel() -> (Self, watch::Receiver<BindingState<V>>) {
        let (tx, rx) = watch::channel(BindingState::Loading);
        (Self { tx }, rx)
    }
}

impl<V: Send + Sync + 'static> SnapshotSink<V> for StatePublisher<V> {
    fn on_snapshot(&self, value: V) {
        self.tx.send_replace(BindingState::Ready(value));
    }

    fn on_error(&self, error: BindError) {
        self.tx.send_replace(BindingState::Failed(error));
    }

    fn on_unauthenticated(&self) {
        self.tx.send_replace(BindingState::Unauthenticated);
    }

    fn on_missing(&self) {
        self.tx.send_replace(BindingState::NotFound);
    }
}

/// A subscription plus its latest state
#[derive(Debug)]
pub struct LiveBinding<V> {
    subscription: Subscription,
    state: watch::Receiver<BindingState<V>>,
}

impl<V: Clone> LiveBinding<V> {
    pub(crate) fn new(subscription: Subscription, state: watch::Receiver<BindingState<V>>) -> Self {
        Self {
            subscription,
            state,
        }
    }

    /// Latest state
    #[must_use]
    pub fn state(&self) -> BindingState<V> {
        self.state.borrow().clone()
    }

    /// Latest data, if ready
    #[must_use]
    pub fn data(&self) -> Option<V> {
        self.state.borrow().data().cloned()
    }

    /// Receiver for change notifications
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<BindingState<V>> {
        self.state.clone()
    }

    /// Wait until the state satisfies `predicate`
    ///
    /// Returns the latest state if the binding is gone before that happens.
    pub async fn wait_until(&self, predicate: impl FnMut(&BindingState<V>) -> bool) -> BindingState<V> {
        let mut rx = self.state.clone();
        let matched = rx.wait_for(predicate).await.map(|state| state.clone());
        match matched {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Underlying subscription
    #[inline]
    #[must_use]
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Check if the channel is still delivering
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Close the channel; the state stays at its last value
    #[inline]
    pub fn dispose(&self) {
        self.subscription.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vx_gateway::GatewayError;

    #[test]
    fn publisher_replaces_state() {
        let (publisher, rx) = StatePublisher::<Vec<u32>>::channel();
        assert!(rx.borrow().is_loading());

        publisher.on_snapshot(vec![1, 2]);
        assert_eq!(rx.borrow().data(), Some(&vec![1, 2]));

        publisher.on_snapshot(vec![3]);
        assert_eq!(rx.borrow().data(), Some(&vec![3]));

        publisher.on_unauthenticated();
        assert!(rx.borrow().is_unauthenticated());

        publisher.on_missing();
        assert_eq!(rx.borrow().label(), "not-found");

        publisher.on_error(BindError::Gateway(GatewayError::Channel("x".into())));
        assert!(rx.borrow().error().is_some());
    }
}
