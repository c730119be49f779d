//! Debounced query controller
//!
//! Drives one live subscription from free-text input. The controller is a
//! three-phase state machine:
//!
//! ```text
//!            set_query(non-empty)             quiet period elapsed
//!   Idle ───────────────────────────▶ Pending ───────────────────────▶ Subscribed
//!    ▲  ◀── set_query(empty) ─────────┘  ▲ │                                │
//!    │                                   │ └── set_query(non-empty) ───────┤ (restart timer)
//!    └───────────── set_query(empty) ────┴─────────────────────────────────┘
//! ```
//!
//! Every input change cancels the pending timer and disposes the current
//! subscription before anything new starts, so at most one channel is ever
//! live and superseded input never opens one. A generation counter guards the
//! window where a timer has already fired but its cancellation raced it.

use crate::binder::{Binder, Gate};
use crate::error::BindError;
use crate::record::Record;
use crate::sink::SnapshotSink;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vx_gateway::QueryDescriptor;

/// Default quiet period
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Timing and truncation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Input must be stable this long before a subscription opens
    pub quiet_period: Duration,
    /// Maximum results published after filtering
    pub max_results: usize,
}

impl DebounceConfig {
    /// Create config
    #[inline]
    #[must_use]
    pub fn new(quiet_period: Duration, max_results: usize) -> Self {
        Self {
            quiet_period,
            max_results,
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD, 5)
    }
}

/// Published result of the controller
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionState<T> {
    /// No input
    Idle,
    /// Waiting for the quiet period or the first snapshot
    Pending,
    /// Filtered, truncated matches
    Matches(Vec<T>),
    /// Subscription delivered, nothing matched
    NoMatches,
    /// Channel failed
    Failed(BindError),
}

impl<T> SuggestionState<T> {
    /// Borrow matches, if any
    #[inline]
    #[must_use]
    pub fn matches(&self) -> Option<&[T]> {
        match self {
            Self::Matches(items) => Some(items),
            _ => None,
        }
    }

    /// Check if a result (matches or none) has been delivered
    #[inline]
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Matches(_) | Self::NoMatches | Self::Failed(_))
    }
}

/// Controller phase, for inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// No input, no timer, no channel
    Idle,
    /// Timer running, no channel
    Pending,
    /// Channel open for the latest input
    Subscribed,
}

type Describe = dyn Fn(&str) -> QueryDescriptor + Send + Sync;
type Matcher<T> = dyn Fn(&T, &str) -> bool + Send + Sync;

enum Phase {
    Idle,
    Pending { generation: u64, timer: JoinHandle<()> },
    Subscribed { text: String, subscription: Subscription },
}

impl Phase {
    fn as_public(&self) -> QueryPhase {
        match self {
            Self::Idle => QueryPhase::Idle,
            Self::Pending { .. } => QueryPhase::Pending,
            Self::Subscribed { .. } => QueryPhase::Subscribed,
        }
    }

    /// Cancel whatever this phase holds
    fn tear_down(self) {
        match self {
            Self::Idle => {}
            Self::Pending { generation, timer } => {
                timer.abort();
                tracing::trace!("Cancelled pending query #{}", generation);
            }
            Self::Subscribed { text, subscription } => {
                subscription.dispose();
                tracing::trace!("Dropped subscription for {:?}", text);
            }
        }
    }
}

struct Controller<T> {
    binder: Binder,
    gate: Gate,
    describe: Box<Describe>,
    matcher: Arc<Matcher<T>>,
    config: DebounceConfig,
    phase: Mutex<Phase>,
    generation: Mutex<u64>,
    results: watch::Sender<SuggestionState<T>>,
}

/// Debounced, self-replacing live query
pub struct DebouncedQuery<T> {
    inner: Arc<Controller<T>>,
}

impl<T: Record> DebouncedQuery<T> {
    /// Create controller
    ///
    /// - `describe` builds the bounded descriptor for a needle
    /// - `matcher` decides whether a record matches the lower-cased needle
    pub fn new<D, M>(binder: Binder, describe: D, matcher: M, config: DebounceConfig) -> Self
    where
        D: Fn(&str) -> QueryDescriptor + Send + Sync + 'static,
        M: Fn(&T, &str) -> bool + Send + Sync + 'static,
    {
        let (results, _) = watch::channel(SuggestionState::Idle);
        Self {
            inner: Arc::new(Controller {
                binder,
                gate: Gate::Public,
                describe: Box::new(describe),
                matcher: Arc::new(matcher),
                config,
                phase: Mutex::new(Phase::Idle),
                generation: Mutex::new(0),
                results,
            }),
        }
    }

    /// Feed new input
    ///
    /// Empty (or whitespace-only) input clears results immediately without
    /// touching the network. Anything else restarts the quiet period.
    pub fn set_query(&self, text: &str) {
        let needle = text.trim().to_lowercase();
        let inner = &self.inner;

        let mut phase = inner.phase.lock();
        std::mem::replace(&mut *phase, Phase::Idle).tear_down();

        let generation = {
            let mut counter = inner.generation.lock();
            *counter += 1;
            *counter
        };

        if needle.is_empty() {
            inner.results.send_replace(SuggestionState::Idle);
            tracing::debug!("Query cleared");
            return;
        }

        inner.results.send_replace(SuggestionState::Pending);
        let controller = Arc::clone(inner);
        let quiet = inner.config.quiet_period;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            controller.fire(generation, needle);
        });
        *phase = Phase::Pending { generation, timer };
    }

    /// Clear input
    #[inline]
    pub fn clear(&self) {
        self.set_query("");
    }

    /// Latest published result
    #[must_use]
    pub fn state(&self) -> SuggestionState<T> {
        self.inner.results.borrow().clone()
    }

    /// Receiver for result changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SuggestionState<T>> {
        self.inner.results.subscribe()
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> QueryPhase {
        self.inner.phase.lock().as_public()
    }

    /// Text of the live subscription, if any
    #[must_use]
    pub fn active_query(&self) -> Option<String> {
        match &*self.inner.phase.lock() {
            Phase::Subscribed { text, .. } => Some(text.clone()),
            _ => None,
        }
    }
}

impl<T: Record> Controller<T> {
    fn fire(&self, generation: u64, needle: String) {
        let mut phase = self.phase.lock();
        let current = matches!(&*phase, Phase::Pending { generation: g, .. } if *g == generation);
        if !current {
            tracing::trace!("Stale timer #{} ignored", generation);
            return;
        }

        let descriptor = (self.describe)(&needle);
        tracing::debug!("Quiet period elapsed; subscribing for {:?}", needle);
        let sink = Arc::new(FilterSink {
            needle: needle.clone(),
            matcher: Arc::clone(&self.matcher),
            max_results: self.config.max_results,
            results: self.results.clone(),
        });
        let subscription = self.binder.bind_sink::<T>(descriptor, self.gate, sink);

        // Timer handle in the old phase belongs to this very task; dropping
        // it only detaches.
        *phase = Phase::Subscribed {
            text: needle,
            subscription,
        };
    }
}

impl<T> Drop for DebouncedQuery<T> {
    fn drop(&mut self) {
        std::mem::replace(&mut *self.inner.phase.lock(), Phase::Idle).tear_down();
    }
}

impl<T> std::fmt::Debug for DebouncedQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedQuery")
            .field("phase", &self.inner.phase.lock().as_public())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Filters each full snapshot client-side, then truncates
struct FilterSink<T> {
    needle: String,
    matcher: Arc<Matcher<T>>,
    max_results: usize,
    results: watch::Sender<SuggestionState<T>>,
}

impl<T: Record> SnapshotSink<Vec<T>> for FilterSink<T> {
    fn on_snapshot(&self, window: Vec<T>) {
        let scanned = window.len();
        let matched: Vec<T> = window
            .into_iter()
            .filter(|item| (self.matcher)(item, &self.needle))
            .take(self.max_results)
            .collect();
        tracing::debug!("{:?}: {} of {} scanned matched", self.needle, matched.len(), scanned);
        let state = if matched.is_empty() {
            SuggestionState::NoMatches
        } else {
            SuggestionState::Matches(matched)
        };
        self.results.send_replace(state);
    }

    fn on_error(&self, error: BindError) {
        self.results.send_replace(SuggestionState::Failed(error));
    }
}
