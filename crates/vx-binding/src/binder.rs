//! Subscription binder
//!
//! [`Binder::bind`] turns a query descriptor into a live result set delivered
//! to a [`SnapshotSink`]:
//!
//! ```text
//! QueryDescriptor ─▶ DocumentGateway::listen ─▶ channel task ─▶ decode ─▶ Liveness ─▶ sink
//!                          ▲                        │
//!                     AuthProvider::watch ──────────┘ (sign-out closes the channel)
//! ```
//!
//! Guarantees:
//! - one channel per subscription, opened at most once per authenticated period
//! - snapshots reach the sink in channel order, each one a full replacement
//! - channel errors are reported once and end the subscription; nothing retries
//! - a gated binding without a principal reports Unauthenticated and opens no channel
//!
//! Binding must happen inside a Tokio runtime: each subscription spawns one task.

use crate::error::BindError;
use crate::record::{decode_collection, decode_document, Record};
use crate::sink::{FnSink, SnapshotSink};
use crate::state::{LiveBinding, StatePublisher};
use crate::subscription::{Liveness, Subscription, SubscriptionId};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use vx_gateway::{
    AuthProvider, DocumentGateway, DocumentRef, Fields, GatewayError, ListenTarget, Principal,
    QueryDescriptor, RawSnapshot, SnapshotStream,
};

/// Whether a binding needs a signed-in principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gate {
    /// Open to anyone
    #[default]
    Public,
    /// Requires a principal; closes on sign-out, reopens on sign-in
    Authenticated,
}

/// What a single-document binding does when the document is absent
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OnMissing {
    /// Report it through `on_missing` and keep listening
    #[default]
    Report,
    /// Report it through `on_missing` once, then close the channel
    Close,
    /// Write these fields once, before the channel opens
    Initialize(Fields),
}

/// Opens live bindings against a gateway
#[derive(Debug, Clone)]
pub struct Binder {
    gateway: Arc<dyn DocumentGateway>,
    auth: Option<Arc<dyn AuthProvider>>,
}

impl Binder {
    /// Create binder without an auth provider
    ///
    /// Gated bindings opened by such a binder stay Unauthenticated.
    #[inline]
    #[must_use]
    pub fn new(gateway: Arc<dyn DocumentGateway>) -> Self {
        Self {
            gateway,
            auth: None,
        }
    }

    /// With auth provider
    #[inline]
    #[must_use]
    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Underlying gateway, for mutators
    #[inline]
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn DocumentGateway> {
        &self.gateway
    }

    /// Current principal, if an auth provider is attached and someone is signed in
    #[must_use]
    pub fn principal(&self) -> Option<Principal> {
        self.auth.as_ref().and_then(|auth| auth.current())
    }

    /// Bind a public query to a pair of callbacks
    pub fn bind<T, S, E>(&self, descriptor: QueryDescriptor, on_snapshot: S, on_error: E) -> Subscription
    where
        T: Record,
        S: Fn(Vec<T>) + Send + Sync + 'static,
        E: Fn(BindError) + Send + Sync + 'static,
    {
        self.bind_sink(descriptor, Gate::Public, Arc::new(FnSink::new(on_snapshot, on_error)))
    }

    /// Bind a query to a sink
    pub fn bind_sink<T: Record>(
        &self,
        descriptor: QueryDescriptor,
        gate: Gate,
        sink: Arc<dyn SnapshotSink<Vec<T>>>,
    ) -> Subscription {
        self.open(
            ListenTarget::Query(descriptor),
            gate,
            None,
            false,
            decode_collection::<T>,
            sink,
        )
    }

    /// Bind a single document to a sink
    pub fn bind_document<T: Record>(
        &self,
        reference: DocumentRef,
        gate: Gate,
        on_missing: OnMissing,
        sink: Arc<dyn SnapshotSink<T>>,
    ) -> Subscription {
        let close_on_missing = on_missing == OnMissing::Close;
        let bootstrap = match on_missing {
            OnMissing::Report | OnMissing::Close => None,
            OnMissing::Initialize(defaults) => Some(defaults),
        };
        self.open(
            ListenTarget::Document(reference),
            gate,
            bootstrap,
            close_on_missing,
            decode_document::<T>,
            sink,
        )
    }

    /// Bind a query into an observable state cell
    #[must_use]
    pub fn live_collection<T: Record>(&self, descriptor: QueryDescriptor, gate: Gate) -> LiveBinding<Vec<T>> {
        let (publisher, state) = StatePublisher::channel();
        let subscription = self.bind_sink(descriptor, gate, Arc::new(publisher));
        LiveBinding::new(subscription, state)
    }

    /// Bind a single document into an observable state cell
    #[must_use]
    pub fn live_document<T: Record>(
        &self,
        reference: DocumentRef,
        gate: Gate,
        on_missing: OnMissing,
    ) -> LiveBinding<T> {
        let (publisher, state) = StatePublisher::channel();
        let subscription = self.bind_document(reference, gate, on_missing, Arc::new(publisher));
        LiveBinding::new(subscription, state)
    }

    fn open<V: Send + 'static>(
        &self,
        target: ListenTarget,
        gate: Gate,
        bootstrap: Option<Fields>,
        close_on_missing: bool,
        decode: fn(RawSnapshot) -> Option<V>,
        sink: Arc<dyn SnapshotSink<V>>,
    ) -> Subscription {
        let id = SubscriptionId::next();
        let liveness = Arc::new(Liveness::new());
        let subscription = Subscription::new(id, target.to_string(), Arc::clone(&liveness));

        let auth = match gate {
            Gate::Public => None,
            Gate::Authenticated => Some(match &self.auth {
                Some(auth) => auth.watch(),
                // No provider: nobody can ever sign in
                None => watch::channel(None).1,
            }),
        };
        let signed_in = auth.as_ref().map_or(true, |rx| rx.borrow().is_some());

        let task = ChannelTask {
            id,
            gateway: Arc::clone(&self.gateway),
            auth,
            target,
            bootstrap,
            close_on_missing,
            decode,
            sink,
            liveness,
        };

        // Open synchronously whenever no async work has to come first, so
        // query errors and the unauthenticated state are visible on return.
        let channel = if !signed_in {
            tracing::debug!("{} waiting for a principal on {}", id, task.target);
            task.deliver_unauthenticated();
            None
        } else if task.bootstrap.is_none() {
            match task.gateway.listen(&task.target) {
                Ok(stream) => {
                    tracing::debug!("{} opened channel on {}", id, task.target);
                    Some(stream)
                }
                Err(err) => {
                    tracing::warn!("{} failed to open {}: {}", id, task.target, err);
                    task.deliver_error(err.into());
                    return subscription;
                }
            }
        } else {
            None
        };

        subscription.attach(tokio::spawn(task.run(channel)));
        subscription
    }
}

/// Why the pump loop stopped
enum PumpEvent {
    Snapshot(Result<RawSnapshot, GatewayError>),
    Closed,
    SignedOut,
}

/// Owns the channel of one subscription
struct ChannelTask<V> {
    id: SubscriptionId,
    gateway: Arc<dyn DocumentGateway>,
    auth: Option<watch::Receiver<Option<Principal>>>,
    target: ListenTarget,
    bootstrap: Option<Fields>,
    close_on_missing: bool,
    decode: fn(RawSnapshot) -> Option<V>,
    sink: Arc<dyn SnapshotSink<V>>,
    liveness: Arc<Liveness>,
}

impl<V: Send + 'static> ChannelTask<V> {
    async fn run(mut self, mut channel: Option<SnapshotStream>) {
        loop {
            let mut stream = match channel.take() {
                Some(stream) => stream,
                None => {
                    if !self.wait_for_principal().await {
                        return;
                    }
                    match self.connect().await {
                        Ok(stream) => stream,
                        Err(err) => {
                            tracing::warn!("{} failed to open {}: {}", self.id, self.target, err);
                            self.deliver_error(err);
                            return;
                        }
                    }
                }
            };

            let mut delivered = 0_usize;
            loop {
                let event = tokio::select! {
                    biased;
                    () = signed_out(&mut self.auth) => PumpEvent::SignedOut,
                    item = stream.next() => match item {
                        Some(item) => PumpEvent::Snapshot(item),
                        None => PumpEvent::Closed,
                    },
                };

                match event {
                    PumpEvent::Snapshot(Ok(raw)) => {
                        delivered += 1;
                        tracing::trace!("{} snapshot #{} ({} docs)", self.id, delivered, raw.len());
                        if !self.deliver_snapshot(raw) && self.close_on_missing {
                            tracing::debug!("{} {} is missing; closing channel", self.id, self.target);
                            return;
                        }
                    }
                    PumpEvent::Snapshot(Err(err)) => {
                        tracing::warn!("{} channel on {} failed: {}", self.id, self.target, err);
                        self.deliver_error(err.into());
                        return;
                    }
                    PumpEvent::Closed => {
                        tracing::debug!("{} channel on {} closed by store", self.id, self.target);
                        return;
                    }
                    PumpEvent::SignedOut => {
                        drop(stream);
                        tracing::info!("{} principal lost; closed channel on {}", self.id, self.target);
                        self.deliver_unauthenticated();
                        break;
                    }
                }
            }
        }
    }

    /// Returns `false` if the auth provider went away while waiting
    async fn wait_for_principal(&mut self) -> bool {
        let Some(rx) = self.auth.as_mut() else {
            return true;
        };
        let signed_in = rx.wait_for(Option::is_some).await.is_ok();
        if !signed_in {
            tracing::debug!("{} auth provider dropped; giving up", self.id);
        }
        signed_in
    }

    /// Run the one-time bootstrap, then open the channel
    async fn connect(&mut self) -> Result<SnapshotStream, BindError> {
        if let (Some(defaults), ListenTarget::Document(reference)) =
            (self.bootstrap.take(), &self.target)
        {
            let existing = self
                .gateway
                .get(reference)
                .await
                .map_err(BindError::Bootstrap)?;
            if existing.is_none() {
                match self.gateway.create_with_id(reference, defaults).await {
                    Ok(()) => tracing::info!("{} initialized {} with defaults", self.id, reference),
                    Err(GatewayError::AlreadyExists { .. }) => {
                        tracing::debug!("{} lost bootstrap race for {}", self.id, reference);
                    }
                    Err(err) => return Err(BindError::Bootstrap(err)),
                }
            }
        }
        let stream = self.gateway.listen(&self.target)?;
        tracing::debug!("{} opened channel on {}", self.id, self.target);
        Ok(stream)
    }

    /// Returns `false` when the target was missing
    fn deliver_snapshot(&self, raw: RawSnapshot) -> bool {
        let sink = &self.sink;
        match (self.decode)(raw) {
            Some(value) => {
                self.liveness.deliver(|| sink.on_snapshot(value));
                true
            }
            None => {
                self.liveness.deliver(|| sink.on_missing());
                false
            }
        }
    }

    fn deliver_error(&self, error: BindError) {
        let sink = &self.sink;
        self.liveness.deliver(|| sink.on_error(error));
    }

    fn deliver_unauthenticated(&self) {
        let sink = &self.sink;
        self.liveness.deliver(|| sink.on_unauthenticated());
    }
}

/// Resolves when the principal goes away; never resolves for public bindings
async fn signed_out(auth: &mut Option<watch::Receiver<Option<Principal>>>) {
    match auth {
        Some(rx) => {
            let provider_gone = rx.wait_for(Option::is_none).await.is_err();
            if provider_gone {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BindingState;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vx_gateway::{DocumentId, MemoryGateway};

    #[derive(Debug, Clone, Deserialize)]
    struct Item {
        id: DocumentId,
    }

    impl Record for Item {
        const COLLECTION: &'static str = "items";

        fn id(&self) -> &DocumentId {
            &self.id
        }
    }

    #[tokio::test]
    async fn invalid_query_reports_error_synchronously() {
        let gateway = Arc::new(MemoryGateway::new());
        let binder = Binder::new(gateway.clone());
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);

        let sub = binder.bind::<Item, _, _>(
            QueryDescriptor::collection("items").limit(0),
            |_| {},
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(!sub.is_active());
        assert_eq!(gateway.subscriptions_opened(), 0);
    }

    #[tokio::test]
    async fn gated_without_provider_stays_unauthenticated() {
        let gateway = Arc::new(MemoryGateway::new());
        let binder = Binder::new(gateway.clone());
        let live = binder.live_collection::<Item>(QueryDescriptor::collection("items"), Gate::Authenticated);

        assert!(matches!(live.state(), BindingState::Unauthenticated));
        assert_eq!(gateway.subscriptions_opened(), 0);
    }
}
