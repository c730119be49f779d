//! In-process document store
//!
//! [`MemoryGateway`] implements [`DocumentGateway`] over ordered maps and
//! keeps one unbounded push channel per listener. Every mutation is applied
//! and fanned out under the same write lock, so each listener sees snapshots
//! in commit order. A listener is only notified when its result set actually
//! changed.
//!
//! The gateway also counts channel openings and writes and can inject
//! channel faults, which is what the binding tests observe.

use crate::document::{Document, DocumentId, DocumentRef, Fields};
use crate::error::GatewayError;
use crate::gateway::{DocumentGateway, SnapshotStream};
use crate::query::{ListenTarget, QueryDescriptor, RawSnapshot};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::channel::mpsc;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

type Collections = BTreeMap<String, BTreeMap<DocumentId, Fields>>;

/// Registered push channel
#[derive(Debug)]
struct Listener {
    target: ListenTarget,
    last: RawSnapshot,
    tx: mpsc::UnboundedSender<Result<RawSnapshot, GatewayError>>,
}

/// Gateway statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Channels opened since creation
    pub subscriptions_opened: usize,
    /// Channels currently open
    pub open_channels: usize,
    /// Successful writes since creation
    pub writes: usize,
}

/// In-process document store with live queries
#[derive(Debug, Default)]
pub struct MemoryGateway {
    collections: RwLock<Collections>,
    listeners: DashMap<u64, Listener>,
    next_listener: AtomicU64,
    subscriptions_opened: AtomicUsize,
    writes: AtomicUsize,
    fail_next_listen: Mutex<Option<GatewayError>>,
}

impl MemoryGateway {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document without counting it as a write or notifying listeners
    pub fn seed(&self, collection: &str, id: impl Into<DocumentId>, fields: Fields) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.into(), fields);
    }

    /// Channels opened since creation
    #[inline]
    #[must_use]
    pub fn subscriptions_opened(&self) -> usize {
        self.subscriptions_opened.load(Ordering::SeqCst)
    }

    /// Channels whose receiving end is still alive
    #[must_use]
    pub fn open_channels(&self) -> usize {
        self.listeners
            .iter()
            .filter(|entry| !entry.value().tx.is_closed())
            .count()
    }

    /// Successful writes since creation
    #[inline]
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of all counters
    #[must_use]
    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            subscriptions_opened: self.subscriptions_opened(),
            open_channels: self.open_channels(),
            writes: self.writes(),
        }
    }

    /// Make the next `listen` call fail with `error`
    pub fn fail_next_listen(&self, error: GatewayError) {
        *self.fail_next_listen.lock() = Some(error);
    }

    /// Fail every open channel on `collection` and close it
    ///
    /// Returns the number of channels broken.
    pub fn break_channels(&self, collection: &str, message: &str) -> usize {
        let _guard = self.collections.write();
        let doomed: Vec<u64> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().target.collection() == collection)
            .map(|entry| *entry.key())
            .collect();

        for key in &doomed {
            if let Some((_, listener)) = self.listeners.remove(key) {
                let _ = listener
                    .tx
                    .unbounded_send(Err(GatewayError::Channel(message.to_string())));
                listener.tx.close_channel();
            }
        }
        tracing::warn!("Broke {} channel(s) on {}: {}", doomed.len(), collection, message);
        doomed.len()
    }

    fn evaluate(collections: &Collections, target: &ListenTarget) -> RawSnapshot {
        match target {
            ListenTarget::Query(query) => RawSnapshot::new(Self::run_query(collections, query)),
            ListenTarget::Document(reference) => RawSnapshot::new(
                Self::lookup(collections, reference).into_iter().collect(),
            ),
        }
    }

    fn run_query(collections: &Collections, query: &QueryDescriptor) -> Vec<Document> {
        let docs: Vec<Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        query.apply(&docs)
    }

    fn lookup(collections: &Collections, reference: &DocumentRef) -> Option<Document> {
        collections
            .get(&reference.collection)
            .and_then(|docs| docs.get(&reference.id))
            .map(|fields| Document::new(reference.id.clone(), fields.clone()))
    }

    /// Push fresh results to listeners on `collection`; caller holds the write lock
    fn fan_out(&self, collections: &Collections, collection: &str) {
        let mut closed = Vec::new();
        for mut entry in self.listeners.iter_mut() {
            let key = *entry.key();
            let listener = entry.value_mut();
            if listener.tx.is_closed() {
                closed.push(key);
                continue;
            }
            if listener.target.collection() != collection {
                continue;
            }
            let snapshot = Self::evaluate(collections, &listener.target);
            if snapshot == listener.last {
                continue;
            }
            if listener.tx.unbounded_send(Ok(snapshot.clone())).is_err() {
                closed.push(key);
                continue;
            }
            listener.last = snapshot;
        }
        for key in closed {
            self.listeners.remove(&key);
            tracing::trace!("Pruned closed channel {}", key);
        }
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        metrics::counter!("vx_gateway_writes_total").increment(1);
    }
}

#[async_trait]
impl DocumentGateway for MemoryGateway {
    async fn create(&self, collection: &str, fields: Fields) -> Result<DocumentId, GatewayError> {
        if collection.trim().is_empty() {
            return Err(GatewayError::InvalidQuery("collection name is empty".into()));
        }
        let id = DocumentId::generate();
        let mut collections = self.collections.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        self.record_write();
        self.fan_out(&collections, collection);
        tracing::debug!("Created {}/{}", collection, id);
        Ok(id)
    }

    async fn create_with_id(
        &self,
        reference: &DocumentRef,
        fields: Fields,
    ) -> Result<(), GatewayError> {
        let mut collections = self.collections.write();
        let docs = collections.entry(reference.collection.clone()).or_default();
        if docs.contains_key(&reference.id) {
            return Err(GatewayError::already_exists(
                &reference.collection,
                reference.id.as_str(),
            ));
        }
        docs.insert(reference.id.clone(), fields);
        self.record_write();
        self.fan_out(&collections, &reference.collection);
        tracing::debug!("Created {}", reference);
        Ok(())
    }

    async fn update(&self, reference: &DocumentRef, patch: Fields) -> Result<(), GatewayError> {
        let mut collections = self.collections.write();
        let fields = collections
            .get_mut(&reference.collection)
            .and_then(|docs| docs.get_mut(&reference.id))
            .ok_or_else(|| GatewayError::not_found(&reference.collection, reference.id.as_str()))?;
        for (key, value) in patch {
            fields.insert(key, value);
        }
        self.record_write();
        self.fan_out(&collections, &reference.collection);
        tracing::debug!("Updated {}", reference);
        Ok(())
    }

    async fn increment(
        &self,
        reference: &DocumentRef,
        field: &str,
        by: i64,
        max: Option<i64>,
    ) -> Result<i64, GatewayError> {
        let mut collections = self.collections.write();
        let fields = collections
            .get_mut(&reference.collection)
            .and_then(|docs| docs.get_mut(&reference.id))
            .ok_or_else(|| GatewayError::not_found(&reference.collection, reference.id.as_str()))?;
        let current = match fields.get(field) {
            None | Some(serde_json::Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                GatewayError::FailedPrecondition(format!("{reference}.{field} is not an integer"))
            })?,
        };
        let next = current.saturating_add(by);
        if let Some(max) = max.filter(|max| next > *max) {
            return Err(GatewayError::FailedPrecondition(format!(
                "{reference}.{field} would exceed {max}"
            )));
        }
        fields.insert(field.to_string(), serde_json::Value::from(next));
        self.record_write();
        self.fan_out(&collections, &reference.collection);
        tracing::debug!("Incremented {}.{} to {}", reference, field, next);
        Ok(next)
    }

    async fn delete(&self, reference: &DocumentRef) -> Result<(), GatewayError> {
        let mut collections = self.collections.write();
        let removed = collections
            .get_mut(&reference.collection)
            .and_then(|docs| docs.remove(&reference.id))
            .is_some();
        if removed {
            self.record_write();
            self.fan_out(&collections, &reference.collection);
            tracing::debug!("Deleted {}", reference);
        }
        Ok(())
    }

    async fn get(&self, reference: &DocumentRef) -> Result<Option<Document>, GatewayError> {
        Ok(Self::lookup(&self.collections.read(), reference))
    }

    async fn query(&self, query: &QueryDescriptor) -> Result<Vec<Document>, GatewayError> {
        query.validate()?;
        Ok(Self::run_query(&self.collections.read(), query))
    }

    fn listen(&self, target: &ListenTarget) -> Result<SnapshotStream, GatewayError> {
        if let ListenTarget::Query(query) = target {
            query.validate()?;
        }
        if let Some(error) = self.fail_next_listen.lock().take() {
            tracing::warn!("Injected listen failure on {}: {}", target, error);
            return Err(error);
        }

        // Read lock excludes writers: no mutation can land between the
        // initial snapshot and registration.
        let collections = self.collections.read();
        let initial = Self::evaluate(&collections, target);
        let (tx, rx) = mpsc::unbounded();
        tx.unbounded_send(Ok(initial.clone()))
            .map_err(|e| GatewayError::Channel(e.to_string()))?;

        let key = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners.insert(
            key,
            Listener {
                target: target.clone(),
                last: initial,
                tx,
            },
        );
        drop(collections);

        self.subscriptions_opened.fetch_add(1, Ordering::SeqCst);
        metrics::counter!("vx_gateway_listens_total").increment(1);
        tracing::debug!("Opened channel {} on {}", key, target);
        Ok(Box::pin(rx))
    }
}
