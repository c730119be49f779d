//! Binder behaviour against the in-process gateway
//!
//! Covers teardown, replace semantics, auth gating, channel failure and the
//! single-document bootstrap.

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vx_binding::prelude::*;
use vx_binding::FnSink;
use vx_gateway::{
    Direction, DocumentGateway, DocumentId, DocumentRef, Fields, MemoryAuth, MemoryGateway,
    Principal, QueryDescriptor,
};

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct Item {
    id: DocumentId,
    name: String,
    #[serde(rename = "createdAt")]
    created_at: i64,
}

impl Record for Item {
    const COLLECTION: &'static str = "items";

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct Config {
    id: DocumentId,
    theme: String,
}

impl Record for Config {
    const COLLECTION: &'static str = "config";

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn items_query() -> QueryDescriptor {
    QueryDescriptor::collection("items").order_by("createdAt", Direction::Ascending)
}

async fn add_item(gateway: &MemoryGateway, name: &str, created_at: i64) {
    gateway
        .create("items", fields(json!({"name": name, "createdAt": created_at})))
        .await
        .unwrap();
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

/// Records every snapshot length in arrival order
fn recording_sink() -> (Arc<dyn SnapshotSink<Vec<Item>>>, Arc<Mutex<Vec<usize>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let sink = FnSink::new(
        move |items: Vec<Item>| record.lock().push(items.len()),
        |err| panic!("unexpected error: {err}"),
    );
    (Arc::new(sink), seen)
}

#[tokio::test]
async fn snapshots_arrive_in_order_as_full_replacements() {
    let gateway = Arc::new(MemoryGateway::new());
    let binder = Binder::new(gateway.clone());
    let (sink, seen) = recording_sink();

    let _sub = binder.bind_sink::<Item>(items_query(), Gate::Public, sink);
    add_item(&gateway, "Rice", 1).await;
    add_item(&gateway, "Dal", 2).await;
    add_item(&gateway, "Tea", 3).await;

    eventually(|| seen.lock().len() == 4).await;
    assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);
    assert_eq!(gateway.subscriptions_opened(), 1);
}

#[tokio::test]
async fn no_callbacks_after_dispose() {
    let gateway = Arc::new(MemoryGateway::new());
    let binder = Binder::new(gateway.clone());
    let (sink, seen) = recording_sink();

    let sub = binder.bind_sink::<Item>(items_query(), Gate::Public, sink);
    eventually(|| seen.lock().len() == 1).await;

    sub.dispose();
    sub.dispose();
    for i in 0..20 {
        add_item(&gateway, "Late", i).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(seen.lock().len(), 1);
    eventually(|| gateway.open_channels() == 0).await;
}

#[tokio::test]
async fn dispose_from_inside_callback() {
    let gateway = Arc::new(MemoryGateway::new());
    let binder = Binder::new(gateway.clone());
    let slot: Arc<Mutex<Option<Arc<Subscription>>>> = Arc::new(Mutex::new(None));
    let calls = Arc::new(AtomicUsize::new(0));

    let slot_in_sink = Arc::clone(&slot);
    let calls_in_sink = Arc::clone(&calls);
    let sub = Arc::new(binder.bind::<Item, _, _>(
        items_query(),
        move |_| {
            if calls_in_sink.fetch_add(1, Ordering::SeqCst) == 1 {
                if let Some(sub) = slot_in_sink.lock().as_ref() {
                    sub.dispose();
                }
            }
        },
        |_| {},
    ));
    *slot.lock() = Some(Arc::clone(&sub));

    for i in 0..5 {
        add_item(&gateway, "Item", i).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!sub.is_active());
    slot.lock().take();
}

#[tokio::test]
async fn gated_binding_without_principal_opens_nothing() {
    let gateway = Arc::new(MemoryGateway::new());
    let auth = Arc::new(MemoryAuth::new());
    let binder = Binder::new(gateway.clone()).with_auth(auth.clone());

    let live = binder.live_collection::<Item>(items_query(), Gate::Authenticated);

    assert!(live.state().is_unauthenticated());
    assert!(live.state().error().is_none());
    assert_eq!(gateway.subscriptions_opened(), 0);
}

#[tokio::test]
async fn gated_binding_follows_sign_in_and_out() {
    let gateway = Arc::new(MemoryGateway::new());
    let auth = Arc::new(MemoryAuth::new());
    let binder = Binder::new(gateway.clone()).with_auth(auth.clone());
    add_item(&gateway, "Rice", 1).await;

    let live = binder.live_collection::<Item>(items_query(), Gate::Authenticated);
    assert!(live.state().is_unauthenticated());

    auth.sign_in(Principal::new("admin"));
    let state = live.wait_until(BindingState::is_ready).await;
    assert_eq!(state.data().map(Vec::len), Some(1));
    assert_eq!(gateway.subscriptions_opened(), 1);

    auth.sign_out();
    live.wait_until(BindingState::is_unauthenticated).await;
    eventually(|| gateway.open_channels() == 0).await;

    // Writes while signed out never reach the consumer
    add_item(&gateway, "Dal", 2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(live.state().is_unauthenticated());

    auth.sign_in(Principal::new("admin"));
    let state = live.wait_until(BindingState::is_ready).await;
    assert_eq!(state.data().map(Vec::len), Some(2));
    assert_eq!(gateway.subscriptions_opened(), 2);
}

#[tokio::test]
async fn channel_error_is_terminal_and_not_retried() {
    let gateway = Arc::new(MemoryGateway::new());
    let binder = Binder::new(gateway.clone());

    let live = binder.live_collection::<Item>(items_query(), Gate::Public);
    live.wait_until(BindingState::is_ready).await;

    gateway.break_channels("items", "connection reset");
    let state = live.wait_until(|s| s.error().is_some()).await;
    assert!(matches!(state, BindingState::Failed(BindError::Gateway(_))));

    add_item(&gateway, "Rice", 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    eventually(|| !live.is_active()).await;
    assert_eq!(gateway.subscriptions_opened(), 1);
    assert!(live.state().error().is_some());
}

#[tokio::test]
async fn bootstrap_writes_default_once_then_delivers_it_once() {
    let gateway = Arc::new(MemoryGateway::new());
    let auth = Arc::new(MemoryAuth::signed_in(Principal::new("admin")));
    let binder = Binder::new(gateway.clone()).with_auth(auth);

    let deliveries = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&deliveries);
    let sink = FnSink::new(
        move |config: Config| record.lock().push(config.theme),
        |err| panic!("unexpected error: {err}"),
    );

    let reference = DocumentRef::new("config", "store");
    let _sub = binder.bind_document::<Config>(
        reference.clone(),
        Gate::Authenticated,
        OnMissing::Initialize(fields(json!({"theme": "saffron"}))),
        Arc::new(sink),
    );

    eventually(|| !deliveries.lock().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(gateway.writes(), 1);
    assert_eq!(*deliveries.lock(), vec!["saffron".to_string()]);
    assert!(gateway.get(&reference).await.unwrap().is_some());
}

#[tokio::test]
async fn bootstrap_leaves_existing_document_alone() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed("config", "store", fields(json!({"theme": "indigo"})));
    let auth = Arc::new(MemoryAuth::signed_in(Principal::new("admin")));
    let binder = Binder::new(gateway.clone()).with_auth(auth);

    let live = binder.live_document::<Config>(
        DocumentRef::new("config", "store"),
        Gate::Authenticated,
        OnMissing::Initialize(fields(json!({"theme": "saffron"}))),
    );

    let state = live.wait_until(BindingState::is_ready).await;
    assert_eq!(state.data().map(|c| c.theme.as_str()), Some("indigo"));
    assert_eq!(gateway.writes(), 0);
}

#[tokio::test]
async fn missing_document_is_reported_as_not_found() {
    let gateway = Arc::new(MemoryGateway::new());
    let binder = Binder::new(gateway.clone());

    let live = binder.live_document::<Config>(
        DocumentRef::new("config", "absent"),
        Gate::Public,
        OnMissing::Report,
    );

    let state = live.wait_until(|s| !s.is_loading()).await;
    assert_eq!(state, BindingState::NotFound);
    assert_eq!(gateway.writes(), 0);
}

#[tokio::test]
async fn close_on_missing_ignores_later_creation() {
    let gateway = Arc::new(MemoryGateway::new());
    let binder = Binder::new(gateway.clone());
    let reference = DocumentRef::new("config", "late");

    let closing = binder.live_document::<Config>(reference.clone(), Gate::Public, OnMissing::Close);
    let following = binder.live_document::<Config>(reference.clone(), Gate::Public, OnMissing::Report);
    assert_eq!(closing.wait_until(|s| !s.is_loading()).await, BindingState::NotFound);
    assert_eq!(following.wait_until(|s| !s.is_loading()).await, BindingState::NotFound);
    eventually(|| gateway.open_channels() == 1).await;

    gateway
        .create_with_id(&reference, fields(json!({"theme": "saffron"})))
        .await
        .unwrap();
    let state = following.wait_until(BindingState::is_ready).await;
    assert_eq!(state.data().map(|c| c.theme.as_str()), Some("saffron"));

    assert_eq!(closing.state(), BindingState::NotFound);
    assert!(!closing.is_active());
    assert_eq!(gateway.subscriptions_opened(), 2);
}

#[tokio::test]
async fn listen_failure_surfaces_verbatim() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.fail_next_listen(vx_gateway::GatewayError::PermissionDenied("rules".into()));
    let binder = Binder::new(gateway.clone());

    let live = binder.live_collection::<Item>(items_query(), Gate::Public);
    assert_eq!(
        live.state(),
        BindingState::Failed(BindError::Gateway(vx_gateway::GatewayError::PermissionDenied(
            "rules".into()
        )))
    );
    assert!(!live.is_active());
}
