//! Domain hooks against the in-process store

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use vx_binding::{BindingState, SuggestionState};
use vx_commerce::records::SettingsPatch;
use vx_commerce::{
    redeem_coupon, CatalogFilter, CommerceError, CouponManager, NewCoupon, NewProduct, OrderBoard, OrderFilter,
    OrderStatus, OrderTracker, ProductCatalog, ProductPatch, Role, SearchConfig, SearchSuggestions,
    SettingsConfig, SettingsStore, UserDirectory,
};
use vx_gateway::{
    Document, DocumentGateway, DocumentId, DocumentRef, Fields, GatewayError, ListenTarget,
    MemoryGateway, QueryDescriptor, SnapshotStream,
};
use vx_test_utils::{eventually, save10, seeded_store, TestStore, ADMIN_UID};

fn names(products: &[vx_commerce::Product]) -> Vec<&str> {
    products.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn catalog_is_newest_first_and_follows_writes() {
    let store = seeded_store();
    let catalog = ProductCatalog::open(&store.binder, &CatalogFilter::storefront());

    let state = catalog.binding().wait_until(BindingState::is_ready).await;
    assert_eq!(
        names(state.data().unwrap()),
        vec!["Basmati Rice 5kg", "Rice Flour 1kg", "Toor Dal 1kg", "Green Tea", "Filter Coffee"]
    );

    let id = catalog
        .add(NewProduct::new("Masala Chai", 180.0, "beverages").with_stock(4))
        .await
        .unwrap();
    let state = catalog
        .binding()
        .wait_until(|s| s.data().is_some_and(|p| p.len() == 6))
        .await;
    assert_eq!(state.data().unwrap()[0].id, id);

    catalog
        .update(&id, ProductPatch { is_active: Some(false), ..ProductPatch::default() })
        .await
        .unwrap();
    catalog
        .binding()
        .wait_until(|s| s.data().is_some_and(|p| p.len() == 5))
        .await;
    assert!(catalog.products().iter().all(|p| p.id != id));
}

#[tokio::test]
async fn catalog_category_filter() {
    let store = seeded_store();
    let catalog = ProductCatalog::open(&store.binder, &CatalogFilter::all().in_category("beverages"));
    let state = catalog.binding().wait_until(BindingState::is_ready).await;
    assert_eq!(names(state.data().unwrap()), vec!["Green Tea", "Filter Coffee"]);
}

#[tokio::test]
async fn catalog_rejects_bad_media_without_writing() {
    let store = seeded_store();
    let catalog = ProductCatalog::open(&store.binder, &CatalogFilter::all());

    let err = catalog
        .add(NewProduct::new("Ghee", 550.0, "grocery").with_image("https://cdn.example.com/ghee.mp4"))
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Media(_)));

    let err = catalog
        .update(&DocumentId::from("p1"), ProductPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Validation(_)));
    assert_eq!(store.gateway.writes(), 0);
}

#[tokio::test]
async fn catalog_delete_and_missing_update() {
    let store = seeded_store();
    let catalog = ProductCatalog::open(&store.binder, &CatalogFilter::all());
    catalog.binding().wait_until(BindingState::is_ready).await;

    catalog.delete(&DocumentId::from("p3")).await.unwrap();
    catalog
        .binding()
        .wait_until(|s| s.data().is_some_and(|p| p.len() == 4))
        .await;

    let err = catalog
        .update(&DocumentId::from("p3"), ProductPatch { stock: Some(5), ..ProductPatch::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Gateway(e) if e.is_not_found()));
}

#[tokio::test]
async fn coupon_manager_requires_sign_in() {
    let store = TestStore::new();
    store.seed_coupon("c1", save10());
    let coupons = CouponManager::open(&store.binder);

    assert_eq!(coupons.state(), BindingState::Unauthenticated);
    assert_eq!(store.gateway.subscriptions_opened(), 0);

    let err = coupons.add(NewCoupon::percentage("NEW5", 5.0)).await.unwrap_err();
    assert!(matches!(err, CommerceError::Unauthenticated));

    // Nothing is loaded, so every code is unknown
    assert_eq!(coupons.validate("SAVE10", 1000.0).message, "Invalid coupon code");

    store.sign_in_admin();
    let state = coupons.binding().wait_until(BindingState::is_ready).await;
    assert_eq!(state.data().map(Vec::len), Some(1));

    store.sign_out();
    coupons.binding().wait_until(BindingState::is_unauthenticated).await;
    eventually(|| store.gateway.open_channels() == 0).await;
}

#[tokio::test]
async fn coupon_manager_validates_from_snapshot() {
    let store = TestStore::signed_in();
    store.seed_coupon("c1", save10());
    let coupons = CouponManager::open(&store.binder);
    coupons.binding().wait_until(BindingState::is_ready).await;

    let ok = coupons.validate("save10", 1000.0);
    assert!(ok.valid);
    assert_eq!(ok.discount, 50.0);

    let low = coupons.validate("SAVE10", 300.0);
    assert!(!low.valid);
    assert_eq!(low.message, "Minimum purchase of ₹500 required");
}

#[tokio::test]
async fn coupon_codes_are_normalized_and_unique() {
    let store = TestStore::signed_in();
    let coupons = CouponManager::open(&store.binder);
    coupons.binding().wait_until(BindingState::is_ready).await;

    let id = coupons
        .add(NewCoupon::fixed(" diwali100 ", 100.0).with_min_purchase(999.0))
        .await
        .unwrap();
    let state = coupons
        .binding()
        .wait_until(|s| s.data().is_some_and(|c| c.len() == 1))
        .await;
    let stored = &state.data().unwrap()[0];
    assert_eq!(stored.id, id);
    assert_eq!(stored.code, "DIWALI100");
    assert_eq!(stored.usage_count, 0);

    let err = coupons.add(NewCoupon::fixed("Diwali100", 50.0)).await.unwrap_err();
    assert!(matches!(err, CommerceError::Duplicate { .. }));

    let err = coupons.add(NewCoupon::percentage("BIG", 150.0)).await.unwrap_err();
    assert!(matches!(err, CommerceError::Validation(_)));
}

#[tokio::test]
async fn coupon_toggle_and_redeem() {
    let store = TestStore::signed_in();
    let mut limited = save10();
    limited["usageLimit"] = json!(1);
    store.seed_coupon("c1", limited);
    let coupons = CouponManager::open(&store.binder);
    coupons.binding().wait_until(BindingState::is_ready).await;
    let id = DocumentId::from("c1");

    coupons.set_active(&id, false).await.unwrap();
    coupons
        .binding()
        .wait_until(|s| s.data().is_some_and(|c| !c[0].is_active))
        .await;
    assert_eq!(coupons.validate("SAVE10", 1000.0).message, "This coupon is no longer active");

    coupons.set_active(&id, true).await.unwrap();
    assert_eq!(coupons.redeem(&id).await.unwrap(), 1);
    let err = coupons.redeem(&id).await.unwrap_err();
    assert!(matches!(err, CommerceError::CouponRejected(_)));

    coupons
        .binding()
        .wait_until(|s| s.data().is_some_and(|c| c[0].usage_count == 1 && c[0].is_active))
        .await;
    assert_eq!(
        coupons.validate("SAVE10", 1000.0).message,
        "This coupon has reached its usage limit"
    );

    coupons.delete(&id).await.unwrap();
    coupons
        .binding()
        .wait_until(|s| s.data().is_some_and(Vec::is_empty))
        .await;
}

/// Delays reads so concurrent read-then-write callers interleave
#[derive(Debug)]
struct SlowReads(Arc<MemoryGateway>);

#[async_trait]
impl DocumentGateway for SlowReads {
    async fn create(&self, collection: &str, fields: Fields) -> Result<DocumentId, GatewayError> {
        self.0.create(collection, fields).await
    }

    async fn create_with_id(&self, reference: &DocumentRef, fields: Fields) -> Result<(), GatewayError> {
        self.0.create_with_id(reference, fields).await
    }

    async fn update(&self, reference: &DocumentRef, patch: Fields) -> Result<(), GatewayError> {
        self.0.update(reference, patch).await
    }

    async fn increment(
        &self,
        reference: &DocumentRef,
        field: &str,
        by: i64,
        max: Option<i64>,
    ) -> Result<i64, GatewayError> {
        self.0.increment(reference, field, by, max).await
    }

    async fn delete(&self, reference: &DocumentRef) -> Result<(), GatewayError> {
        self.0.delete(reference).await
    }

    async fn get(&self, reference: &DocumentRef) -> Result<Option<Document>, GatewayError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.0.get(reference).await
    }

    async fn query(&self, query: &QueryDescriptor) -> Result<Vec<Document>, GatewayError> {
        self.0.query(query).await
    }

    fn listen(&self, target: &ListenTarget) -> Result<SnapshotStream, GatewayError> {
        self.0.listen(target)
    }
}

#[tokio::test]
async fn concurrent_redemptions_respect_usage_limit() {
    let store = TestStore::new();
    let mut limited = save10();
    limited["usageLimit"] = json!(1);
    store.seed_coupon("c1", limited);
    let slow = SlowReads(store.gateway.clone());
    let id = DocumentId::from("c1");

    let (first, second) = tokio::join!(redeem_coupon(&slow, &id), redeem_coupon(&slow, &id));

    let outcomes = [first.is_ok(), second.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let rejected = if first.is_err() { first } else { second };
    assert!(matches!(rejected, Err(CommerceError::CouponRejected(_))));

    let doc = store
        .gateway
        .get(&DocumentRef::new("coupons", "c1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.fields["usageCount"], json!(1));
    assert_eq!(store.gateway.writes(), 1);
}

#[tokio::test]
async fn settings_bootstrap_writes_defaults_once() {
    let store = TestStore::signed_in();
    let config = SettingsConfig::default();
    let settings = SettingsStore::open(&store.binder, &config).unwrap();

    let state = settings.binding().wait_until(BindingState::is_ready).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.gateway.writes(), 1);
    assert_eq!(state.data().map(|s| s.profile.clone()), Some(config.defaults.clone()));
    assert_eq!(settings.state(), state);

    settings
        .update(SettingsPatch { accepting_orders: Some(false), ..SettingsPatch::default() })
        .await
        .unwrap();
    settings
        .binding()
        .wait_until(|s| s.data().is_some_and(|s| !s.profile.accepting_orders))
        .await;
    assert!(settings.settings().unwrap().updated_at.is_some());

    let err = settings
        .update(SettingsPatch { upi_id: Some("not-a-vpa".into()), ..SettingsPatch::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Validation(_)));
}

#[tokio::test]
async fn settings_gate_and_read_only_view() {
    let store = TestStore::new();
    let config = SettingsConfig::default();

    let admin = SettingsStore::open(&store.binder, &config).unwrap();
    assert!(admin.state().is_unauthenticated());

    let public = SettingsStore::read_only(&store.binder, &config);
    let state = public.binding().wait_until(|s| !s.is_loading()).await;
    assert_eq!(state, BindingState::NotFound);
    assert_eq!(public.profile(), config.defaults);
    assert_eq!(store.gateway.writes(), 0);

    store.sign_in_admin();
    admin.binding().wait_until(BindingState::is_ready).await;
    let state = public.binding().wait_until(BindingState::is_ready).await;
    assert_eq!(state.data().map(|s| s.id.as_str()), Some("store"));
}

#[tokio::test]
async fn order_tracker_reports_not_found_and_follows_status() {
    let store = TestStore::new();
    store.seed_order("o1", "pending");

    let missing = OrderTracker::open(&store.binder, &DocumentId::from("nope"));
    assert_eq!(missing.binding().wait_until(|s| !s.is_loading()).await, BindingState::NotFound);

    let tracker = OrderTracker::open(&store.binder, &DocumentId::from("o1"));
    let state = tracker.binding().wait_until(BindingState::is_ready).await;
    assert_eq!(state.data().map(|o| o.status), Some(OrderStatus::Pending));

    store.sign_in_admin();
    let board = OrderBoard::open(&store.binder, &OrderFilter::default());
    board.update_status(&DocumentId::from("o1"), OrderStatus::Confirmed).await.unwrap();
    tracker
        .binding()
        .wait_until(|s| s.data().is_some_and(|o| o.status == OrderStatus::Confirmed))
        .await;
}

#[tokio::test]
async fn unknown_order_stays_not_found() {
    let store = TestStore::new();
    store.seed_order("template", "pending");

    let tracker = OrderTracker::open(&store.binder, &DocumentId::from("late"));
    assert_eq!(tracker.binding().wait_until(|s| !s.is_loading()).await, BindingState::NotFound);
    eventually(|| store.gateway.open_channels() == 0).await;

    let fields = store
        .gateway
        .get(&DocumentRef::new("orders", "template"))
        .await
        .unwrap()
        .unwrap()
        .fields;
    store
        .gateway
        .create_with_id(&DocumentRef::new("orders", "late"), fields)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(tracker.state(), BindingState::NotFound);
    assert!(!tracker.binding().is_active());
}

#[tokio::test]
async fn order_board_enforces_lifecycle() {
    let store = TestStore::signed_in();
    store.seed_order("o1", "pending");
    store.seed_order("o2", "shipped");
    let board = OrderBoard::open(&store.binder, &OrderFilter::default());
    board.binding().wait_until(BindingState::is_ready).await;
    let o1 = DocumentId::from("o1");
    let o2 = DocumentId::from("o2");

    let err = board.update_status(&o1, OrderStatus::Delivered).await.unwrap_err();
    assert!(matches!(
        err,
        CommerceError::IllegalTransition { from: OrderStatus::Pending, to: OrderStatus::Delivered }
    ));
    let err = board.update_status(&o2, OrderStatus::Cancelled).await.unwrap_err();
    assert!(matches!(err, CommerceError::IllegalTransition { .. }));

    board.update_status(&o1, OrderStatus::Cancelled).await.unwrap();
    board.set_tracking(&o2, " VXP123456 ").await.unwrap();
    board
        .binding()
        .wait_until(|s| {
            s.data().is_some_and(|orders| {
                orders.iter().any(|o| o.status == OrderStatus::Cancelled)
                    && orders.iter().any(|o| o.tracking_number.as_deref() == Some("VXP123456"))
            })
        })
        .await;

    let err = board
        .update_status(&DocumentId::from("o9"), OrderStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::NotFound { what: "order", .. }));
}

#[tokio::test]
async fn order_board_status_filter() {
    let store = TestStore::signed_in();
    store.seed_order("o1", "pending");
    store.seed_order("o2", "shipped");
    let board = OrderBoard::open(
        &store.binder,
        &OrderFilter { status: Some(OrderStatus::Shipped), user_id: None },
    );
    let state = board.binding().wait_until(BindingState::is_ready).await;
    let ids: Vec<&str> = state.data().unwrap().iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["o2"]);
}

#[tokio::test]
async fn user_directory_roles() {
    let store = TestStore::signed_in();
    store.seed_user(ADMIN_UID, "Venkat", Role::Admin);
    store.seed_user("u2", "Ravi", Role::Customer);
    let users = UserDirectory::open(&store.binder);
    users.binding().wait_until(BindingState::is_ready).await;
    assert_eq!(users.admins().len(), 1);

    users.set_role(&DocumentId::from("u2"), Role::Admin).await.unwrap();
    users
        .binding()
        .wait_until(|s| s.data().is_some_and(|u| u.iter().all(|p| p.role == Role::Admin)))
        .await;

    let err = users
        .set_role(&DocumentId::from(ADMIN_UID), Role::Customer)
        .await
        .unwrap_err();
    assert!(matches!(err, CommerceError::Validation(_)));
    let still_admin = store
        .gateway
        .get(&DocumentRef::new("users", ADMIN_UID))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(still_admin.fields["role"], json!("admin"));
}

#[tokio::test(start_paused = true)]
async fn search_suggestions_debounce_and_filter() {
    let store = seeded_store();
    let search = SearchSuggestions::new(&store.binder, &SearchConfig::default());

    search.set_query("r");
    tokio::time::sleep(Duration::from_millis(100)).await;
    search.set_query("RICE");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.gateway.subscriptions_opened(), 0);
    assert_eq!(search.state(), SuggestionState::Pending);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let mut rx = search.watch();
    rx.wait_for(SuggestionState::is_settled).await.unwrap();

    let mut found: Vec<String> = search.suggestions().into_iter().map(|p| p.name).collect();
    found.sort();
    assert_eq!(found, vec!["Basmati Rice 5kg", "Rice Flour 1kg"]);
    assert_eq!(store.gateway.subscriptions_opened(), 1);

    search.set_query("paneer");
    tokio::time::sleep(Duration::from_millis(350)).await;
    rx.wait_for(SuggestionState::is_settled).await.unwrap();
    assert_eq!(search.state(), SuggestionState::NoMatches);
    assert_eq!(store.gateway.open_channels(), 1);

    search.clear();
    assert_eq!(search.state(), SuggestionState::Idle);
}
