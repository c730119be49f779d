//! Testing utilities for the VX workspace
//!
//! Shared fixtures: an in-process store with a signed-out auth provider,
//! seed helpers that write records the way mutators would, and polling
//! helpers for state that settles asynchronously.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use vx_binding::{Binder, Record};
use vx_commerce::{
    Coupon, CustomerDetails, DiscountType, NewProduct, Order, PaymentMethod, Product, Role,
    UserProfile,
};
use vx_gateway::{Fields, MemoryAuth, MemoryGateway, Principal};

/// In-process store, auth and a binder wired to both
#[derive(Debug, Clone)]
pub struct TestStore {
    pub gateway: Arc<MemoryGateway>,
    pub auth: Arc<MemoryAuth>,
    pub binder: Binder,
}

impl TestStore {
    pub fn new() -> Self {
        let gateway = Arc::new(MemoryGateway::new());
        let auth = Arc::new(MemoryAuth::new());
        let binder = Binder::new(gateway.clone()).with_auth(auth.clone());
        Self { gateway, auth, binder }
    }

    /// Store with an admin already signed in
    pub fn signed_in() -> Self {
        let store = Self::new();
        store.sign_in_admin();
        store
    }

    pub fn sign_in_admin(&self) {
        self.auth
            .sign_in(Principal::new(ADMIN_UID).with_email("admin@venkatexpress.in"));
    }

    pub fn sign_out(&self) {
        self.auth.sign_out();
    }

    /// Seed a product; `age_minutes` orders the catalog (older = larger)
    pub fn seed_product(&self, id: &str, product: &NewProduct, age_minutes: i64) {
        let mut fields = to_object(json!(product));
        fields.insert("createdAt".into(), millis(minutes_ago(age_minutes)));
        self.gateway.seed(Product::COLLECTION, id, fields);
    }

    /// Seed a percentage or fixed coupon
    pub fn seed_coupon(&self, id: &str, coupon: Value) {
        let mut fields = to_object(coupon);
        fields.entry("isActive").or_insert(json!(true));
        fields.entry("usageCount").or_insert(json!(0));
        fields
            .entry("createdAt")
            .or_insert(millis(minutes_ago(60)));
        self.gateway.seed(Coupon::COLLECTION, id, fields);
    }

    pub fn seed_user(&self, uid: &str, name: &str, role: Role) {
        let fields = to_object(json!({
            "name": name,
            "role": role,
            "createdAt": millis(minutes_ago(10)),
        }));
        self.gateway.seed(UserProfile::COLLECTION, uid, fields);
    }

    /// Seed a pending single-line UPI order
    pub fn seed_order(&self, id: &str, status: &str) {
        let fields = to_object(json!({
            "customer": customer(),
            "items": [{"productId": "rice", "name": "Basmati Rice", "unitPrice": 250.0, "quantity": 2}],
            "subtotal": 500.0,
            "discount": 0.0,
            "deliveryFee": 0.0,
            "total": 500.0,
            "paymentMethod": PaymentMethod::Upi,
            "paymentStatus": "pending",
            "status": status,
            "createdAt": millis(minutes_ago(5)),
        }));
        self.gateway.seed(Order::COLLECTION, id, fields);
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

pub const ADMIN_UID: &str = "admin-1";

pub fn to_object(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - Duration::minutes(minutes)
}

pub fn millis(at: DateTime<Utc>) -> Value {
    json!(at.timestamp_millis())
}

/// A few grocery products, newest first by id order p1..p5
pub fn sample_products() -> Vec<(&'static str, NewProduct)> {
    vec![
        (
            "p1",
            NewProduct::new("Basmati Rice 5kg", 650.0, "grocery")
                .with_image("https://cdn.example.com/rice.png")
                .with_stock(20),
        ),
        ("p2", NewProduct::new("Rice Flour 1kg", 80.0, "grocery").with_stock(15)),
        ("p3", NewProduct::new("Toor Dal 1kg", 160.0, "grocery").with_stock(0)),
        ("p4", NewProduct::new("Green Tea", 240.0, "beverages").with_stock(8)),
        ("p5", NewProduct::new("Filter Coffee", 320.0, "beverages").with_stock(5)),
    ]
}

/// Store seeded with [`sample_products`]
pub fn seeded_store() -> TestStore {
    let store = TestStore::new();
    for (age, (id, product)) in sample_products().iter().enumerate() {
        store.seed_product(id, product, age as i64 + 1);
    }
    store
}

/// `SAVE10`: 10% capped at 50, minimum purchase 500
pub fn save10() -> Value {
    json!({
        "code": "SAVE10",
        "discountType": DiscountType::Percentage,
        "discountValue": 10.0,
        "minPurchase": 500.0,
        "maxDiscountAmount": 50.0,
    })
}

pub fn customer() -> CustomerDetails {
    CustomerDetails {
        name: "Lakshmi Devi".into(),
        phone: "9848022338".into(),
        email: None,
        address: "12 Temple Street, Nellore".into(),
        pincode: "524001".into(),
    }
}

/// Poll `condition` for up to a second
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
