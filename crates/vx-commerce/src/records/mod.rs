//! Storefront records
//!
//! Each record maps one document in one collection. Identifiers are assigned
//! by the store and never change; every other field is mutable through the
//! matching `*Patch` type, which only serializes the fields that are set.

pub mod coupon;
pub mod order;
pub mod product;
pub mod settings;
pub mod user;

pub use coupon::{Coupon, CouponPatch, CouponStatus, DiscountType, NewCoupon};
pub use order::{
    CustomerDetails, NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
};
pub use product::{NewProduct, Product, ProductPatch};
pub use settings::{SettingsPatch, StoreProfile, StoreSettings};
pub use user::{Role, UserProfile};

/// Default for boolean fields that start enabled
pub(crate) fn enabled() -> bool {
    true
}
