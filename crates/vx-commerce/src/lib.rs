//! VX Commerce - the storefront domain
//!
//! Records, rules and live hooks for the Venkat Express storefront:
//! - [`records`]: products, coupons, settings, orders and users
//! - [`discount`]: coupon validation, which never fails and always explains
//! - [`payment`]: UPI deep links, one per wallet
//! - [`media`]: syntactic image/video URL checks and verified uploads
//! - [`cart`] and [`checkout`]: pricing and order placement
//! - [`hooks`]: live bindings with their mutators, one per screen concern
//!
//! Every hook's data comes from its subscription. Mutators request a change
//! and return once the gateway accepted it; the effect shows up in the next
//! snapshot.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod discount;
pub mod error;
pub mod hooks;
pub mod media;
pub mod payment;
pub mod records;

pub use cart::{quote, Cart, CartItem, OrderQuote};
pub use checkout::{Checkout, CheckoutRequest, PlacedOrder};
pub use config::{PaymentConfig, SearchConfig, SettingsConfig, StorefrontConfig};
pub use discount::{compute_discount, rupees, validate_coupon, CouponValidation};
pub use error::{CommerceError, CommerceResult, ConfigError, MediaError, PaymentError};
pub use hooks::coupons::{normalize_code, redeem_coupon, validate_code_remote, CouponManager};
pub use hooks::orders::{OrderBoard, OrderFilter, OrderTracker};
pub use hooks::products::{CatalogFilter, ProductCatalog};
pub use hooks::search::SearchSuggestions;
pub use hooks::settings::SettingsStore;
pub use hooks::users::UserDirectory;
pub use media::{classify_url, ensure_kind, is_image_url, is_video_url, upload_media, MediaKind};
pub use payment::{build_payment_links, is_valid_vpa, PaymentIntent, PaymentLink, UpiProvider};
pub use records::{
    Coupon, CouponPatch, CouponStatus, CustomerDetails, DiscountType, NewCoupon, NewProduct, Order,
    OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Product, ProductPatch, Role,
    SettingsPatch, StoreProfile, StoreSettings, UserProfile,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
