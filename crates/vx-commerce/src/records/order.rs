//! Customer orders and their lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use vx_binding::Record;
use vx_gateway::DocumentId;

/// Fulfilment status
///
/// ```text
/// pending -> confirmed -> processing -> shipped -> out_for_delivery -> delivered
///    \___________\______________\_________ cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, not yet seen by the store
    Pending,
    /// Accepted by the store
    Confirmed,
    /// Being packed
    Processing,
    /// Handed to the courier
    Shipped,
    /// With the delivery agent
    OutForDelivery,
    /// Received by the customer
    Delivered,
    /// Cancelled before shipping
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Confirmed,
        Self::Processing,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if no further transitions exist
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Check if the order can still be cancelled
    #[inline]
    #[must_use]
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Processing)
    }

    /// Next status along the happy path
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::OutForDelivery),
            Self::OutForDelivery => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Check if moving to `to` is allowed
    ///
    /// Only single forward steps and cancellation before shipping are
    /// allowed. Re-setting the current status is not a transition.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        if to == Self::Cancelled {
            return self.is_cancellable();
        }
        self.next() == Some(to)
    }

    /// Parse from wire name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// UPI deep link
    Upi,
    /// Cash on delivery
    CashOnDelivery,
}

/// Payment state as reported by an admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not yet paid
    #[default]
    Pending,
    /// Payment received
    Paid,
    /// Payment attempt failed
    Failed,
    /// Money returned
    Refunded,
}

/// Delivery contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    /// Full name
    pub name: String,
    /// Mobile number, 10 digits with optional 91 prefix
    pub phone: String,
    /// Optional email for receipts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Delivery address
    pub address: String,
    /// 6-digit postal code
    pub pincode: String,
}

impl CustomerDetails {
    /// Check required fields; returns the first problem found
    #[must_use]
    pub fn problem(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            return Some("customer name is required");
        }
        let digits: String = self.phone.chars().filter(char::is_ascii_digit).collect();
        let local = digits.strip_prefix("91").filter(|d| d.len() == 10).unwrap_or(digits.as_str());
        if local.len() != 10 {
            return Some("phone number must have 10 digits");
        }
        if self.address.trim().is_empty() {
            return Some("delivery address is required");
        }
        if self.pincode.len() != 6 || !self.pincode.chars().all(|c| c.is_ascii_digit()) {
            return Some("pincode must have 6 digits");
        }
        None
    }
}

/// One order line, priced at the time of ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Product ordered
    pub product_id: DocumentId,
    /// Product name when ordered
    pub name: String,
    /// Price per unit when ordered
    pub unit_price: f64,
    /// Units ordered
    pub quantity: u32,
    /// Cover image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderItem {
    /// Line total
    #[inline]
    #[must_use]
    pub fn total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// A placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Store-assigned id
    pub id: DocumentId,
    /// Signed-in customer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Delivery contact
    pub customer: CustomerDetails,
    /// Ordered lines
    pub items: Vec<OrderItem>,
    /// Sum of line totals
    pub subtotal: f64,
    /// Coupon discount
    #[serde(default)]
    pub discount: f64,
    /// Delivery charge
    #[serde(default)]
    pub delivery_fee: f64,
    /// Amount payable
    pub total: f64,
    /// Redeemed coupon code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// How the customer pays
    pub payment_method: PaymentMethod,
    /// Payment state
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Courier tracking number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    /// Placement time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Last status change
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Units across all lines
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

impl Record for Order {
    const COLLECTION: &'static str = "orders";

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// Order as written at checkout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    /// Signed-in customer, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Delivery contact
    pub customer: CustomerDetails,
    /// Ordered lines
    pub items: Vec<OrderItem>,
    /// Sum of line totals
    pub subtotal: f64,
    /// Coupon discount
    pub discount: f64,
    /// Delivery charge
    pub delivery_fee: f64,
    /// Amount payable
    pub total: f64,
    /// Redeemed coupon code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    /// How the customer pays
    pub payment_method: PaymentMethod,
    /// Initial payment state
    pub payment_status: PaymentStatus,
    /// Initial status
    pub status: OrderStatus,
    /// Placement time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}
