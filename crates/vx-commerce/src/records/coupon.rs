//! Discount coupons

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use vx_binding::Record;
use vx_gateway::DocumentId;

/// How the discount value is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` percent of the order total
    Percentage,
    /// Flat `value` rupees
    Fixed,
}

/// Derived coupon state; computed on read, never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CouponStatus {
    /// Redeemable
    Active,
    /// Switched off by an admin
    Inactive,
    /// Past its expiry time
    Expired,
    /// Usage limit reached
    Exhausted,
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Exhausted => "exhausted",
        };
        f.write_str(label)
    }
}

/// A stored coupon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Store-assigned id
    pub id: DocumentId,
    /// Upper-case redemption code
    pub code: String,
    /// Shown to admins
    #[serde(default)]
    pub description: String,
    /// Percentage or fixed amount
    pub discount_type: DiscountType,
    /// Percent or rupees, per `discount_type`
    pub discount_value: f64,
    /// Order total must be at least this much
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_purchase: Option<f64>,
    /// Cap for percentage discounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<f64>,
    /// No redemptions after this instant
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    /// Maximum redemptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    /// Redemptions so far
    #[serde(default)]
    pub usage_count: u32,
    /// Inactive coupons never validate
    #[serde(default = "super::enabled")]
    pub is_active: bool,
    /// Creation time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Check if `code` names this coupon, ignoring case
    #[inline]
    #[must_use]
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    /// Check expiry against `now`
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }

    /// Check whether the usage limit is reached
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.usage_count >= limit)
    }

    /// Derived status at `now`
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> CouponStatus {
        if !self.is_active {
            CouponStatus::Inactive
        } else if self.is_expired_at(now) {
            CouponStatus::Expired
        } else if self.is_exhausted() {
            CouponStatus::Exhausted
        } else {
            CouponStatus::Active
        }
    }

    /// Derived status now
    #[must_use]
    pub fn status(&self) -> CouponStatus {
        self.status_at(Utc::now())
    }
}

impl Record for Coupon {
    const COLLECTION: &'static str = "coupons";

    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// Fields for a new coupon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoupon {
    /// Redemption code, normalized before writing
    pub code: String,
    /// Shown to admins
    #[serde(default)]
    pub description: String,
    /// Percentage or fixed amount
    pub discount_type: DiscountType,
    /// Percent or rupees, per `discount_type`
    pub discount_value: f64,
    /// Order total must be at least this much
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_purchase: Option<f64>,
    /// Cap for percentage discounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<f64>,
    /// No redemptions after this instant
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    /// Maximum redemptions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
}

impl NewCoupon {
    /// Percentage coupon
    pub fn percentage(code: impl Into<String>, percent: f64) -> Self {
        Self::new(code, DiscountType::Percentage, percent)
    }

    /// Flat-amount coupon
    pub fn fixed(code: impl Into<String>, amount: f64) -> Self {
        Self::new(code, DiscountType::Fixed, amount)
    }

    fn new(code: impl Into<String>, discount_type: DiscountType, discount_value: f64) -> Self {
        Self {
            code: code.into(),
            description: String::new(),
            discount_type,
            discount_value,
            min_purchase: None,
            max_discount_amount: None,
            expires_at: None,
            usage_limit: None,
        }
    }

    /// Builder: minimum purchase
    #[must_use]
    pub fn with_min_purchase(mut self, amount: f64) -> Self {
        self.min_purchase = Some(amount);
        self
    }

    /// Builder: percentage cap
    #[must_use]
    pub fn with_max_discount(mut self, amount: f64) -> Self {
        self.max_discount_amount = Some(amount);
        self
    }

    /// Builder: expiry
    #[must_use]
    pub fn with_expiry(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    /// Builder: usage limit
    #[must_use]
    pub fn with_usage_limit(mut self, limit: u32) -> Self {
        self.usage_limit = Some(limit);
        self
    }

    /// Builder: description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial coupon update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponPatch {
    /// New description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New discount type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    /// New discount value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<f64>,
    /// New minimum purchase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_purchase: Option<f64>,
    /// New discount cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_discount_amount: Option<f64>,
    /// New expiry
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    /// New usage limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    /// New usage count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u32>,
    /// Enable or disable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
