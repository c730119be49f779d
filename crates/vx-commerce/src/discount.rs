//! Coupon validation
//!
//! Pure and total: every input produces a [`CouponValidation`], never an
//! error. Checks run in a fixed order and stop at the first failure:
//!
//! 1. unknown code (case-insensitive)
//! 2. inactive
//! 3. expired
//! 4. below minimum purchase
//! 5. usage limit reached
//!
//! A coupon that passes yields a discount clamped to `[0, total]`.

use crate::records::{Coupon, DiscountType};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of validating a code against an order total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponValidation {
    /// Whether the coupon applies
    pub valid: bool,
    /// Rupees off; zero when invalid
    pub discount: f64,
    /// Customer-facing message
    pub message: String,
    /// Matched coupon, when valid
    #[serde(skip)]
    pub coupon: Option<Coupon>,
}

impl CouponValidation {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount: 0.0,
            message: message.into(),
            coupon: None,
        }
    }

    fn accepted(coupon: &Coupon, discount: f64) -> Self {
        Self {
            valid: true,
            discount,
            message: format!("Coupon applied! You save {}", rupees(discount)),
            coupon: Some(coupon.clone()),
        }
    }
}

/// Format an amount the way messages show it: whole rupees without decimals
#[must_use]
pub fn rupees(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("₹{amount:.0}")
    } else {
        format!("₹{amount:.2}")
    }
}

/// Discount a coupon gives on `total`, ignoring eligibility
#[must_use]
pub fn compute_discount(coupon: &Coupon, total: f64) -> f64 {
    if !total.is_finite() || total <= 0.0 {
        return 0.0;
    }
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let amount = total * coupon.discount_value / 100.0;
            match coupon.max_discount_amount {
                Some(cap) => amount.min(cap),
                None => amount,
            }
        }
        DiscountType::Fixed => coupon.discount_value,
    };
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, total)
}

/// Validate `code` against the known coupons at time `now`
#[must_use]
pub fn validate_coupon(
    coupons: &[Coupon],
    code: &str,
    total: f64,
    now: DateTime<Utc>,
) -> CouponValidation {
    let Some(coupon) = coupons.iter().find(|c| c.matches_code(code)) else {
        return CouponValidation::rejected("Invalid coupon code");
    };

    if !coupon.is_active {
        return CouponValidation::rejected("This coupon is no longer active");
    }
    if coupon.is_expired_at(now) {
        return CouponValidation::rejected("This coupon has expired");
    }
    if let Some(min) = coupon.min_purchase {
        if total < min {
            return CouponValidation::rejected(format!(
                "Minimum purchase of {} required",
                rupees(min)
            ));
        }
    }
    if coupon.is_exhausted() {
        return CouponValidation::rejected("This coupon has reached its usage limit");
    }

    let discount = compute_discount(coupon, total);
    tracing::debug!("Coupon {} accepted: {} off {}", coupon.code, discount, total);
    CouponValidation::accepted(coupon, discount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use vx_gateway::DocumentId;

    fn coupon(code: &str, kind: DiscountType, value: f64) -> Coupon {
        Coupon {
            id: DocumentId::from(code.to_lowercase()),
            code: code.into(),
            description: String::new(),
            discount_type: kind,
            discount_value: value,
            min_purchase: None,
            max_discount_amount: None,
            expires_at: None,
            usage_limit: None,
            usage_count: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn save10() -> Coupon {
        Coupon {
            max_discount_amount: Some(50.0),
            min_purchase: Some(500.0),
            ..coupon("SAVE10", DiscountType::Percentage, 10.0)
        }
    }

    #[test]
    fn percentage_is_capped() {
        let result = validate_coupon(&[save10()], "SAVE10", 1000.0, Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount, 50.0);
        assert_eq!(result.message, "Coupon applied! You save ₹50");
    }

    #[test]
    fn below_minimum_names_the_threshold() {
        let result = validate_coupon(&[save10()], "save10", 300.0, Utc::now());
        assert!(!result.valid);
        assert_eq!(result.discount, 0.0);
        assert_eq!(result.message, "Minimum purchase of ₹500 required");
    }

    #[test]
    fn unknown_code() {
        let result = validate_coupon(&[save10()], "SAVE20", 1000.0, Utc::now());
        assert_eq!(result.message, "Invalid coupon code");
        assert!(result.coupon.is_none());
    }

    #[test]
    fn inactive_is_checked_before_expiry() {
        let now = Utc::now();
        let c = Coupon {
            is_active: false,
            expires_at: Some(now - Duration::days(1)),
            ..save10()
        };
        let result = validate_coupon(&[c], "SAVE10", 1000.0, now);
        assert_eq!(result.message, "This coupon is no longer active");
    }

    #[test]
    fn exhausted_checked_after_minimum() {
        let c = Coupon {
            usage_limit: Some(3),
            usage_count: 3,
            ..save10()
        };
        let below = validate_coupon(std::slice::from_ref(&c), "SAVE10", 100.0, Utc::now());
        assert_eq!(below.message, "Minimum purchase of ₹500 required");

        let above = validate_coupon(&[c], "SAVE10", 1000.0, Utc::now());
        assert_eq!(above.message, "This coupon has reached its usage limit");
    }

    #[test]
    fn fixed_discount_never_exceeds_total() {
        let c = coupon("FLAT200", DiscountType::Fixed, 200.0);
        let result = validate_coupon(&[c], "flat200", 150.0, Utc::now());
        assert!(result.valid);
        assert_eq!(result.discount, 150.0);
    }

    #[test]
    fn fractional_threshold_message() {
        let c = Coupon {
            min_purchase: Some(249.5),
            ..coupon("HALF", DiscountType::Fixed, 10.0)
        };
        let result = validate_coupon(&[c], "HALF", 100.0, Utc::now());
        assert_eq!(result.message, "Minimum purchase of ₹249.50 required");
    }

    proptest! {
        #[test]
        fn expired_is_always_invalid(total in 0.0f64..1_000_000.0, hours in 1i64..10_000) {
            let now = Utc::now();
            let c = Coupon {
                expires_at: Some(now - Duration::hours(hours)),
                ..coupon("OLD", DiscountType::Percentage, 20.0)
            };
            let result = validate_coupon(&[c], "OLD", total, now);
            prop_assert!(!result.valid);
            prop_assert_eq!(result.discount, 0.0);
        }

        #[test]
        fn discount_within_bounds(
            total in 0.0f64..100_000.0,
            value in -50.0f64..5_000.0,
            cap in proptest::option::of(0.0f64..1_000.0),
            percentage in any::<bool>(),
        ) {
            let kind = if percentage { DiscountType::Percentage } else { DiscountType::Fixed };
            let c = Coupon {
                max_discount_amount: cap,
                ..coupon("ANY", kind, value)
            };
            let result = validate_coupon(&[c], "any", total, Utc::now());
            prop_assert!(result.valid);
            prop_assert!(result.discount >= 0.0);
            prop_assert!(result.discount <= total);
        }
    }
}
