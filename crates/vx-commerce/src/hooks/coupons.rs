//! Coupon administration

use super::{create_record, delete_record, fetch_record, patch_record, require_principal};
use crate::discount::{validate_coupon, CouponValidation};
use crate::error::{CommerceError, CommerceResult};
use crate::records::{Coupon, CouponPatch, DiscountType, NewCoupon};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vx_binding::{decode_collection, Binder, BindingState, Gate, LiveBinding, Record};
use vx_gateway::{
    Direction, DocumentGateway, DocumentId, DocumentRef, QueryDescriptor, RawSnapshot,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StampedCoupon<'a> {
    #[serde(flatten)]
    coupon: &'a NewCoupon,
    usage_count: u32,
    is_active: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

/// Upper-case and check a coupon code
///
/// # Errors
/// - `Validation` unless 3-20 letters, digits, `-` or `_`
pub fn normalize_code(code: &str) -> CommerceResult<String> {
    let code = code.trim().to_ascii_uppercase();
    let valid_chars = code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !(3..=20).contains(&code.len()) || !valid_chars {
        return Err(CommerceError::invalid(format!(
            "coupon code {code:?} must be 3-20 letters, digits, '-' or '_'"
        )));
    }
    Ok(code)
}

fn validate_terms(discount_type: DiscountType, value: f64, cap: Option<f64>) -> CommerceResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CommerceError::invalid("discount value must be positive"));
    }
    if discount_type == DiscountType::Percentage && value > 100.0 {
        return Err(CommerceError::invalid("percentage discount cannot exceed 100"));
    }
    if cap.is_some_and(|cap| !cap.is_finite() || cap <= 0.0) {
        return Err(CommerceError::invalid("maximum discount must be positive"));
    }
    Ok(())
}

/// Look a code up in the store and validate it
///
/// For callers without a live coupon binding, such as checkout.
///
/// # Errors
/// - `Gateway` if the lookup fails; an unknown code is a normal invalid result
pub async fn validate_code_remote(
    gateway: &dyn DocumentGateway,
    code: &str,
    total: f64,
    now: DateTime<Utc>,
) -> CommerceResult<CouponValidation> {
    let query = QueryDescriptor::collection(Coupon::COLLECTION)
        .where_eq("code", code.trim().to_ascii_uppercase())
        .limit(1);
    let documents = gateway.query(&query).await?;
    let coupons = decode_collection::<Coupon>(RawSnapshot::new(documents)).unwrap_or_default();
    Ok(validate_coupon(&coupons, code, total, now))
}

/// Count one use of a coupon
///
/// # Errors
/// - `NotFound` for an unknown id
/// - `CouponRejected` if the usage limit is already reached
/// - `Gateway` if the write fails
pub async fn redeem_coupon(gateway: &dyn DocumentGateway, id: &DocumentId) -> CommerceResult<u32> {
    let coupon: Coupon = fetch_record(gateway, id, "coupon").await?;
    let reference = DocumentRef::new(Coupon::COLLECTION, id.clone());
    let limit = coupon.usage_limit.map(i64::from);
    let usage_count = match gateway.increment(&reference, "usageCount", 1, limit).await {
        Ok(count) => u32::try_from(count).unwrap_or(u32::MAX),
        Err(err) if err.is_failed_precondition() => {
            return Err(CommerceError::CouponRejected(format!(
                "{} has reached its usage limit",
                coupon.code
            )));
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!("Coupon {} redeemed ({} uses)", coupon.code, usage_count);
    Ok(usage_count)
}

/// Live coupon list for admins
#[derive(Debug)]
pub struct CouponManager {
    binder: Binder,
    live: LiveBinding<Vec<Coupon>>,
}

impl CouponManager {
    /// Open the coupon list; stays unauthenticated until someone signs in
    #[must_use]
    pub fn open(binder: &Binder) -> Self {
        let query = QueryDescriptor::collection(Coupon::COLLECTION)
            .order_by("createdAt", Direction::Descending);
        Self {
            binder: binder.clone(),
            live: binder.live_collection(query, Gate::Authenticated),
        }
    }

    /// Current binding state
    #[must_use]
    pub fn state(&self) -> BindingState<Vec<Coupon>> {
        self.live.state()
    }

    /// Latest coupons, empty until loaded
    #[must_use]
    pub fn coupons(&self) -> Vec<Coupon> {
        self.live.data().unwrap_or_default()
    }

    /// Underlying live binding
    #[must_use]
    pub fn binding(&self) -> &LiveBinding<Vec<Coupon>> {
        &self.live
    }

    /// Validate a code against the latest snapshot
    #[must_use]
    pub fn validate(&self, code: &str, total: f64) -> CouponValidation {
        self.validate_at(code, total, Utc::now())
    }

    /// Validate a code against the latest snapshot at `now`
    #[must_use]
    pub fn validate_at(&self, code: &str, total: f64, now: DateTime<Utc>) -> CouponValidation {
        validate_coupon(&self.coupons(), code, total, now)
    }

    /// Create a coupon
    ///
    /// # Errors
    /// - `Unauthenticated` when nobody is signed in
    /// - `Validation` for a bad code or terms
    /// - `Duplicate` if the code is already taken
    /// - `Gateway` if the write fails
    pub async fn add(&self, coupon: NewCoupon) -> CommerceResult<DocumentId> {
        require_principal(&self.binder)?;
        let code = normalize_code(&coupon.code)?;
        validate_terms(coupon.discount_type, coupon.discount_value, coupon.max_discount_amount)?;

        if self.coupons().iter().any(|c| c.matches_code(&code)) {
            return Err(CommerceError::Duplicate { what: "coupon", key: code });
        }

        let coupon = NewCoupon { code, ..coupon };
        tracing::info!("Adding coupon {}", coupon.code);
        let stamped = StampedCoupon {
            coupon: &coupon,
            usage_count: 0,
            is_active: true,
            created_at: Utc::now(),
        };
        create_record::<Coupon>(self.binder.gateway().as_ref(), &stamped).await
    }

    /// Update coupon terms
    ///
    /// # Errors
    /// - `Unauthenticated`, `Validation` or `Gateway`
    pub async fn update(&self, id: &DocumentId, patch: CouponPatch) -> CommerceResult<()> {
        require_principal(&self.binder)?;
        if let Some(value) = patch.discount_value {
            let kind = match patch.discount_type {
                Some(kind) => kind,
                None => {
                    let gateway = self.binder.gateway().as_ref();
                    fetch_record::<Coupon>(gateway, id, "coupon").await?.discount_type
                }
            };
            validate_terms(kind, value, patch.max_discount_amount)?;
        }
        patch_record::<Coupon>(self.binder.gateway().as_ref(), id, &patch).await
    }

    /// Switch a coupon on or off
    ///
    /// # Errors
    /// - `Unauthenticated` or `Gateway`
    pub async fn set_active(&self, id: &DocumentId, active: bool) -> CommerceResult<()> {
        let patch = CouponPatch {
            is_active: Some(active),
            ..CouponPatch::default()
        };
        self.update(id, patch).await
    }

    /// Delete a coupon
    ///
    /// # Errors
    /// - `Unauthenticated` or `Gateway`
    pub async fn delete(&self, id: &DocumentId) -> CommerceResult<()> {
        require_principal(&self.binder)?;
        delete_record::<Coupon>(self.binder.gateway().as_ref(), id).await
    }

    /// Count one use of a coupon
    ///
    /// # Errors
    /// - as [`redeem_coupon`]
    pub async fn redeem(&self, id: &DocumentId) -> CommerceResult<u32> {
        redeem_coupon(self.binder.gateway().as_ref(), id).await
    }

    /// Stop listening
    pub fn close(&self) {
        self.live.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_upper_cased() {
        assert_eq!(normalize_code(" save10 ").unwrap(), "SAVE10");
        assert_eq!(normalize_code("diwali_24").unwrap(), "DIWALI_24");
        assert!(normalize_code("ab").is_err());
        assert!(normalize_code("SAVE 10").is_err());
    }

    #[test]
    fn terms() {
        assert!(validate_terms(DiscountType::Percentage, 10.0, Some(50.0)).is_ok());
        assert!(validate_terms(DiscountType::Percentage, 120.0, None).is_err());
        assert!(validate_terms(DiscountType::Fixed, 120.0, None).is_ok());
        assert!(validate_terms(DiscountType::Fixed, 0.0, None).is_err());
        assert!(validate_terms(DiscountType::Fixed, 10.0, Some(-1.0)).is_err());
    }
}
