//! Error types for the storefront domain
//!
//! Provides error handling for:
//! - Mutator failures (validation, missing documents, gateway errors)
//! - Payment link construction
//! - Media URL checks and uploads
//! - Configuration loading
//!
//! Coupon validation is deliberately absent: it always produces a
//! structured [`CouponValidation`](crate::CouponValidation), never an error.

use crate::records::OrderStatus;
use std::path::PathBuf;
use vx_gateway::{GatewayError, UploadError};

/// Main storefront error type
#[derive(Debug, thiserror::Error)]
pub enum CommerceError {
    /// Input failed validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Operation needs a signed-in principal
    #[error("sign-in required")]
    Unauthenticated,

    /// Record does not exist
    #[error("{what} not found: {id}")]
    NotFound {
        /// Kind of record
        what: &'static str,
        /// Requested id
        id: String,
    },

    /// A record with the same natural key exists
    #[error("{what} already exists: {key}")]
    Duplicate {
        /// Kind of record
        what: &'static str,
        /// Conflicting key
        key: String,
    },

    /// Order status change not allowed
    #[error("illegal order transition: {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    /// Not enough stock for the requested quantity
    #[error("insufficient stock for {product}: {available} available")]
    OutOfStock {
        /// Product name
        product: String,
        /// Units in stock
        available: u32,
    },

    /// Coupon rejected at checkout
    #[error("coupon rejected: {0}")]
    CouponRejected(String),

    /// Store is not taking orders
    #[error("store is not accepting orders")]
    StoreClosed,

    /// Remote store failure
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Payment link failure
    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Media failure
    #[error("media error: {0}")]
    Media(#[from] MediaError),
}

impl CommerceError {
    /// Create not-found error
    #[inline]
    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    /// Create validation error
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if the caller may reasonably retry
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Gateway(err) if err.is_retryable())
    }
}

/// Payment intent errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentError {
    /// Payee address is not `handle@psp`
    #[error("invalid payee address: {0}")]
    InvalidVpa(String),

    /// Amount is zero, negative or not finite
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Required field is empty
    #[error("missing {0}")]
    Missing(&'static str),

    /// Only INR is accepted over UPI
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// Media errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// URL is not a recognisable image
    #[error("not an image URL: {0}")]
    NotImage(String),

    /// URL is not a recognisable video
    #[error("not a video URL: {0}")]
    NotVideo(String),

    /// File extension does not fit the resource type
    #[error("file {0} does not match the requested media type")]
    WrongFileType(String),

    /// Upload service failure
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for storefront operations
pub type CommerceResult<T> = Result<T, CommerceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commerce_error_display() {
        let err = CommerceError::not_found("order", "o-1");
        assert_eq!(err.to_string(), "order not found: o-1");

        let err = CommerceError::IllegalTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "illegal order transition: delivered -> pending");
    }

    #[test]
    fn retryable_only_for_transient_gateway_errors() {
        assert!(CommerceError::from(GatewayError::Unavailable("offline".into())).is_retryable());
        assert!(!CommerceError::from(GatewayError::PermissionDenied("rules".into())).is_retryable());
        assert!(!CommerceError::StoreClosed.is_retryable());
    }

    #[test]
    fn nested_conversions() {
        let err: CommerceError = PaymentError::Missing("order id").into();
        assert!(matches!(err, CommerceError::Payment(_)));

        let err: MediaError = UploadError::EmptyFile("a.png".into()).into();
        assert!(err.to_string().contains("empty file"));
    }
}
