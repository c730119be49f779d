//! Binding errors
//!
//! An unauthenticated session and a missing document are *states* of a
//! binding, not errors; they never travel through this type.

use vx_gateway::GatewayError;

/// Errors surfaced to a binding's consumer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// Gateway refused the query or the channel failed
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Document could not be mapped to the record type
    #[error("decode failed for {id}: {message}")]
    Decode {
        /// Offending document
        id: String,
        /// Deserializer message
        message: String,
    },

    /// Default document could not be written
    #[error("bootstrap failed: {0}")]
    Bootstrap(GatewayError),
}

impl BindError {
    /// Create decode error
    #[inline]
    pub fn decode(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Check if a manual retry (re-binding) is worth offering
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway(err) | Self::Bootstrap(err) => err.is_retryable(),
            Self::Decode { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_conversion() {
        let err: BindError = GatewayError::Channel("reset".into()).into();
        assert!(matches!(err, BindError::Gateway(_)));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "gateway error: channel error: reset");
    }

    #[test]
    fn decode_is_not_retryable() {
        let err = BindError::decode("p1", "missing field `price`");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("p1"));
    }
}
