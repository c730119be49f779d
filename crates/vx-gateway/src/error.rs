//! Error types for the remote gateways
//!
//! Covers the failure modes the document store, auth provider and media
//! uploader can report back to the binding layer.

/// Errors reported by a [`DocumentGateway`](crate::DocumentGateway)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Query descriptor is malformed
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Document does not exist
    #[error("document not found: {collection}/{id}")]
    NotFound {
        /// Collection searched
        collection: String,
        /// Missing document id
        id: String,
    },

    /// Document already exists
    #[error("document already exists: {collection}/{id}")]
    AlreadyExists {
        /// Collection written to
        collection: String,
        /// Taken document id
        id: String,
    },

    /// Document state does not allow the write
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Caller lacks permission for the operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Push channel failed and was closed by the store
    #[error("channel error: {0}")]
    Channel(String),

    /// Store is unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Payload could not be encoded for the store
    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl GatewayError {
    /// Create not-found error for a document
    #[inline]
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Create already-exists error for a document
    #[inline]
    pub fn already_exists(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Check if error is a missing document
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if a conditional write was refused
    #[inline]
    #[must_use]
    pub fn is_failed_precondition(&self) -> bool {
        matches!(self, Self::FailedPrecondition(_))
    }

    /// Check if error is transient
    ///
    /// The binding layer never retries on its own; this only tells a caller
    /// whether offering a manual retry makes sense.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Channel(_) | Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

/// Errors reported by a [`MediaUploader`](crate::MediaUploader)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// File was empty
    #[error("empty file: {0}")]
    EmptyFile(String),

    /// File extension not accepted for the resource type
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// Upload service rejected the request
    #[error("upload rejected: {0}")]
    Rejected(String),
}

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
