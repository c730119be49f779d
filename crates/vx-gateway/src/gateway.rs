//! The document store seam
//!
//! [`DocumentGateway`] is the only way the binding layer reaches the remote
//! store. Point mutations are request/response; live data arrives through
//! [`DocumentGateway::listen`] as a stream of full snapshots.

use crate::document::{Document, DocumentId, DocumentRef, Fields};
use crate::error::GatewayError;
use crate::query::{ListenTarget, QueryDescriptor, RawSnapshot};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Push channel opened by [`DocumentGateway::listen`]
///
/// - The first item is the current result set.
/// - Every later item is a complete replacement.
/// - An `Err` item is final: the store closes the channel after it.
/// - Dropping the stream closes the channel.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<RawSnapshot, GatewayError>> + Send>>;

/// Client of a collection-oriented document store
#[async_trait]
pub trait DocumentGateway: Send + Sync + std::fmt::Debug {
    /// Create a document with a store-assigned identifier
    async fn create(&self, collection: &str, fields: Fields) -> Result<DocumentId, GatewayError>;

    /// Create a document under a chosen identifier
    ///
    /// # Errors
    /// - `GatewayError::AlreadyExists` if the identifier is taken
    async fn create_with_id(
        &self,
        reference: &DocumentRef,
        fields: Fields,
    ) -> Result<(), GatewayError>;

    /// Merge fields into an existing document
    ///
    /// # Errors
    /// - `GatewayError::NotFound` if the document does not exist
    async fn update(&self, reference: &DocumentRef, patch: Fields) -> Result<(), GatewayError>;

    /// Add `by` to an integer field in one atomic step
    ///
    /// A missing field counts as zero. When `max` is set and the result
    /// would exceed it, nothing is written. Returns the new value.
    ///
    /// # Errors
    /// - `GatewayError::NotFound` if the document does not exist
    /// - `GatewayError::FailedPrecondition` if the bound would be exceeded or
    ///   the field is not an integer
    async fn increment(
        &self,
        reference: &DocumentRef,
        field: &str,
        by: i64,
        max: Option<i64>,
    ) -> Result<i64, GatewayError>;

    /// Delete a document; deleting a missing document is not an error
    async fn delete(&self, reference: &DocumentRef) -> Result<(), GatewayError>;

    /// Read one document
    async fn get(&self, reference: &DocumentRef) -> Result<Option<Document>, GatewayError>;

    /// Run a one-shot query
    async fn query(&self, query: &QueryDescriptor) -> Result<Vec<Document>, GatewayError>;

    /// Open a push channel
    ///
    /// # Errors
    /// - `GatewayError::InvalidQuery` if the descriptor is malformed
    fn listen(&self, target: &ListenTarget) -> Result<SnapshotStream, GatewayError>;
}
