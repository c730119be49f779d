//! Domain hooks
//!
//! Each hook owns one or more live bindings plus the mutators for its
//! collection. Mutators only *request* changes; the new state is whatever the
//! next snapshot says, never a local echo of the write.

pub mod coupons;
pub mod orders;
pub mod products;
pub mod search;
pub mod settings;
pub mod users;

use crate::error::{CommerceError, CommerceResult};
use serde::Serialize;
use vx_binding::{Binder, Record};
use vx_gateway::{to_fields, DocumentGateway, DocumentId, DocumentRef, Principal};

/// Require a signed-in principal for a mutator
pub(crate) fn require_principal(binder: &Binder) -> CommerceResult<Principal> {
    binder.principal().ok_or(CommerceError::Unauthenticated)
}

/// Write a new record
pub(crate) async fn create_record<T: Record>(
    gateway: &dyn DocumentGateway,
    value: &impl Serialize,
) -> CommerceResult<DocumentId> {
    let fields = to_fields(value)?;
    match gateway.create(T::COLLECTION, fields).await {
        Ok(id) => {
            tracing::info!("Created {}/{}", T::COLLECTION, id);
            Ok(id)
        }
        Err(err) => {
            tracing::warn!("Create in {} failed: {}", T::COLLECTION, err);
            Err(err.into())
        }
    }
}

/// Apply a partial update; an empty patch is rejected without a write
pub(crate) async fn patch_record<T: Record>(
    gateway: &dyn DocumentGateway,
    id: &DocumentId,
    patch: &impl Serialize,
) -> CommerceResult<()> {
    let fields = to_fields(patch)?;
    if fields.is_empty() {
        return Err(CommerceError::invalid("nothing to update"));
    }
    let reference = DocumentRef::new(T::COLLECTION, id.clone());
    gateway.update(&reference, fields).await.map_err(|err| {
        tracing::warn!("Update of {} failed: {}", reference, err);
        CommerceError::from(err)
    })?;
    tracing::debug!("Updated {}", reference);
    Ok(())
}

/// Delete a record
pub(crate) async fn delete_record<T: Record>(
    gateway: &dyn DocumentGateway,
    id: &DocumentId,
) -> CommerceResult<()> {
    let reference = DocumentRef::new(T::COLLECTION, id.clone());
    gateway.delete(&reference).await.map_err(|err| {
        tracing::warn!("Delete of {} failed: {}", reference, err);
        CommerceError::from(err)
    })?;
    tracing::info!("Deleted {}", reference);
    Ok(())
}

/// Fetch and decode one record
pub(crate) async fn fetch_record<T: Record>(
    gateway: &dyn DocumentGateway,
    id: &DocumentId,
    what: &'static str,
) -> CommerceResult<T> {
    let reference = DocumentRef::new(T::COLLECTION, id.clone());
    let document = gateway
        .get(&reference)
        .await?
        .ok_or_else(|| CommerceError::not_found(what, id.as_str()))?;
    T::from_document(&document).map_err(|err| CommerceError::invalid(err.to_string()))
}
