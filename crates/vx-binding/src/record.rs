//! Typed records and snapshot decoding

use crate::error::BindError;
use serde::de::DeserializeOwned;
use vx_gateway::{Document, DocumentId, RawSnapshot};

/// A domain record stored in one collection
///
/// Records deserialize from the document's fields with the identifier folded
/// in under `id`.
pub trait Record: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the record lives in
    const COLLECTION: &'static str;

    /// Store-assigned identifier
    fn id(&self) -> &DocumentId;

    /// Map a stored document to the record
    ///
    /// # Errors
    /// - `BindError::Decode` if the fields do not fit the record shape
    fn from_document(document: &Document) -> Result<Self, BindError> {
        serde_json::from_value(document.to_value())
            .map_err(|e| BindError::decode(document.id.as_str(), e.to_string()))
    }
}

/// Decode a whole snapshot, preserving order
///
/// Documents that do not decode are skipped with a warning; the rest of the
/// snapshot is still delivered.
#[must_use]
pub fn decode_collection<T: Record>(snapshot: RawSnapshot) -> Option<Vec<T>> {
    let records = snapshot
        .documents
        .iter()
        .filter_map(|doc| match T::from_document(doc) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!("Skipping {}/{}: {}", T::COLLECTION, doc.id, err);
                None
            }
        })
        .collect();
    Some(records)
}

/// Decode a single-document snapshot; `None` when the document is absent
#[must_use]
pub fn decode_document<T: Record>(snapshot: RawSnapshot) -> Option<T> {
    let doc = snapshot.documents.into_iter().next()?;
    match T::from_document(&doc) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!("Undecodable {}/{}: {}", T::COLLECTION, doc.id, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct Item {
        id: DocumentId,
        name: String,
    }

    impl Record for Item {
        const COLLECTION: &'static str = "items";

        fn id(&self) -> &DocumentId {
            &self.id
        }
    }

    fn doc(id: &str, value: serde_json::Value) -> Document {
        Document::new(id, value.as_object().cloned().unwrap())
    }

    #[test]
    fn collection_skips_bad_documents() {
        let snapshot = RawSnapshot::new(vec![
            doc("a", json!({"name": "Rice"})),
            doc("b", json!({"title": "wrong shape"})),
            doc("c", json!({"name": "Dal"})),
        ]);
        let items: Vec<Item> = decode_collection(snapshot).unwrap();
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Rice", "Dal"]);
        assert_eq!(items[1].id(), &DocumentId::from("c"));
    }

    #[test]
    fn document_absent_is_none() {
        assert!(decode_document::<Item>(RawSnapshot::default()).is_none());
        let found = decode_document::<Item>(RawSnapshot::new(vec![doc("x", json!({"name": "Tea"}))]));
        assert_eq!(found.map(|i| i.name), Some("Tea".to_string()));
    }
}
