//! Media upload seam
//!
//! Uploads a file and hands back a durable URL. Transformation, storage and
//! delivery belong to the CDN; callers only see the URL.

use crate::error::UploadError;
use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

/// Resource type tag sent with an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Still image
    Image,
    /// Video clip
    Video,
}

impl ResourceType {
    /// Path segment used by CDN upload URLs
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Client of a media upload service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaUploader: Send + Sync + std::fmt::Debug {
    /// Upload a file and return its durable URL
    async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        resource_type: ResourceType,
    ) -> Result<String, UploadError>;
}

/// In-process uploader issuing CDN-shaped URLs
///
/// URLs look like `https://media.local/<cloud>/<image|video>/upload/<ulid>.<ext>`.
#[derive(Debug)]
pub struct MemoryMediaStore {
    cloud: String,
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryMediaStore {
    /// Create store for a cloud name
    #[inline]
    #[must_use]
    pub fn new(cloud: impl Into<String>) -> Self {
        Self {
            cloud: cloud.into(),
            objects: DashMap::new(),
        }
    }

    /// Number of stored objects
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Bytes behind a previously issued URL
    #[must_use]
    pub fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        self.objects.get(url).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl MediaUploader for MemoryMediaStore {
    async fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        resource_type: ResourceType,
    ) -> Result<String, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::EmptyFile(file_name.to_string()));
        }
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .ok_or_else(|| UploadError::UnsupportedType(file_name.to_string()))?;

        let url = format!(
            "https://media.local/{}/{}/upload/{}.{}",
            self.cloud,
            resource_type.as_str(),
            Ulid::new().to_string().to_lowercase(),
            extension
        );
        tracing::debug!("Stored {} ({} bytes) at {}", file_name, bytes.len(), url);
        self.objects.insert(url.clone(), bytes);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_issues_typed_url() {
        let store = MemoryMediaStore::new("vx");
        let url = store
            .upload("Cover.PNG", vec![1, 2, 3], ResourceType::Image)
            .await
            .unwrap();

        assert!(url.starts_with("https://media.local/vx/image/upload/"));
        assert!(url.ends_with(".png"));
        assert_eq!(store.fetch(&url), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn upload_rejects_empty_and_extensionless() {
        let store = MemoryMediaStore::new("vx");
        assert!(matches!(
            store.upload("a.png", vec![], ResourceType::Image).await,
            Err(UploadError::EmptyFile(_))
        ));
        assert!(matches!(
            store.upload("clip", vec![1], ResourceType::Video).await,
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(store.is_empty());
    }
}
