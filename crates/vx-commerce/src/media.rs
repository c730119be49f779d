//! Media URL checks and uploads
//!
//! Validation is syntactic only: a URL counts as an image or video when it is
//! http(s) and either its path ends in a known extension or it follows the
//! CDN's `/image/upload/` or `/video/upload/` delivery layout.

use crate::error::MediaError;
use std::path::Path;
use url::Url;
use vx_gateway::{MediaUploader, ResourceType};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "avif", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov", "m4v"];

/// Kind of media a URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Still image
    Image,
    /// Video clip
    Video,
}

impl MediaKind {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Image => IMAGE_EXTENSIONS,
            Self::Video => VIDEO_EXTENSIONS,
        }
    }

    fn cdn_segment(self) -> &'static str {
        match self {
            Self::Image => "/image/upload/",
            Self::Video => "/video/upload/",
        }
    }

    /// Resource type tag for the upload service
    #[must_use]
    pub fn resource_type(self) -> ResourceType {
        match self {
            Self::Image => ResourceType::Image,
            Self::Video => ResourceType::Video,
        }
    }

    /// Check a file name's extension
    #[must_use]
    pub fn accepts_file(self, file_name: &str) -> bool {
        extension_of(file_name).is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }
}

fn extension_of(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Classify a URL, or `None` if it is neither
#[must_use]
pub fn classify_url(raw: &str) -> Option<MediaKind> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let path = url.path();
    [MediaKind::Image, MediaKind::Video].into_iter().find(|&kind| {
        path.contains(kind.cdn_segment())
            || extension_of(path).is_some_and(|ext| kind.extensions().contains(&ext.as_str()))
    })
}

/// Check for an image URL
#[inline]
#[must_use]
pub fn is_image_url(url: &str) -> bool {
    classify_url(url) == Some(MediaKind::Image)
}

/// Check for a video URL
#[inline]
#[must_use]
pub fn is_video_url(url: &str) -> bool {
    classify_url(url) == Some(MediaKind::Video)
}

/// Require `url` to be of `kind`
///
/// # Errors
/// - `NotImage` / `NotVideo` when it is not
pub fn ensure_kind(url: &str, kind: MediaKind) -> Result<(), MediaError> {
    if classify_url(url) == Some(kind) {
        return Ok(());
    }
    Err(match kind {
        MediaKind::Image => MediaError::NotImage(url.to_string()),
        MediaKind::Video => MediaError::NotVideo(url.to_string()),
    })
}

/// Upload a file and return its verified URL
///
/// # Errors
/// - `WrongFileType` before uploading when the extension does not fit
/// - `Upload` when the service refuses
/// - `NotImage` / `NotVideo` when the returned URL does not classify
pub async fn upload_media(
    uploader: &dyn MediaUploader,
    file_name: &str,
    bytes: Vec<u8>,
    kind: MediaKind,
) -> Result<String, MediaError> {
    if !kind.accepts_file(file_name) {
        return Err(MediaError::WrongFileType(file_name.to_string()));
    }
    let size = bytes.len();
    let url = uploader.upload(file_name, bytes, kind.resource_type()).await?;
    ensure_kind(&url, kind)?;
    tracing::info!("Uploaded {} ({} bytes) to {}", file_name, size, url);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vx_gateway::{MemoryMediaStore, UploadError};

    mockall::mock! {
        #[derive(Debug)]
        Uploader {}

        #[async_trait]
        impl MediaUploader for Uploader {
            async fn upload(
                &self,
                file_name: &str,
                bytes: Vec<u8>,
                resource_type: ResourceType,
            ) -> Result<String, UploadError>;
        }
    }

    #[test]
    fn classifies_by_extension() {
        assert_eq!(classify_url("https://cdn.example.com/a/rice.JPG"), Some(MediaKind::Image));
        assert_eq!(classify_url("https://cdn.example.com/a/promo.webm"), Some(MediaKind::Video));
        assert_eq!(classify_url("https://cdn.example.com/a/rice.png?w=200"), Some(MediaKind::Image));
        assert_eq!(classify_url("https://cdn.example.com/a/readme.txt"), None);
    }

    #[test]
    fn classifies_by_cdn_layout() {
        assert!(is_image_url("https://res.example.com/demo/image/upload/v1/abc"));
        assert!(is_video_url("https://res.example.com/demo/video/upload/v1/abc"));
    }

    #[test]
    fn rejects_non_http() {
        assert_eq!(classify_url("ftp://cdn.example.com/rice.png"), None);
        assert_eq!(classify_url("data:image/png;base64,AAAA"), None);
        assert_eq!(classify_url("rice.png"), None);
    }

    #[test]
    fn ensure_kind_errors() {
        assert!(ensure_kind("https://x.example/a.mp4", MediaKind::Video).is_ok());
        assert_eq!(
            ensure_kind("https://x.example/a.mp4", MediaKind::Image),
            Err(MediaError::NotImage("https://x.example/a.mp4".into()))
        );
    }

    #[tokio::test]
    async fn upload_round_trip() {
        let store = MemoryMediaStore::new("vx");
        let url = upload_media(&store, "rice.png", vec![1, 2, 3], MediaKind::Image)
            .await
            .unwrap();
        assert!(is_image_url(&url));
        assert_eq!(store.fetch(&url), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn wrong_file_type_never_uploads() {
        let store = MemoryMediaStore::new("vx");
        let err = upload_media(&store, "clip.mp4", vec![1], MediaKind::Image)
            .await
            .unwrap_err();
        assert_eq!(err, MediaError::WrongFileType("clip.mp4".into()));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn returned_url_is_verified() {
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload()
            .returning(|_, _, _| Ok("https://cdn.example.com/files/blob".to_string()));
        assert!(format!("{uploader:?}").starts_with("MockUploader"));
        let err = upload_media(&uploader, "rice.png", vec![1], MediaKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::NotImage(_)));
    }

    #[tokio::test]
    async fn upload_rejection_is_wrapped() {
        let store = MemoryMediaStore::new("vx");
        let err = upload_media(&store, "empty.png", Vec::new(), MediaKind::Image)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Upload(UploadError::EmptyFile(_))));
    }
}
