//! File storage for recipe images.
//!
//! Images arrive as base64 `data:` URLs inside JSON payloads, are decoded
//! here and written through a [`StorageBackend`].

use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{AppError, AppResult};

/// Uploaded file metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Storage key (path relative to the storage root).
    pub key: String,
    /// Public URL to access the file.
    pub url: String,
    /// File size in bytes.
    pub size: u64,
    /// MIME content type.
    pub content_type: String,
}

/// Storage backend trait.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Upload a file.
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile>;

    /// Delete a file.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Get the public URL for a key.
    fn public_url(&self, key: &str) -> String;

    /// Check if a file exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage backend.
    #[must_use]
    pub const fn new(base_path: PathBuf, base_url: String) -> Self {
        Self { base_path, base_url }
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn upload(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> AppResult<UploadedFile> {
        let path = self.base_path.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {e}")))?;

        Ok(UploadedFile {
            key: key.to_string(),
            url: self.public_url(key),
            size: data.len() as u64,
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.base_path.join(key);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.base_path.join(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to stat file: {e}")))
    }
}

/// An image decoded from a `data:image/<ext>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// File extension derived from the MIME subtype.
    pub extension: String,
    /// MIME content type, e.g. `image/png`.
    pub content_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

const ALLOWED_IMAGE_TYPES: &[&str] = &["png", "jpeg", "jpg", "gif", "webp"];

/// Decode a base64 image data URL.
///
/// Errors are reported against the `image` field.
pub fn decode_image_data_url(value: &str) -> AppResult<DecodedImage> {
    let invalid = |message: &str| AppError::field("image", message);

    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| invalid("expected a data:image/<type>;base64 URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing image payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| invalid("image payload must be base64 encoded"))?;
    let subtype = mime
        .strip_prefix("image/")
        .ok_or_else(|| invalid("payload is not an image"))?
        .to_ascii_lowercase();

    if !ALLOWED_IMAGE_TYPES.contains(&subtype.as_str()) {
        return Err(invalid(&format!("unsupported image type: {subtype}")));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| invalid("invalid base64 image payload"))?;
    if bytes.is_empty() {
        return Err(invalid("image is empty"));
    }

    let extension = if subtype == "jpeg" { "jpg".to_string() } else { subtype.clone() };

    Ok(DecodedImage {
        extension,
        content_type: format!("image/{subtype}"),
        bytes,
    })
}

/// Generate a unique storage key under `prefix`.
#[must_use]
pub fn generate_storage_key(prefix: &str, id: &str, extension: &str) -> String {
    format!("{}/{id}.{extension}", prefix.trim_end_matches('/'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_storage_key() {
        let key = generate_storage_key("recipes/", "01hx", "png");
        assert_eq!(key, "recipes/01hx.png");
    }

    #[test]
    fn test_decode_png_data_url() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG fake"));
        let image = decode_image_data_url(&url).unwrap();

        assert_eq!(image.extension, "png");
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.bytes, b"\x89PNG fake");
    }

    #[test]
    fn test_jpeg_is_stored_as_jpg() {
        let url = format!("data:image/jpeg;base64,{}", STANDARD.encode(b"jpeg"));
        assert_eq!(decode_image_data_url(&url).unwrap().extension, "jpg");
    }

    #[test]
    fn test_rejects_malformed_data_urls() {
        for bad in [
            "not a data url",
            "data:image/png;base64",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/png,aGVsbG8=",
            "data:image/bmp;base64,aGVsbG8=",
            "data:image/png;base64,@@@",
            "data:image/png;base64,",
        ] {
            let err = decode_image_data_url(bad).unwrap_err();
            assert!(
                matches!(&err, AppError::InvalidField { field, .. } if field == "image"),
                "{bad}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_local_storage_roundtrip() {
        let dir = std::env::temp_dir().join(format!("foodgram-storage-{}", ulid::Ulid::new()));
        let storage = LocalStorage::new(dir.clone(), "/media/".to_string());

        let uploaded = storage
            .upload("recipes/a.png", b"bytes", "image/png")
            .await
            .unwrap();
        assert_eq!(uploaded.url, "/media/recipes/a.png");
        assert_eq!(uploaded.size, 5);
        assert!(storage.exists("recipes/a.png").await.unwrap());

        storage.delete("recipes/a.png").await.unwrap();
        assert!(!storage.exists("recipes/a.png").await.unwrap());
        // Deleting twice is fine.
        storage.delete("recipes/a.png").await.unwrap();

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
