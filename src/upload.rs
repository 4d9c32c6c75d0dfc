//! Image upload adapter.
//!
//! Reads the multipart body of the category/news write routes, validates the optional `image`
//! file and pushes it to the object store under a unique key.

use std::{collections::HashMap, path::Path, time::Duration};

use axum::{
    extract::{Multipart, multipart::MultipartError},
    http::StatusCode,
};
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::{StorageError, StorageService};

/// Largest accepted image, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Prefix shared by every stored image key.
pub const IMAGE_KEY_PREFIX: &str = "news-images/";

/// Validity window of the returned read URL (7 days).
pub const IMAGE_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Name of the multipart field carrying the file.
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file type. Only images are allowed.")]
    InvalidType(String),
    #[error("File size should be less than 5MB")]
    TooLarge,
    #[error("Malformed multipart body: {0}")]
    Malformed(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An in-memory file taken from the request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Enforces the `image/*` MIME prefix and the size cap.
    pub fn validate(&self) -> Result<(), UploadError> {
        if !self.content_type.starts_with("image/") {
            return Err(UploadError::InvalidType(self.content_type.clone()));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            tracing::debug!(size = self.bytes.len(), "image rejected: too large");
            return Err(UploadError::TooLarge);
        }
        Ok(())
    }
}

/// The outcome of a successful upload: where the object lives and how to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub key: String,
    pub url: String,
}

/// object_key
///
/// `news-images/{millis}-{uuid}.{ext}` with the lowercased extension of the original name.
pub fn object_key(file_name: &str, timestamp_millis: i64, id: Uuid) -> String {
    let extension = match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => file_name.to_lowercase(),
    };
    // Keys must not carry path segments coming from the client.
    let extension = Path::new(&extension)
        .file_name()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or("bin")
        .to_string();

    format!("{IMAGE_KEY_PREFIX}{timestamp_millis}-{id}.{extension}")
}

/// upload_image
///
/// Validates `image`, stores it and returns a presigned read URL. Validation failures return
/// before the object store is contacted.
pub async fn upload_image(
    storage: &dyn StorageService,
    image: ImageUpload,
) -> Result<StoredImage, UploadError> {
    image.validate()?;

    let key = object_key(&image.file_name, Utc::now().timestamp_millis(), Uuid::new_v4());
    tracing::debug!(
        key = %key,
        size = image.bytes.len(),
        content_type = %image.content_type,
        "uploading image"
    );

    storage
        .put_object(&key, image.bytes, &image.content_type)
        .await?;
    let url = match storage.presigned_get_url(&key, IMAGE_URL_TTL).await {
        Ok(url) => url,
        Err(e) => {
            // Nothing will ever reference the object without a URL.
            if let Err(cleanup) = storage.delete_object(&key).await {
                tracing::warn!(key = %key, "failed to discard unsigned upload: {}", cleanup);
            }
            return Err(e.into());
        }
    };

    tracing::info!(key = %key, "image stored");
    Ok(StoredImage { key, url })
}

/// purge_local_uploads
///
/// Removes every regular file directly inside `dir` except `.gitkeep` and returns how many were
/// removed. A missing directory counts as already empty.
pub async fn purge_local_uploads(dir: &Path) -> std::io::Result<u64> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name() == ".gitkeep" || !entry.file_type().await?.is_file() {
            continue;
        }
        tokio::fs::remove_file(entry.path()).await?;
        removed += 1;
    }
    Ok(removed)
}

/// The body limit of the router surfaces here as a multipart error; report it like any other
/// oversized image.
fn multipart_error(err: MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge
    } else {
        UploadError::Malformed(err.body_text())
    }
}

/// MultipartForm
///
/// Text fields and the optional image file of a multipart body.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl MultipartForm {
    /// read
    ///
    /// Drains `multipart`. A file part with an empty filename counts as "no file", matching what
    /// browsers send for an untouched file input.
    pub async fn read(mut multipart: Multipart) -> Result<Self, UploadError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(multipart_error)?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                // Reject before buffering the body.
                if !file_name.is_empty() && !content_type.starts_with("image/") {
                    return Err(UploadError::InvalidType(content_type));
                }

                let bytes = field
                    .bytes()
                    .await
                    .map_err(multipart_error)?;

                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }

                form.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Raw value of a text field, if it was sent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed value of a text field; `None` when absent or blank.
    pub fn trimmed(&self, name: &str) -> Option<&str> {
        self.text(name).map(str::trim).filter(|v| !v.is_empty())
    }
}
