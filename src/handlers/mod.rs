//! HTTP handlers, one module per resource.
//!
//! Handlers own the resource rules (validation, conflicts, ownership) and talk to the
//! `Repository` and `StorageService` traits through `AppState`.

pub mod auth;
pub mod categories;
pub mod news;
pub mod users;

use crate::{
    error::ApiError,
    storage::StorageState,
    upload::{self, ImageUpload, StoredImage},
};

/// Uploads the optional form image. `None` in, `None` out.
async fn store_image(
    storage: &StorageState,
    image: Option<ImageUpload>,
) -> Result<Option<StoredImage>, ApiError> {
    match image {
        Some(image) => Ok(Some(upload::upload_image(storage.as_ref(), image).await?)),
        None => Ok(None),
    }
}

/// Compensating action for upload-then-write: when the write failed, the object uploaded for it
/// is removed so no stored image is left without a row pointing at it.
async fn discard_on_error<T>(
    storage: &StorageState,
    image: Option<&StoredImage>,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    if result.is_err() {
        if let Some(image) = image {
            match storage.delete_object(&image.key).await {
                Ok(()) => tracing::info!(key = %image.key, "discarded orphaned upload"),
                Err(e) => tracing::warn!(key = %image.key, "failed to discard orphaned upload: {}", e),
            }
        }
    }
    result
}

/// Parses the optional `category_id` form value. Blank means "no category".
fn parse_category_id(raw: &str) -> Result<Option<i64>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| ApiError::validation("category_id must be a number"))
}
