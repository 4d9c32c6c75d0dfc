//! Request extractors whose rejections go through `ApiError`.
//!
//! axum's stock `Path`, `Json` and `Multipart` reject with plain-text bodies. These wrappers keep
//! every error response in the `{"success": false, "message": ...}` shape.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::{error::ApiError, upload::MultipartForm};

/// ApiPath
///
/// `Path<T>` with an `ApiError` rejection, so `/news/abc` is a JSON 400.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(ApiPath(value))
    }
}

/// ApiJson
///
/// `Json<T>` with an `ApiError` rejection (malformed body, wrong content type).
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Multipart bodies are drained into a `MultipartForm` before the handler runs. A request that
/// is not `multipart/form-data` at all is a validation error.
impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Ok(MultipartForm::read(multipart).await?)
    }
}
