use axum::{
    Json,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    auth::AuthError, models::MessageResponse, repository::RepositoryError, upload::UploadError,
};

/// ApiError
///
/// The single error type returned by every handler. Each variant maps to one status code and a
/// `{"success": false, "message": ...}` body. Internal causes are logged where they are converted
/// and never echoed to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidUpload(String),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Error uploading image")]
    UploadFailed,
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::InvalidUpload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken | ApiError::ExpiredToken | ApiError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UploadFailed | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = MessageResponse {
            success: false,
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation => ApiError::conflict("Resource already exists"),
            RepositoryError::ForeignKeyViolation => {
                ApiError::conflict("Resource is still referenced by other records")
            }
            RepositoryError::Database(e) => {
                tracing::error!("repository error: {:?}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthenticated,
            AuthError::InvalidToken => ApiError::InvalidToken,
            AuthError::ExpiredToken => ApiError::ExpiredToken,
            AuthError::Signing(e) => {
                tracing::error!("token signing error: {:?}", e);
                ApiError::Internal
            }
            AuthError::Hashing(e) => {
                tracing::error!("password hashing error: {}", e);
                ApiError::Internal
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidType(_) | UploadError::TooLarge | UploadError::Malformed(_) => {
                ApiError::InvalidUpload(err.to_string())
            }
            UploadError::Storage(cause) => {
                tracing::error!("object store upload failed: {}", cause);
                ApiError::UploadFailed
            }
        }
    }
}

// --- Extractor rejections ---

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
