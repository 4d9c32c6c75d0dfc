use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{Role, UserCredentials},
};

/// Lifetime of an issued session token.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// AuthError
///
/// Failures of the token service and of password hashing.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("expired token")]
    ExpiredToken,
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Claims
///
/// Payload of a session token. The identity is trusted as-is until `exp`; the credential store
/// is not consulted again on verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub role: Role,
    /// Issued At: seconds since the epoch.
    pub iat: usize,
    /// Expiration Time: seconds since the epoch.
    pub exp: usize,
}

/// issue_token
///
/// Signs an HS256 token for `user` that expires `TOKEN_TTL_HOURS` from now.
pub fn issue_token(secret: &str, user: &UserCredentials) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        id: user.id,
        username: user.username.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::Signing)
}

/// verify_token
///
/// Checks signature and expiry and returns the embedded claims unmodified.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // Expiry is exact: a token is rejected the second it passes `exp`.
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        _ => AuthError::InvalidToken,
    })
}

/// Hashes a plaintext password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Returns `true` when `password` matches the stored PHC `hash`. A malformed stored hash counts
/// as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("stored password hash is malformed: {}", e);
            false
        }
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request, decoded from the bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    /// Rejects callers that are not administrators.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = self.id, "admin access denied");
            Err(ApiError::forbidden("Admin access required"))
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument and as the argument of `auth_middleware`.
///
/// 1. Token extraction: `Authorization: Bearer <token>`, otherwise 401.
/// 2. Token verification against `AppConfig::jwt_secret`, otherwise 403.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = verify_token(&config.jwt_secret, token).inspect_err(|e| {
            tracing::debug!("token rejected: {}", e);
        })?;

        Ok(AuthUser::from(claims))
    }
}
