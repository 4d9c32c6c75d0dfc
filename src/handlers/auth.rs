use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{self, issue_token},
    error::ApiError,
    extract::ApiJson,
    models::{LoginRequest, LoginResponse, UserProfile},
};

/// login
///
/// [Public Route] Exchanges a username and password for a 24-hour session token.
///
/// Unknown usernames and wrong passwords produce the same 401 so the endpoint does not reveal
/// which accounts exist.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = crate::models::MessageResponse),
        (status = 401, description = "Invalid credentials", body = crate::models::MessageResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let Some(user) = state.repo.find_credentials(username).await? else {
        tracing::info!(username = %username, "login rejected: unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    // argon2 verification is CPU-bound; keep it off the async workers.
    let password = payload.password;
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!("password verification task failed: {:?}", e);
            ApiError::Internal
        })?;

    if !valid {
        tracing::info!(user_id = user.id, "login rejected: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(&state.config.jwt_secret, &user)?;
    tracing::info!(user_id = user.id, role = user.role.as_str(), "login succeeded");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: UserProfile {
            id: user.id,
            username: user.username,
            role: user.role,
        },
    }))
}
