use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::ApiError,
    extract::{ApiJson, ApiPath},
    models::{CreateUserRequest, MessageResponse, NewUser, User, UserResponse},
    repository::RepositoryError,
};

/// list_users
///
/// [Admin Route] Lists every account without password hashes.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    user.require_admin()?;
    Ok(Json(state.repo.list_users().await?))
}

/// create_user
///
/// [Admin Route] Creates an account. The role defaults to `user`.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserResponse),
        (status = 400, description = "Missing fields or username taken", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    user.require_admin()?;

    let username = payload.username.trim().to_string();
    if username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!("password hashing task failed: {:?}", e);
            ApiError::Internal
        })??;

    let created = state
        .repo
        .create_user(NewUser {
            username,
            password_hash,
            role: payload.role.unwrap_or_default(),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::UniqueViolation => ApiError::conflict("Username already exists"),
            other => other.into(),
        })?;

    tracing::info!(user_id = created.id, created_by = user.id, "user created");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            message: "User created successfully".to_string(),
            user: created,
        }),
    ))
}

/// delete_user
///
/// [Admin Route] Deletes an account. Accounts that still own news or categories are protected
/// by the foreign keys and reported as a conflict.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "User still owns content", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_admin()?;

    let deleted = state.repo.delete_user(id).await.map_err(|e| match e {
        RepositoryError::ForeignKeyViolation => {
            ApiError::conflict("User still owns news or categories")
        }
        other => other.into(),
    })?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    tracing::info!(user_id = id, deleted_by = user.id, "user deleted");
    Ok(Json(MessageResponse::ok("User deleted successfully")))
}
