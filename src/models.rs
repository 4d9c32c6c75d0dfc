use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Roles ---

/// Role
///
/// The RBAC field of a user. Persisted and serialized as `"admin"` or `"user"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    #[serde(rename = "user")]
    Regular,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Regular => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::Regular),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Public view of a row in the `users` table. The password hash never leaves the repository
/// through this type.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserCredentials
///
/// Internal row used by login: the identity plus its argon2 PHC hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// Category
///
/// A row of the `categories` table. `name` is unique and stored trimmed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub image_url: Option<String>,
    // Nullable FK to users.id.
    pub created_by: Option<i64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// News
///
/// A bare row of the `news` table, as returned by create and update.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub created_by: i64,
    pub views: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewsItem
///
/// A news row joined with its category name and its publisher's username. This is the shape of
/// every listing and of the single-article read.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    // Loaded via LEFT JOIN on categories.
    pub category_name: Option<String>,
    pub created_by: i64,
    // Loaded via LEFT JOIN on users.
    pub publisher: Option<String>,
    pub view_count: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Repository Inputs ---

/// Insert payload for a user. `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Insert payload for a news article.
#[derive(Debug, Clone, Default)]
pub struct NewNews {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
    pub created_by: i64,
}

/// Full replacement of the mutable columns of a news article. The handler merges the request
/// with the current row before building it.
#[derive(Debug, Clone, Default)]
pub struct NewsChanges {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category_id: Option<i64>,
}

/// Row counts removed by the clear-all operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ClearSummary {
    pub news_deleted: u64,
    pub categories_deleted: u64,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for `POST /login`. Missing fields deserialize as empty strings and are then
/// rejected as validation errors rather than JSON rejections.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// CreateUserRequest
///
/// Input payload for `POST /users`. The password is hashed immediately and never persisted or
/// logged in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
}

/// CategoryUpload
///
/// Documentation schema of the multipart form accepted by the category create/update routes.
#[derive(Debug, Clone, ToSchema)]
#[allow(dead_code)]
pub struct CategoryUpload {
    /// Required on create, optional on update.
    pub name: Option<String>,
    /// Image file, `image/*`, at most 5 MiB.
    #[schema(format = Binary)]
    pub image: Option<String>,
}

/// NewsUpload
///
/// Documentation schema of the multipart form accepted by the news create/update routes.
#[derive(Debug, Clone, ToSchema)]
#[allow(dead_code)]
pub struct NewsUpload {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Numeric category id. An empty value unlinks the category on update.
    pub category_id: Option<String>,
    /// Image file, `image/*`, at most 5 MiB.
    #[schema(format = Binary)]
    pub image: Option<String>,
}

// --- Response Payloads (Output Schemas) ---

/// UserProfile
///
/// The identity embedded in the login response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

/// MessageResponse
///
/// Body of every operation that only reports an outcome (deletes).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryResponse {
    pub success: bool,
    pub message: String,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: User,
}

/// CreateNewsResponse
///
/// Body of `POST /news`. Keys are camelCase (`newsId`, `imageUrl`) for frontend compatibility.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateNewsResponse {
    pub success: bool,
    pub message: String,
    pub news_id: i64,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NewsResponse {
    pub success: bool,
    pub message: String,
    pub news: News,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ClearAllResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub summary: ClearSummary,
    /// Files removed from the local upload directory.
    pub files_purged: u64,
}
