use axum::{Json, extract::State, http::StatusCode};

use super::{discard_on_error, parse_category_id, store_image};
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::ApiPath,
    models::{
        ClearAllResponse, CreateNewsResponse, MessageResponse, NewNews, NewsChanges, NewsItem,
        NewsResponse, NewsUpload,
    },
    upload::{self, MultipartForm},
};

/// Resolves an optional `category_id` form value to an existing category id.
async fn resolve_category(state: &AppState, raw: &str) -> Result<Option<i64>, ApiError> {
    match parse_category_id(raw)? {
        Some(id) => match state.repo.get_category(id).await? {
            Some(_) => Ok(Some(id)),
            None => Err(ApiError::validation("Category does not exist")),
        },
        None => Ok(None),
    }
}

/// Validates a replacement text field: absent keeps `current`, present must not be blank.
fn replace_text(
    form: &MultipartForm,
    field: &str,
    current: String,
    message: &str,
) -> Result<String, ApiError> {
    match form.text(field) {
        None => Ok(current),
        Some(_) => form
            .trimmed(field)
            .map(str::to_string)
            .ok_or_else(|| ApiError::validation(message)),
    }
}

/// list_news
///
/// [Public Route] Every article, newest first, with `category_name`, `publisher` and
/// `view_count`.
#[utoipa::path(
    get,
    path = "/api/news",
    responses((status = 200, description = "All news", body = [NewsItem]))
)]
pub async fn list_news(State(state): State<AppState>) -> Result<Json<Vec<NewsItem>>, ApiError> {
    Ok(Json(state.repo.list_news().await?))
}

/// get_news
///
/// [Public Route] Reads one article. Every call counts as a view: the returned `view_count`
/// already includes this read.
#[utoipa::path(
    get,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "News ID")),
    responses(
        (status = 200, description = "Found", body = NewsItem),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn get_news(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<NewsItem>, ApiError> {
    state
        .repo
        .view_news(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("News not found"))
}

/// get_my_news
///
/// [Authenticated Route] Articles written by the caller.
#[utoipa::path(
    get,
    path = "/api/news/my-news",
    responses((status = 200, description = "My news", body = [NewsItem]))
)]
pub async fn get_my_news(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsItem>>, ApiError> {
    Ok(Json(state.repo.list_news_by_author(id).await?))
}

/// get_admin_news
///
/// [Admin Route] Every article for the admin panel.
#[utoipa::path(
    get,
    path = "/api/admin/news",
    responses(
        (status = 200, description = "All news", body = [NewsItem]),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn get_admin_news(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsItem>>, ApiError> {
    user.require_admin()?;
    Ok(Json(state.repo.list_news().await?))
}

/// create_news
///
/// [Authenticated Route] Publishes an article from a multipart form
/// `{title, content, category_id?, image?}`. The caller becomes its creator.
#[utoipa::path(
    post,
    path = "/api/news",
    request_body(content = NewsUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = CreateNewsResponse),
        (status = 400, description = "Missing fields, unknown category or invalid image", body = MessageResponse),
        (status = 500, description = "Image upload failed", body = MessageResponse)
    )
)]
pub async fn create_news(
    user: AuthUser,
    State(state): State<AppState>,
    form: MultipartForm,
) -> Result<(StatusCode, Json<CreateNewsResponse>), ApiError> {
    let title = form
        .trimmed("title")
        .ok_or_else(|| ApiError::validation("Title is required"))?
        .to_string();
    let content = form
        .trimmed("content")
        .ok_or_else(|| ApiError::validation("Content is required"))?
        .to_string();
    let category_id = match form.text("category_id") {
        Some(raw) => resolve_category(&state, raw).await?,
        None => None,
    };

    let image = store_image(&state.storage, form.image).await?;
    let image_url = image.as_ref().map(|i| i.url.clone());

    let result = state
        .repo
        .create_news(NewNews {
            title,
            content,
            image_url: image_url.clone(),
            category_id,
            created_by: user.id,
        })
        .await
        .map_err(ApiError::from);
    let news = discard_on_error(&state.storage, image.as_ref(), result).await?;

    tracing::info!(news_id = news.id, created_by = user.id, "news created");

    Ok((
        StatusCode::CREATED,
        Json(CreateNewsResponse {
            success: true,
            message: "News created successfully".to_string(),
            news_id: news.id,
            image_url,
        }),
    ))
}

/// update_news
///
/// [Authenticated Route] Edits an article. Only its creator may do so.
///
/// Omitted fields keep their value; an empty `category_id` unlinks the category; the image is
/// kept unless a new file is sent.
#[utoipa::path(
    put,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "News ID")),
    request_body(content = NewsUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated", body = NewsResponse),
        (status = 400, description = "Empty fields, unknown category or invalid image", body = MessageResponse),
        (status = 403, description = "Not the creator", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn update_news(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    form: MultipartForm,
) -> Result<Json<NewsResponse>, ApiError> {
    let existing = state
        .repo
        .get_news(id)
        .await?
        .ok_or_else(|| ApiError::not_found("News not found"))?;

    if existing.created_by != user.id {
        tracing::warn!(news_id = id, user_id = user.id, "update rejected: not the creator");
        return Err(ApiError::forbidden("You can only edit your own news posts"));
    }

    let title = replace_text(&form, "title", existing.title, "Title cannot be empty")?;
    let content = replace_text(&form, "content", existing.content, "Content cannot be empty")?;
    let category_id = match form.text("category_id") {
        Some(raw) => resolve_category(&state, raw).await?,
        None => existing.category_id,
    };

    let image = store_image(&state.storage, form.image).await?;
    let image_url = match &image {
        Some(stored) => Some(stored.url.clone()),
        None => existing.image_url,
    };

    let changes = NewsChanges {
        title,
        content,
        image_url,
        category_id,
    };
    let result = match state.repo.update_news(id, changes).await {
        Ok(Some(news)) => Ok(news),
        Ok(None) => Err(ApiError::not_found("News not found")),
        Err(e) => Err(e.into()),
    };
    let news = discard_on_error(&state.storage, image.as_ref(), result).await?;

    tracing::info!(news_id = id, updated_by = user.id, "news updated");

    Ok(Json(NewsResponse {
        success: true,
        message: "News updated successfully".to_string(),
        news,
    }))
}

/// delete_news
///
/// [Authenticated Route] Deletes an article. Allowed for its creator and for admins.
#[utoipa::path(
    delete,
    path = "/api/news/{id}",
    params(("id" = i64, Path, description = "News ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Neither creator nor admin", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn delete_news(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let existing = state
        .repo
        .get_news(id)
        .await?
        .ok_or_else(|| ApiError::not_found("News not found"))?;

    if existing.created_by != user.id && !user.role.is_admin() {
        tracing::warn!(news_id = id, user_id = user.id, "delete rejected: not the creator");
        return Err(ApiError::forbidden("You can only delete your own news posts"));
    }

    if !state.repo.delete_news(id).await? {
        return Err(ApiError::not_found("News not found"));
    }

    tracing::info!(news_id = id, deleted_by = user.id, "news deleted");
    Ok(Json(MessageResponse::ok("News deleted successfully")))
}

/// clear_all
///
/// [Admin Route] Deletes every article and every category, then purges the local upload cache.
/// Objects already in the object store are left in place.
#[utoipa::path(
    delete,
    path = "/api/clear-all",
    responses(
        (status = 200, description = "Cleared", body = ClearAllResponse),
        (status = 403, description = "Not an admin", body = MessageResponse)
    )
)]
pub async fn clear_all(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ClearAllResponse>, ApiError> {
    user.require_admin()?;

    let summary = state.repo.clear_content().await?;

    // The rows are already gone; a failed purge is reported in the logs only.
    let files_purged = match upload::purge_local_uploads(&state.config.upload_dir).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(dir = ?state.config.upload_dir, "failed to purge local uploads: {}", e);
            0
        }
    };

    tracing::info!(
        news = summary.news_deleted,
        categories = summary.categories_deleted,
        files = files_purged,
        cleared_by = user.id,
        "content cleared"
    );

    Ok(Json(ClearAllResponse {
        success: true,
        message: "Successfully deleted all news and categories".to_string(),
        summary,
        files_purged,
    }))
}
