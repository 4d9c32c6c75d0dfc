use axum::{Json, extract::State, http::StatusCode};

use super::{discard_on_error, store_image};
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::ApiPath,
    models::{Category, CategoryResponse, CategoryUpload, MessageResponse},
    repository::RepositoryError,
    upload::MultipartForm,
};

fn duplicate_name(err: RepositoryError) -> ApiError {
    match err {
        RepositoryError::UniqueViolation => ApiError::conflict("Category name already exists"),
        other => other.into(),
    }
}

/// list_categories
///
/// [Public Route] Every category, newest first.
#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// create_category
///
/// [Authenticated Route] Creates a category from a multipart form `{name, image?}`.
///
/// The duplicate-name check runs before the image upload so a rejected request never leaves an
/// object behind.
#[utoipa::path(
    post,
    path = "/api/categories",
    request_body(content = CategoryUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = CategoryResponse),
        (status = 400, description = "Missing, empty or duplicate name; invalid image", body = MessageResponse),
        (status = 500, description = "Image upload failed", body = MessageResponse)
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    form: MultipartForm,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    if form.text("name").is_none() {
        return Err(ApiError::validation("Category name is required"));
    }
    let name = form
        .trimmed("name")
        .ok_or_else(|| ApiError::validation("Category name cannot be empty"))?
        .to_string();

    if state.repo.find_category_by_name(&name, None).await?.is_some() {
        return Err(ApiError::conflict("Category name already exists"));
    }

    let image = store_image(&state.storage, form.image).await?;
    let result = state
        .repo
        .create_category(&name, image.as_ref().map(|i| i.url.clone()), user.id)
        .await
        .map_err(duplicate_name);
    let category = discard_on_error(&state.storage, image.as_ref(), result).await?;

    tracing::info!(category_id = category.id, created_by = user.id, "category created");

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            success: true,
            message: "Category created successfully".to_string(),
            category,
        }),
    ))
}

/// update_category
///
/// [Authenticated Route] Renames a category and/or replaces its image. Omitted fields keep
/// their current value. The previous image object is not deleted.
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body(content = CategoryUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated", body = CategoryResponse),
        (status = 400, description = "Empty or duplicate name; invalid image", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    form: MultipartForm,
) -> Result<Json<CategoryResponse>, ApiError> {
    let existing = state
        .repo
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category not found"))?;

    let name = match form.text("name") {
        None => existing.name.clone(),
        Some(_) => form
            .trimmed("name")
            .ok_or_else(|| ApiError::validation("Category name cannot be empty"))?
            .to_string(),
    };

    if name != existing.name && state.repo.find_category_by_name(&name, Some(id)).await?.is_some()
    {
        return Err(ApiError::conflict("Category name already exists"));
    }

    let image = store_image(&state.storage, form.image).await?;
    let image_url = match &image {
        Some(stored) => Some(stored.url.clone()),
        None => existing.image_url.clone(),
    };

    let result = match state.repo.update_category(id, &name, image_url).await {
        Ok(Some(category)) => Ok(category),
        // Deleted between the lookup and the update.
        Ok(None) => Err(ApiError::not_found("Category not found")),
        Err(e) => Err(duplicate_name(e)),
    };
    let category = discard_on_error(&state.storage, image.as_ref(), result).await?;

    tracing::info!(category_id = id, updated_by = user.id, "category updated");

    Ok(Json(CategoryResponse {
        success: true,
        message: "Category updated successfully".to_string(),
        category,
    }))
}

/// delete_category
///
/// [Authenticated Route] Deletes a category that no article references.
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Category still has news", body = MessageResponse),
        (status = 404, description = "Not Found", body = MessageResponse)
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    const IN_USE: &str = "Cannot delete category with associated news articles";

    if state.repo.get_category(id).await?.is_none() {
        return Err(ApiError::not_found("Category not found"));
    }

    if state.repo.count_news_in_category(id).await? > 0 {
        return Err(ApiError::conflict(IN_USE));
    }

    // The foreign key still guards against an article linked after the count.
    let deleted = state.repo.delete_category(id).await.map_err(|e| match e {
        RepositoryError::ForeignKeyViolation => ApiError::conflict(IN_USE),
        other => other.into(),
    })?;
    if !deleted {
        return Err(ApiError::not_found("Category not found"));
    }

    tracing::info!(category_id = id, deleted_by = user.id, "category deleted");
    Ok(Json(MessageResponse::ok("Category deleted successfully")))
}
