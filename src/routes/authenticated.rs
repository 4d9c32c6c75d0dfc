use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Write operations on categories and news, available to any logged-in user. Handlers receive
/// the validated `AuthUser` and enforce creator-only rules on news themselves.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Categories ---
        // Multipart bodies: `name` plus an optional `image` file.
        .route("/categories", post(handlers::categories::create_category))
        .route(
            "/categories/{id}",
            put(handlers::categories::update_category).delete(handlers::categories::delete_category),
        )
        // --- News ---
        // GET /news/my-news
        // The static segment wins over the public `/news/{id}` route.
        .route("/news/my-news", get(handlers::news::get_my_news))
        .route("/news", post(handlers::news::create_news))
        // PUT is creator-only; DELETE is creator-or-admin.
        .route(
            "/news/{id}",
            put(handlers::news::update_news).delete(handlers::news::delete_news),
        )
}
