use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Admin Router Module
///
/// Oversight and user management, restricted to `role = admin`. The router is wrapped in the
/// admin middleware and every handler checks the role again.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/news
        // Every article, for the admin panel.
        .route("/admin/news", get(handlers::news::get_admin_news))
        // DELETE /clear-all
        // Removes every article and category, then purges the local upload directory.
        .route("/clear-all", delete(handlers::news::clear_all))
        // --- User management ---
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/users/{id}", delete(handlers::users::delete_user))
}
