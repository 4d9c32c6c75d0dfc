use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: login and the read side of categories and news.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /login
        // Exchanges username/password for a 24h bearer token.
        .route("/login", post(handlers::auth::login))
        .route("/categories", get(handlers::categories::list_categories))
        .route("/news", get(handlers::news::list_news))
        // GET /news/{id}
        // Every call increments the article's view counter.
        .route("/news/{id}", get(handlers::news::get_news))
}
