use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod upload;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use error::ApiError;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and every schema into the OpenAPI document served
/// at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::categories::list_categories, handlers::categories::create_category,
        handlers::categories::update_category, handlers::categories::delete_category,
        handlers::news::list_news, handlers::news::get_news, handlers::news::get_my_news,
        handlers::news::get_admin_news, handlers::news::create_news, handlers::news::update_news,
        handlers::news::delete_news, handlers::news::clear_all,
        handlers::users::list_users, handlers::users::create_user, handlers::users::delete_user,
    ),
    components(
        schemas(
            models::Role, models::User, models::Category, models::News, models::NewsItem,
            models::ClearSummary, models::LoginRequest, models::CreateUserRequest,
            models::CategoryUpload, models::NewsUpload, models::UserProfile, models::LoginResponse,
            models::MessageResponse, models::CategoryResponse, models::UserResponse,
            models::CreateNewsResponse, models::NewsResponse, models::ClearAllResponse,
        )
    ),
    tags(
        (name = "newsdesk", description = "News publishing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of the application's services and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// Object storage for uploaded images.
    pub storage: StorageState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Runs the `AuthUser` extractor ahead of the handler. A missing token is rejected with 401, an
/// invalid or expired one with 403, and the handler never runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_middleware
///
/// Same as `auth_middleware`, plus the `admin` role check. Admin handlers repeat the check.
async fn admin_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    auth_user.require_admin()?;
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles the routing tree, the scoped auth layers and the global observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // Every resource route lives under `/api`; health and docs stay at the root.
    let api_router = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_middleware,
            )),
        );

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health
        // Liveness check for load balancers and docker-compose.
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api_router)
        // Room for a full-size image plus the text fields and multipart framing; the image
        // itself is capped by the upload adapter.
        .layer(DefaultBodyLimit::max(upload::MAX_IMAGE_BYTES + 1024 * 1024))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span carrying method, URI and the `x-request-id` set above, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
