//! API Routes
//!
//! One Axum router per service. Each is served on its own port.

use axum::{
    routing::{get, post, MethodRouter},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::cache::{fetch_handler, stats_handler, store_handler};
use super::limits::{
    get_limit_handler, get_user_limit_handler, set_limit_handler, set_user_limit_handler,
};
use super::metrics::{
    enter_user_handler, exposition_handler, leave_user_handler, list_users_handler,
    update_metric_handler,
};
use super::AppState;
use crate::models::HealthResponse;

/// Creates the cache service router.
///
/// # Endpoints
/// - `POST /cache` - Store a JSON object
/// - `GET /cache?key=...` - Retrieve an object by key
/// - `GET /cache/stats` - Cache statistics
/// - `GET /health` - Health check endpoint
pub fn cache_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/cache", post(store_handler).get(fetch_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/health", health("cache"));

    finish(routes, state)
}

/// Creates the limits service router.
///
/// # Endpoints
/// - `GET|POST /default_file_limit`
/// - `GET|POST /default_user_limit_size`
/// - `GET|POST /default_folder_limit`
/// - `GET|POST /user_limit/:username`
/// - `GET /health`
pub fn limits_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/:limit", get(get_limit_handler).post(set_limit_handler))
        .route(
            "/user_limit/:username",
            get(get_user_limit_handler).post(set_user_limit_handler),
        )
        .route("/health", health("limits"));

    finish(routes, state)
}

/// Creates the metrics service router.
///
/// # Endpoints
/// - `GET /metrics` - Prometheus text exposition
/// - `POST /metrics/:metric` - Counter increment or gauge step
/// - `GET|POST|DELETE /metrics/active_users` - Active user set
/// - `GET /health`
pub fn metrics_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/metrics", get(exposition_handler))
        .route(
            "/metrics/active_users",
            get(list_users_handler)
                .post(enter_user_handler)
                .delete(leave_user_handler),
        )
        .route("/metrics/:metric", post(update_metric_handler))
        .route("/health", health("metrics"));

    finish(routes, state)
}

fn health(service: &'static str) -> MethodRouter<AppState> {
    get(move || async move { Json(HealthResponse::healthy(service)) })
}

/// Adds CORS and request tracing, then binds the state.
fn finish(routes: Router<AppState>, state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
