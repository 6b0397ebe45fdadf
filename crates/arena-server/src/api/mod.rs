//! HTTP API surface.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod config;
mod run;

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/run", post(run::run))
        .route("/api/config", get(config::config))
        .fallback_service(tower_http::services::ServeDir::new("public"))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
