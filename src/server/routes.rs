//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Usage page, plus an inline JSON search API on the same path
        .route("/", get(handlers::index).post(handlers::search_inline))
        // Form-driven scrape that materializes download artifacts
        .route("/scrape", post(handlers::scrape))
        .route("/download/:filename", get(handlers::download))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
