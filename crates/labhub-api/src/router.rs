//! Route definitions for the LabHub HTTP API.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// Receives the fully-constructed `AppState` and threads it through every
/// route via `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.storage.max_upload_size_bytes as usize;

    let api_routes = Router::new()
        .route(
            "/upload_file",
            get(handlers::upload::upload_form).post(handlers::upload::upload_file),
        )
        .route("/health", get(handlers::health::health));

    Router::new()
        .nest("/api", api_routes)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
