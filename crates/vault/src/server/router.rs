//! Axum router construction.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware::HttpLimits, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState, limits: HttpLimits) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/download/:name", get(handlers::download))
        .route("/files", get(handlers::list_files))
        .route("/files/:name", put(handlers::put_file))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(limits.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(CompressionLayer::new())
        .with_state(state)
}
