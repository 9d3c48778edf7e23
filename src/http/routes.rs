use super::handlers;
use super::state::AppState;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let stream_path = state.config.webhook.stream_path.clone();

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Banner and voice webhook
        .route("/", get(handlers::index).post(handlers::call_webhook))
        // Carrier media stream
        .route(&stream_path, get(handlers::media_stream))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
