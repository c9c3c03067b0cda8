//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Info and health
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Chat
        .route("/api/chat", post(handlers::chat))
        // Search endpoints
        .route("/api/search", post(handlers::search))
        .route("/api/recommendations", post(handlers::recommendations))
        .with_state(state)
}
