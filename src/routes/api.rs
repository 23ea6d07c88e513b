use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// - `GET /health` - liveness probe
/// - `GET /status` - model, turn policy and feature flags
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/status", get(api::status))
        .layer(TraceLayer::new_for_http())
}
