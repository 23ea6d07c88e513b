//! Relay WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::realtime::realtime_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /ws/audio` - WebSocket upgrade for the audio relay
///
/// # Protocol
///
/// The client streams raw PCM16 as binary frames and receives assistant
/// audio as binary frames. The relay decides turn boundaries itself; the
/// client never sends control messages.
pub fn create_realtime_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/audio", get(realtime_handler))
        .layer(TraceLayer::new_for_http())
}
