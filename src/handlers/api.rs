use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;

use crate::core::turn::TurnPolicy;
use crate::state::AppState;

/// Service name reported by the health check
pub const SERVICE_NAME: &str = "realtime-audio-relay";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct FeatureFlags {
    pub barge_in: bool,
    pub transcription: bool,
    pub server_vad_events: bool,
    pub function_calls: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub model: String,
    pub voice: String,
    pub mode: &'static str,
    pub turn_policy: TurnPolicy,
    pub features: FeatureFlags,
    pub functions: Vec<String>,
}

/// Health check handler
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// Relay status: model, turn-taking mode and enabled features
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let config = &state.config;
    Json(StatusResponse {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        model: config.openai_model.to_string(),
        voice: config.openai_voice.to_string(),
        mode: "manual_commit",
        turn_policy: config.turn,
        features: FeatureFlags {
            barge_in: true,
            transcription: config.transcription_model.is_some(),
            server_vad_events: true,
            function_calls: !state.functions.is_empty(),
        },
        functions: state.functions.names(),
    })
}
