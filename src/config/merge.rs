//! Merge environment values, YAML overrides and defaults into a
//! [`ServerConfig`]. Priority: YAML > ENV > defaults.

use std::time::Duration;

use super::env::EnvConfig;
use super::yaml::YamlConfig;
use super::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SESSION_CREATED_TIMEOUT_MS,
    DEFAULT_SESSION_UPDATED_TIMEOUT_MS, DEFAULT_TEMPERATURE, HandshakeConfig, ServerConfig,
    ServerVadConfig,
};
use crate::core::realtime::openai::{
    DEFAULT_TRANSCRIPTION_MODEL, OPENAI_REALTIME_URL, OpenAIRealtimeModel, OpenAIRealtimeVoice,
};
use crate::core::turn::TurnPolicy;

pub(super) fn merge_config(
    env: EnvConfig,
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let openai = yaml.openai.unwrap_or_default();
    let session = yaml.session.unwrap_or_default();
    let turn = yaml.turn.unwrap_or_default();
    let handshake = yaml.handshake.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();

    let vad_defaults = ServerVadConfig::default();
    let turn_defaults = TurnPolicy::default();

    let model = openai
        .model
        .or(env.openai_model)
        .map(|m| OpenAIRealtimeModel::from_str_or_default(&m))
        .unwrap_or_default();
    let voice = openai
        .voice
        .or(env.openai_voice)
        .map(|v| OpenAIRealtimeVoice::from_str_or_default(&v))
        .unwrap_or_default();

    // An explicitly empty transcription model turns transcription off.
    let transcription_model = match session.transcription_model.or(env.transcription_model) {
        Some(model) if model.trim().is_empty() => None,
        Some(model) => Some(model),
        None => Some(DEFAULT_TRANSCRIPTION_MODEL.to_string()),
    };

    Ok(ServerConfig {
        host: server
            .host
            .or(env.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),

        openai_api_key: openai.api_key.or(env.openai_api_key).unwrap_or_default(),
        openai_realtime_url: openai
            .realtime_url
            .or(env.openai_realtime_url)
            .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        openai_model: model,
        openai_voice: voice,

        instructions: session.instructions.or(env.instructions),
        temperature: session
            .temperature
            .or(env.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE),
        transcription_model,
        server_vad: ServerVadConfig {
            threshold: session
                .vad_threshold
                .or(env.vad_threshold)
                .unwrap_or(vad_defaults.threshold),
            prefix_padding_ms: session
                .vad_prefix_padding_ms
                .or(env.vad_prefix_padding_ms)
                .unwrap_or(vad_defaults.prefix_padding_ms),
            silence_duration_ms: session
                .vad_silence_duration_ms
                .or(env.vad_silence_duration_ms)
                .unwrap_or(vad_defaults.silence_duration_ms),
        },

        turn: TurnPolicy {
            amplitude_threshold: turn
                .amplitude_threshold
                .or(env.amplitude_threshold)
                .unwrap_or(turn_defaults.amplitude_threshold),
            batch_chunks: turn
                .batch_chunks
                .or(env.batch_chunks)
                .unwrap_or(turn_defaults.batch_chunks),
            min_commit_bytes: turn
                .min_commit_bytes
                .or(env.min_commit_bytes)
                .unwrap_or(turn_defaults.min_commit_bytes),
        },

        handshake: HandshakeConfig {
            session_created_timeout: Duration::from_millis(
                handshake
                    .session_created_timeout_ms
                    .or(env.session_created_timeout_ms)
                    .unwrap_or(DEFAULT_SESSION_CREATED_TIMEOUT_MS),
            ),
            session_updated_timeout: Duration::from_millis(
                handshake
                    .session_updated_timeout_ms
                    .or(env.session_updated_timeout_ms)
                    .unwrap_or(DEFAULT_SESSION_UPDATED_TIMEOUT_MS),
            ),
            wait_for_session_updated: handshake
                .wait_for_session_updated
                .or(env.wait_for_session_updated)
                .unwrap_or(true),
        },

        cors_allowed_origins: security.cors_allowed_origins.or(env.cors_allowed_origins),
    })
}
