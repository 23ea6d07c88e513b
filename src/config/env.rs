//! Environment variable source.
//!
//! Every field is optional here; defaults are applied during the merge.

use super::utils::{env_var, env_var_raw, parse_bool_env, parse_env};

/// Raw values read from the process environment.
#[derive(Debug, Default)]
pub(super) struct EnvConfig {
    pub host: Option<String>,
    pub port: Option<u16>,

    pub openai_api_key: Option<String>,
    pub openai_realtime_url: Option<String>,
    pub openai_model: Option<String>,
    pub openai_voice: Option<String>,

    pub instructions: Option<String>,
    pub temperature: Option<f32>,
    pub transcription_model: Option<String>,
    pub vad_threshold: Option<f32>,
    pub vad_prefix_padding_ms: Option<u32>,
    pub vad_silence_duration_ms: Option<u32>,

    pub amplitude_threshold: Option<u32>,
    pub batch_chunks: Option<usize>,
    pub min_commit_bytes: Option<usize>,

    pub session_created_timeout_ms: Option<u64>,
    pub session_updated_timeout_ms: Option<u64>,
    pub wait_for_session_updated: Option<bool>,

    pub cors_allowed_origins: Option<String>,
}

impl EnvConfig {
    /// Read all recognised variables.
    ///
    /// # Errors
    /// Returns an error if a numeric or boolean variable cannot be parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            host: env_var("HOST"),
            port: parse_env("PORT")?,

            openai_api_key: env_var("OPENAI_API_KEY"),
            openai_realtime_url: env_var("OPENAI_REALTIME_URL"),
            openai_model: env_var("OPENAI_MODEL"),
            openai_voice: env_var("OPENAI_VOICE"),

            instructions: env_var("RELAY_INSTRUCTIONS"),
            temperature: parse_env("RELAY_TEMPERATURE")?,
            transcription_model: env_var_raw("RELAY_TRANSCRIPTION_MODEL"),
            vad_threshold: parse_env("SERVER_VAD_THRESHOLD")?,
            vad_prefix_padding_ms: parse_env("SERVER_VAD_PREFIX_PADDING_MS")?,
            vad_silence_duration_ms: parse_env("SERVER_VAD_SILENCE_DURATION_MS")?,

            amplitude_threshold: parse_env("TURN_AMPLITUDE_THRESHOLD")?,
            batch_chunks: parse_env("TURN_BATCH_CHUNKS")?,
            min_commit_bytes: parse_env("TURN_MIN_COMMIT_BYTES")?,

            session_created_timeout_ms: parse_env("SESSION_CREATED_TIMEOUT_MS")?,
            session_updated_timeout_ms: parse_env("SESSION_UPDATED_TIMEOUT_MS")?,
            wait_for_session_updated: parse_bool_env("WAIT_FOR_SESSION_UPDATED")?,

            cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
        })
    }
}
