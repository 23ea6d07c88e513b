//! Configuration module for the realtime relay
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use realtime_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

use crate::core::realtime::RealtimeConfig;
use crate::core::realtime::openai::{
    InputAudioTranscription, OpenAIRealtimeModel, OpenAIRealtimeVoice, PCM16_FORMAT,
    ResponseConfig, SessionConfig, TurnDetection,
};
use crate::core::turn::TurnPolicy;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_SESSION_CREATED_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SESSION_UPDATED_TIMEOUT_MS: u64 = 5_000;

/// Server-side VAD parameters reported upstream.
///
/// Upstream never creates responses on its own; these only shape the
/// `speech_started` / `speech_stopped` events it emits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerVadConfig {
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for ServerVadConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// Upstream handshake deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    pub session_created_timeout: Duration,
    pub session_updated_timeout: Duration,
    pub wait_for_session_updated: bool,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            session_created_timeout: Duration::from_millis(DEFAULT_SESSION_CREATED_TIMEOUT_MS),
            session_updated_timeout: Duration::from_millis(DEFAULT_SESSION_UPDATED_TIMEOUT_MS),
            wait_for_session_updated: true,
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the relay, including:
/// - Server settings (host, port)
/// - Upstream connection (API key, endpoint, model, voice)
/// - Session parameters sent with `session.update`
/// - Manual turn-taking policy
/// - Handshake deadlines
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Upstream connection
    /// OpenAI API key, must start with `sk-`
    pub openai_api_key: String,
    /// Realtime endpoint without the `model` query parameter
    pub openai_realtime_url: String,
    pub openai_model: OpenAIRealtimeModel,
    pub openai_voice: OpenAIRealtimeVoice,

    // Session parameters
    pub instructions: Option<String>,
    pub temperature: f32,
    /// Input transcription model; `None` disables transcription
    pub transcription_model: Option<String>,
    pub server_vad: ServerVadConfig,

    // Turn-taking
    pub turn: TurnPolicy,

    // Handshake
    pub handshake: HandshakeConfig,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Zeroize the API key when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.openai_api_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Note: the .env file is loaded in main.rs at application startup, so its
    /// values are already visible as environment variables here.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let env = env::EnvConfig::load()?;
        let config = merge::merge_config(env, None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let env = env::EnvConfig::load()?;
        let config = merge::merge_config(env, Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_api_key(&self.openai_api_key)?;
        validation::validate_realtime_url(&self.openai_realtime_url)?;
        validation::validate_batch_chunks(self.turn.batch_chunks)?;
        validation::validate_temperature(self.temperature)?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Session configuration sent upstream with `session.update`.
    ///
    /// Server VAD stays on for speech events but `create_response` is off:
    /// the relay decides when to request a response.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: self.instructions.clone(),
            voice: Some(self.openai_voice.as_str().to_string()),
            model: Some(self.openai_model.as_str().to_string()),
            input_audio_format: Some(PCM16_FORMAT.to_string()),
            output_audio_format: Some(PCM16_FORMAT.to_string()),
            input_audio_transcription: self
                .transcription_model
                .as_ref()
                .map(|model| InputAudioTranscription {
                    model: model.clone(),
                }),
            turn_detection: Some(TurnDetection::ServerVad {
                threshold: Some(self.server_vad.threshold),
                prefix_padding_ms: Some(self.server_vad.prefix_padding_ms),
                silence_duration_ms: Some(self.server_vad.silence_duration_ms),
                create_response: Some(false),
                interrupt_response: None,
            }),
            temperature: Some(self.temperature),
        }
    }

    /// Template attached to every `response.create`.
    pub fn response_config(&self) -> ResponseConfig {
        ResponseConfig {
            modalities: Some(vec!["text".to_string(), "audio".to_string()]),
            instructions: self.instructions.clone(),
            voice: Some(self.openai_voice.as_str().to_string()),
            output_audio_format: Some(PCM16_FORMAT.to_string()),
            temperature: Some(self.temperature),
        }
    }

    /// Per-session settings handed to the upstream client.
    pub fn realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            api_key: self.openai_api_key.clone(),
            url: self.openai_realtime_url.clone(),
            model: self.openai_model.as_str().to_string(),
            session: self.session_config(),
            session_created_timeout: self.handshake.session_created_timeout,
            session_updated_timeout: self.handshake.session_updated_timeout,
            wait_for_session_updated: self.handshake.wait_for_session_updated,
        }
    }
}
