use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values given here
/// override the corresponding environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// openai:
///   api_key: "sk-..."
///   realtime_url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-mini-realtime-preview"
///   voice: "alloy"
///
/// session:
///   instructions: "You are a helpful assistant."
///   temperature: 0.8
///   transcription_model: "whisper-1"
///   vad_threshold: 0.5
///   vad_prefix_padding_ms: 300
///   vad_silence_duration_ms: 500
///
/// turn:
///   amplitude_threshold: 500
///   batch_chunks: 20
///   min_commit_bytes: 3200
///
/// handshake:
///   session_created_timeout_ms: 10000
///   session_updated_timeout_ms: 5000
///   wait_for_session_updated: true
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openai: Option<OpenAIYaml>,
    pub session: Option<SessionYaml>,
    pub turn: Option<TurnYaml>,
    pub handshake: Option<HandshakeYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Upstream connection settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenAIYaml {
    pub api_key: Option<String>,
    pub realtime_url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
}

/// Session parameters sent with `session.update`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub instructions: Option<String>,
    pub temperature: Option<f32>,
    /// Empty string disables input transcription
    pub transcription_model: Option<String>,
    pub vad_threshold: Option<f32>,
    pub vad_prefix_padding_ms: Option<u32>,
    pub vad_silence_duration_ms: Option<u32>,
}

/// Manual turn-taking tunables
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TurnYaml {
    pub amplitude_threshold: Option<u32>,
    pub batch_chunks: Option<usize>,
    pub min_commit_bytes: Option<usize>,
}

/// Handshake deadlines
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct HandshakeYaml {
    pub session_created_timeout_ms: Option<u64>,
    pub session_updated_timeout_ms: Option<u64>,
    pub wait_for_session_updated: Option<bool>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
