//! Configuration validation.
//!
//! Run once after env and YAML sources have been merged.

use url::Url;

/// The OpenAI API key must be present and look like a secret key.
pub(super) fn validate_api_key(api_key: &str) -> Result<(), Box<dyn std::error::Error>> {
    if api_key.is_empty() {
        return Err("OPENAI_API_KEY is required".into());
    }
    if !api_key.starts_with("sk-") {
        return Err("OPENAI_API_KEY must start with 'sk-'".into());
    }
    Ok(())
}

/// The realtime endpoint must be a `ws://` or `wss://` URL.
pub(super) fn validate_realtime_url(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid OPENAI_REALTIME_URL '{url}': {e}"))?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        scheme => Err(format!(
            "OPENAI_REALTIME_URL must use ws:// or wss://, got '{scheme}://'"
        )
        .into()),
    }
}

pub(super) fn validate_batch_chunks(batch_chunks: usize) -> Result<(), Box<dyn std::error::Error>> {
    if batch_chunks == 0 {
        return Err("TURN_BATCH_CHUNKS must be greater than 0".into());
    }
    Ok(())
}

pub(super) fn validate_temperature(temperature: f32) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=2.0).contains(&temperature) {
        return Err(format!("RELAY_TEMPERATURE must be between 0.0 and 2.0, got {temperature}").into());
    }
    Ok(())
}
