//! Upstream realtime speech service.
//!
//! # Architecture
//!
//! - `base`: error taxonomy, connection config, upstream event type
//! - `openai`: OpenAI Realtime WebSocket client, handshake and wire types
//!
//! # Audio Format
//!
//! PCM 16-bit signed little-endian, passed through without transcoding.

mod base;
pub mod openai;

pub use base::{
    BENIGN_COMMIT_ERROR_CODE, CLOSE_INTERNAL_ERROR, CLOSE_NORMAL,
    MAX_CLOSE_REASON_BYTES, RealtimeConfig, RealtimeError, RealtimeResult, UpstreamEvent,
    truncate_reason,
};
pub use openai::{
    ClientEvent, OPENAI_REALTIME_URL, OpenAIRealtime, OpenAIRealtimeModel, OpenAIRealtimeVoice,
    ServerEvent, SessionConfig, UpstreamCloser, UpstreamCommand, UpstreamReceiver, UpstreamSender,
};
