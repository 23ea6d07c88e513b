//! OpenAI Realtime API module.
//!
//! Upstream side of the relay: one WebSocket per local session, the
//! `session.created` / `session.update` handshake, and the JSON event types.
//!
//! # Supported Models
//!
//! - `gpt-4o-mini-realtime-preview` - default, lower latency
//! - `gpt-4o-realtime-preview`
//!
//! # Audio Format
//!
//! PCM 16-bit signed little-endian in both directions. Outgoing audio is
//! base64-encoded into `input_audio_buffer.append`; incoming audio arrives as
//! `response.audio.delta` events or raw binary frames.

mod client;
mod config;
mod handshake;
pub mod messages;

pub use client::{
    OpenAIRealtime, UpstreamCloser, UpstreamCommand, UpstreamReceiver, UpstreamSender,
    build_ws_url, decode_control,
};
pub use config::{
    DEFAULT_TRANSCRIPTION_MODEL, OPENAI_BETA_HEADER, OPENAI_REALTIME_URL, OpenAIRealtimeModel,
    OpenAIRealtimeVoice, PCM16_FORMAT,
};
pub use messages::{
    ApiError, ClientEvent, ConversationItem, InputAudioTranscription, ResponseConfig, ServerEvent,
    Session, SessionConfig, TurnDetection,
};
