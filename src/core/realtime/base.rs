//! Base types shared by the upstream realtime client and the relay.
//!
//! This module defines the error taxonomy for a relay session, the
//! connection-level configuration handed to the upstream client, and the
//! event type the upstream receiver yields.
//!
//! # Audio Format
//!
//! Audio is PCM 16-bit signed little-endian and is passed through untouched.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use super::openai::messages::{ServerEvent, SessionConfig};

/// Maximum close reason length allowed by the WebSocket protocol (125 bytes
/// of control payload minus the two byte status code).
pub const MAX_CLOSE_REASON_BYTES: usize = 123;

/// Normal closure status code.
pub const CLOSE_NORMAL: u16 = 1000;

/// Internal server error status code.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Upstream error code reported when committing an empty input buffer.
pub const BENIGN_COMMIT_ERROR_CODE: &str = "input_audio_buffer_commit_empty";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during a relay session.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// `session.created` was not received in time
    #[error("Handshake timed out: {0}")]
    HandshakeTimeout(String),

    /// The upstream WebSocket could not be opened
    #[error("Upstream connection failed: {message}")]
    UpstreamConnect {
        /// HTTP status of a rejected upgrade, when available
        status: Option<u16>,
        /// Transport error message
        message: String,
    },

    /// A text frame from upstream could not be decoded
    #[error("Malformed control event: {0}")]
    MalformedControlEvent(String),

    /// Upstream refused to commit an empty buffer
    #[error("Empty input buffer commit rejected by upstream")]
    BenignCommit,

    /// Upstream reported an error event
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// Upstream transport failed mid-session
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// The upstream writer is gone
    #[error("Upstream connection closed")]
    ConnectionClosed,

    /// The local client went away
    #[error("Local client disconnected")]
    LocalDisconnect,

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

impl RealtimeError {
    /// Whether this error ends the session.
    ///
    /// `UpstreamProtocol` is only fatal while the handshake is still running;
    /// the supervisor decides that by phase, so here it reports non-fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::HandshakeTimeout(_)
            | Self::UpstreamConnect { .. }
            | Self::WebSocketError(_)
            | Self::ConnectionClosed
            | Self::Internal(_) => true,
            Self::MalformedControlEvent(_)
            | Self::BenignCommit
            | Self::UpstreamProtocol(_)
            | Self::LocalDisconnect => false,
        }
    }

    /// WebSocket status code used when this error closes the local connection.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::LocalDisconnect => CLOSE_NORMAL,
            _ => CLOSE_INTERNAL_ERROR,
        }
    }

    /// Close reason shown to the local client.
    pub fn close_reason(&self) -> String {
        let reason = match self {
            Self::HandshakeTimeout(_) => "handshake timeout".to_string(),
            Self::UpstreamConnect {
                status: Some(status),
                ..
            } => format!("upstream connect failed (HTTP {status})"),
            Self::UpstreamConnect { status: None, .. } => "upstream connect failed".to_string(),
            Self::UpstreamProtocol(message) => format!("upstream protocol error: {message}"),
            Self::WebSocketError(_) | Self::ConnectionClosed => {
                "upstream connection lost".to_string()
            }
            Self::LocalDisconnect => "client disconnected".to_string(),
            Self::MalformedControlEvent(_) | Self::BenignCommit | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        };
        truncate_reason(reason)
    }
}

/// Truncate a close reason to the protocol limit on a char boundary.
pub fn truncate_reason(mut reason: String) -> String {
    if reason.len() > MAX_CLOSE_REASON_BYTES {
        let mut end = MAX_CLOSE_REASON_BYTES;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        reason.truncate(end);
    }
    reason
}

// =============================================================================
// Configuration Types
// =============================================================================

/// Connection and handshake settings for one upstream session.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base endpoint, without the `model` query parameter
    pub url: String,

    /// Model to use (e.g., "gpt-4o-mini-realtime-preview")
    pub model: String,

    /// Session configuration sent with `session.update`
    pub session: SessionConfig,

    /// Deadline for `session.created`
    pub session_created_timeout: Duration,

    /// Deadline for `session.updated`
    pub session_updated_timeout: Duration,

    /// Whether to wait for `session.updated` at all
    pub wait_for_session_updated: bool,
}

// =============================================================================
// Upstream Events
// =============================================================================

/// One item received from upstream.
#[derive(Debug, Clone)]
pub enum UpstreamEvent {
    /// Raw PCM16 carried in a binary frame
    Audio(Bytes),
    /// Decoded JSON control event
    Control(ServerEvent),
}
