//! Per-connection session bookkeeping.

use tracing::{debug, info};
use uuid::Uuid;

use crate::core::realtime::{CLOSE_NORMAL, RealtimeError, truncate_reason};

/// Lifecycle of one relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Local socket accepted, upstream handshake running
    Connecting,
    /// Both pumps running
    Active,
    /// Pumps stopped, close frames being flushed
    Closing,
    /// Everything released
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Connecting => write!(f, "connecting"),
            SessionState::Active => write!(f, "active"),
            SessionState::Closing => write!(f, "closing"),
            SessionState::Closed => write!(f, "closed"),
        }
    }
}

/// How a pump ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    /// Local client sent a close frame or its stream ended
    ClientDisconnected,
    /// Upstream closed its side
    UpstreamClosed,
}

impl PumpExit {
    pub fn close_reason(&self) -> &'static str {
        match self {
            PumpExit::ClientDisconnected => "client disconnected",
            PumpExit::UpstreamClosed => "upstream session closed",
        }
    }
}

/// Close code and reason sent to the local client for a session outcome.
pub fn close_frame_for(outcome: &Result<PumpExit, RealtimeError>) -> (u16, String) {
    match outcome {
        Ok(exit) => (CLOSE_NORMAL, exit.close_reason().to_string()),
        Err(e) => (e.close_code(), truncate_reason(e.close_reason())),
    }
}

/// One local connection and its upstream counterpart.
#[derive(Debug)]
pub struct RelaySession {
    id: Uuid,
    state: SessionState,
    upstream_session_id: Option<String>,
}

impl RelaySession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Connecting,
            upstream_session_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn upstream_session_id(&self) -> Option<&str> {
        self.upstream_session_id.as_deref()
    }

    /// Handshake finished; pumps are about to start.
    pub fn activate(&mut self, upstream_session_id: &str) {
        self.upstream_session_id = Some(upstream_session_id.to_string());
        self.transition(SessionState::Active);
        info!(
            session_id = %self.id,
            upstream_session_id,
            "Relay session active"
        );
    }

    pub fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(session_id = %self.id, from = %self.state, to = %next, "Session state");
            self.state = next;
        }
    }
}

impl Default for RelaySession {
    fn default() -> Self {
        Self::new()
    }
}
