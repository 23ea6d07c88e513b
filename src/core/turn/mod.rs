//! Manual turn-taking for the relay.
//!
//! The upstream session runs with server VAD reporting but `create_response`
//! disabled, so the relay decides when a user turn ends:
//!
//! - every non-empty chunk is appended to the upstream input buffer
//! - every `batch_chunks` chunks the batch is either committed (voiced and
//!   larger than `min_commit_bytes`) or cleared
//! - a commit is followed by `response.create` only while no response is
//!   in flight and the assistant is silent
//! - the first chunk of a batch cancels an in-flight response if the
//!   assistant is speaking (barge-in)

mod controller;
mod state;
pub mod vad;

use serde::Serialize;

pub use controller::TurnController;
pub use state::{ResponseFlags, ResponseState};

/// Peak amplitude a chunk must exceed to count as voiced.
pub const DEFAULT_AMPLITUDE_THRESHOLD: u32 = 500;

/// Chunks per commit window.
pub const DEFAULT_BATCH_CHUNKS: usize = 20;

/// A voiced batch must exceed this many bytes to be committed.
pub const DEFAULT_MIN_COMMIT_BYTES: usize = 3200;

/// Tunables for batching, VAD and commit decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnPolicy {
    pub amplitude_threshold: u32,
    pub batch_chunks: usize,
    pub min_commit_bytes: usize,
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self {
            amplitude_threshold: DEFAULT_AMPLITUDE_THRESHOLD,
            batch_chunks: DEFAULT_BATCH_CHUNKS,
            min_commit_bytes: DEFAULT_MIN_COMMIT_BYTES,
        }
    }
}

/// Where the controller is in the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No audio buffered, no response outstanding
    #[default]
    Idle,
    /// Chunks appended since the last decision
    Buffering,
    /// Batch committed, no response requested
    Committing,
    /// `response.create` outstanding
    Responding,
    /// `response.cancel` just sent
    Cancelling,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnPhase::Idle => write!(f, "idle"),
            TurnPhase::Buffering => write!(f, "buffering"),
            TurnPhase::Committing => write!(f, "committing"),
            TurnPhase::Responding => write!(f, "responding"),
            TurnPhase::Cancelling => write!(f, "cancelling"),
        }
    }
}

/// Counts for the chunks seen since the last commit decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitBatch {
    pub chunks: usize,
    pub bytes: usize,
    pub voiced: bool,
}

impl CommitBatch {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks == 0
    }

    pub fn push(&mut self, len: usize, voiced: bool) {
        self.chunks += 1;
        self.bytes += len;
        self.voiced |= voiced;
    }

    #[inline]
    pub fn is_full(&self, policy: &TurnPolicy) -> bool {
        self.chunks >= policy.batch_chunks
    }

    /// Voiced and above the byte floor.
    #[inline]
    pub fn should_commit(&self, policy: &TurnPolicy) -> bool {
        self.voiced && self.bytes > policy.min_commit_bytes
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
