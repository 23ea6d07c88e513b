use std::sync::Arc;

use tracing::{debug, info};

use super::vad::is_voiced;
use super::{CommitBatch, ResponseState, TurnPhase, TurnPolicy};
use crate::core::realtime::RealtimeResult;
use crate::core::realtime::openai::{ClientEvent, ResponseConfig, UpstreamSender};

/// Manual commit / response / barge-in state machine for one session.
///
/// Owned by the inbound pump; shares only [`ResponseState`] with the
/// outbound side.
pub struct TurnController {
    policy: TurnPolicy,
    response: ResponseConfig,
    state: Arc<ResponseState>,
    upstream: UpstreamSender,
    batch: CommitBatch,
    phase: TurnPhase,
}

impl TurnController {
    /// `response` is attached to every `response.create`.
    pub fn new(
        policy: TurnPolicy,
        response: ResponseConfig,
        state: Arc<ResponseState>,
        upstream: UpstreamSender,
    ) -> Self {
        Self {
            policy,
            response,
            state,
            upstream,
            batch: CommitBatch::default(),
            phase: TurnPhase::Idle,
        }
    }

    /// Current phase. A `Responding` phase whose response has since finished
    /// reads as `Idle`.
    pub fn phase(&self) -> TurnPhase {
        match self.phase {
            TurnPhase::Responding if self.state.is_idle() => TurnPhase::Idle,
            phase => phase,
        }
    }

    pub fn batch(&self) -> CommitBatch {
        self.batch
    }

    pub fn policy(&self) -> &TurnPolicy {
        &self.policy
    }

    /// Handle one inbound PCM16 chunk.
    ///
    /// Only fails when the upstream writer is gone.
    pub async fn on_chunk(&mut self, chunk: &[u8]) -> RealtimeResult<()> {
        if chunk.is_empty() {
            return Ok(());
        }

        if self.batch.is_empty() && self.state.begin_barge_in() {
            info!("User speech during assistant playback, cancelling response");
            self.upstream.send_control(ClientEvent::ResponseCancel).await?;
            self.set_phase(TurnPhase::Cancelling);
        }

        let voiced = is_voiced(chunk, self.policy.amplitude_threshold);

        self.upstream.send_audio(chunk).await?;
        self.batch.push(chunk.len(), voiced);
        if self.phase != TurnPhase::Responding || self.state.is_idle() {
            self.set_phase(TurnPhase::Buffering);
        }

        if self.batch.is_full(&self.policy) {
            self.decide().await?;
        }

        Ok(())
    }

    /// End-of-window decision: commit (and maybe respond) or clear.
    async fn decide(&mut self) -> RealtimeResult<()> {
        let batch = self.batch;
        self.batch.reset();

        if batch.should_commit(&self.policy) {
            self.upstream
                .send_control(ClientEvent::InputAudioBufferCommit)
                .await?;
            self.set_phase(TurnPhase::Committing);
            debug!(
                chunks = batch.chunks,
                bytes = batch.bytes,
                "Committed voiced batch"
            );

            if self.state.try_begin_response() {
                self.upstream
                    .send_control(ClientEvent::ResponseCreate {
                        response: Some(self.response.clone()),
                    })
                    .await?;
                self.set_phase(TurnPhase::Responding);
                debug!("Requested response");
            } else {
                debug!(
                    flags = ?self.state.snapshot(),
                    "Response already in flight, commit only"
                );
            }
        } else {
            self.upstream
                .send_control(ClientEvent::InputAudioBufferClear)
                .await?;
            debug!(
                chunks = batch.chunks,
                bytes = batch.bytes,
                voiced = batch.voiced,
                "Cleared batch"
            );
            if self.phase != TurnPhase::Responding || self.state.is_idle() {
                self.set_phase(TurnPhase::Idle);
            }
        }

        Ok(())
    }

    fn set_phase(&mut self, phase: TurnPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "Turn phase");
            self.phase = phase;
        }
    }
}
