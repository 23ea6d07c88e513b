//! Response flags shared between the inbound and outbound pumps.
//!
//! Both flags live in one `AtomicU8` so every transition, including the
//! check-and-set that gates `response.create`, is a single atomic operation.
//! A third bit records a barge-in until the outbound side retires the
//! cancelled response.

use std::sync::atomic::{AtomicU8, Ordering};

const SPEAKING: u8 = 0b01;
const IN_PROGRESS: u8 = 0b10;
const CANCELLED: u8 = 0b100;
const FLAGS: u8 = SPEAKING | IN_PROGRESS;

/// Point-in-time copy of the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseFlags {
    /// Assistant audio is currently being forwarded to the client
    pub assistant_speaking: bool,
    /// A `response.create` is outstanding
    pub response_in_progress: bool,
}

/// Lock-free `assistant_speaking` / `response_in_progress` pair.
#[derive(Debug, Default)]
pub struct ResponseState {
    flags: AtomicU8,
}

impl ResponseState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_speaking(&self) -> bool {
        self.flags.load(Ordering::Acquire) & SPEAKING != 0
    }

    #[inline]
    pub fn is_in_progress(&self) -> bool {
        self.flags.load(Ordering::Acquire) & IN_PROGRESS != 0
    }

    /// Both flags clear.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.flags.load(Ordering::Acquire) & FLAGS == 0
    }

    /// A barge-in cancelled a response the outbound side has not retired yet.
    #[inline]
    pub fn is_cancel_pending(&self) -> bool {
        self.flags.load(Ordering::Acquire) & CANCELLED != 0
    }

    pub fn snapshot(&self) -> ResponseFlags {
        let bits = self.flags.load(Ordering::Acquire);
        ResponseFlags {
            assistant_speaking: bits & SPEAKING != 0,
            response_in_progress: bits & IN_PROGRESS != 0,
        }
    }

    /// Set `response_in_progress` only if both flags are clear.
    ///
    /// Returns `true` if the caller now owns the response request.
    pub fn try_begin_response(&self) -> bool {
        self.flags
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (bits & FLAGS == 0).then_some(bits | IN_PROGRESS)
            })
            .is_ok()
    }

    /// Set `assistant_speaking`. Returns `true` if it was previously unset.
    pub fn mark_speaking(&self) -> bool {
        self.flags.fetch_or(SPEAKING, Ordering::AcqRel) & SPEAKING == 0
    }

    /// Clear both flags. Returns `true` if any flag was set.
    ///
    /// A pending cancellation is left for [`take_cancelled`](Self::take_cancelled).
    pub fn clear(&self) -> bool {
        self.flags.fetch_and(!FLAGS, Ordering::AcqRel) & FLAGS != 0
    }

    /// Clear both flags and record a cancellation if the assistant is speaking.
    ///
    /// Returns `true` if the caller should emit `response.cancel`; a second
    /// caller racing on the same transition gets `false`.
    pub fn begin_barge_in(&self) -> bool {
        self.flags
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (bits & SPEAKING != 0).then_some(CANCELLED)
            })
            .is_ok()
    }

    /// Retire a pending cancellation. Returns `true` if one was pending.
    ///
    /// Also drops a `SPEAKING` bit set by audio of the cancelled response
    /// that raced the barge-in; `IN_PROGRESS` belongs to the next request
    /// and is kept.
    pub fn take_cancelled(&self) -> bool {
        self.flags
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                (bits & CANCELLED != 0).then_some(bits & !(CANCELLED | SPEAKING))
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_begin_response_requires_idle() {
        let state = ResponseState::new();
        assert!(state.try_begin_response());
        assert!(state.is_in_progress());
        assert!(!state.try_begin_response());

        state.clear();
        state.mark_speaking();
        assert!(!state.try_begin_response());
        assert!(!state.is_in_progress());
    }

    #[test]
    fn test_mark_speaking_reports_transition() {
        let state = ResponseState::new();
        assert!(state.mark_speaking());
        assert!(!state.mark_speaking());
        assert!(state.is_speaking());
    }

    #[test]
    fn test_clear_on_idle_is_noop() {
        let state = ResponseState::new();
        assert!(!state.clear());
        assert!(state.is_idle());
    }

    #[test]
    fn test_barge_in_clears_both_flags_once() {
        let state = ResponseState::new();
        assert!(!state.begin_barge_in());

        assert!(state.try_begin_response());
        state.mark_speaking();
        assert_eq!(
            state.snapshot(),
            ResponseFlags {
                assistant_speaking: true,
                response_in_progress: true
            }
        );

        assert!(state.begin_barge_in());
        assert!(state.is_idle());
        assert!(!state.begin_barge_in());
    }

    #[test]
    fn test_cancellation_survives_next_response_until_taken() {
        let state = ResponseState::new();
        assert!(state.try_begin_response());
        state.mark_speaking();
        assert!(state.begin_barge_in());
        assert!(state.is_cancel_pending());

        // The next request is allowed while the cancellation is pending.
        assert!(state.try_begin_response());
        // Late audio of the cancelled response races the retirement.
        state.mark_speaking();

        assert!(state.take_cancelled());
        assert!(!state.is_cancel_pending());
        assert!(!state.is_speaking());
        assert!(state.is_in_progress());
        assert!(!state.take_cancelled());
    }

    #[test]
    fn test_clear_keeps_pending_cancellation() {
        let state = ResponseState::new();
        assert!(state.try_begin_response());
        state.mark_speaking();
        assert!(state.begin_barge_in());
        assert!(state.try_begin_response());

        assert!(state.clear());
        assert!(state.is_idle());
        assert!(state.is_cancel_pending());
    }

    #[test]
    fn test_concurrent_begin_response_single_winner() {
        let state = Arc::new(ResponseState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.try_begin_response())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
