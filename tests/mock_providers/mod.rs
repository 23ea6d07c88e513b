//! Mock upstream servers for relay integration tests
//!
//! - `realtime_mock`: scripted OpenAI Realtime WebSocket server

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod realtime_mock;

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by mock servers
#[derive(Debug, Default)]
pub struct MockStats {
    pub connections: AtomicU64,
    pub events_received: AtomicU64,
    pub events_sent: AtomicU64,
    pub closes_received: AtomicU64,
}

impl MockStats {
    pub fn record_connection(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.events_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_close(&self) {
        self.closes_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn closes(&self) -> u64 {
        self.closes_received.load(Ordering::Relaxed)
    }
}

/// PCM16 chunk of `samples` samples, all at `amplitude`
pub fn pcm_chunk(amplitude: i16, samples: usize) -> Vec<u8> {
    std::iter::repeat_n(amplitude, samples)
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

/// 50ms at 16kHz: 800 samples, 1600 bytes
pub fn silent_chunk() -> Vec<u8> {
    pcm_chunk(100, 800)
}

/// 50ms at 16kHz, well above the default amplitude threshold
pub fn voiced_chunk() -> Vec<u8> {
    pcm_chunk(3000, 800)
}
