//! Relay WebSocket handlers
//!
//! ## Client → Server
//!
//! - **Binary frames**: raw PCM 16-bit little-endian audio
//! - Text frames are ignored
//!
//! ## Server → Client
//!
//! - **Binary frames**: raw PCM 16-bit assistant audio
//! - **Close**: 1000 on normal endings, 1011 with a short reason on failures

mod handler;
mod relay;
mod session;

pub use handler::realtime_handler;
pub use relay::{LocalRoute, OutboundDispatcher, classify_upstream_error, inbound_pump, outbound_pump};
pub use session::{PumpExit, RelaySession, SessionState, close_frame_for};
