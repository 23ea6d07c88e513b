//! HTTP and WebSocket request handlers
//!
//! - `api` - Health and status endpoints
//! - `realtime` - Audio relay WebSocket

pub mod api;
pub mod realtime;

pub use realtime::realtime_handler;
