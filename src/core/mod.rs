pub mod functions;
pub mod realtime;
pub mod turn;

pub use functions::{FunctionHandler, FunctionRegistry};
pub use realtime::{OpenAIRealtime, RealtimeConfig, RealtimeError, RealtimeResult};
pub use turn::{ResponseState, TurnController, TurnPhase, TurnPolicy};
