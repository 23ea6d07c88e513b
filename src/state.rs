use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::functions::FunctionRegistry;

/// Shared application state.
///
/// Immutable after startup; each relay session reads its upstream settings,
/// turn policy and function handlers from here.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub functions: Arc<FunctionRegistry>,
}

impl AppState {
    /// State with no function handlers registered.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Self::with_functions(config, FunctionRegistry::new())
    }

    pub fn with_functions(config: ServerConfig, functions: FunctionRegistry) -> Arc<Self> {
        Arc::new(Self {
            config,
            functions: Arc::new(functions),
        })
    }
}
