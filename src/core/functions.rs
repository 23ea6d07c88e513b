//! Function-call collaborator.
//!
//! Handlers are registered by name at startup and injected through
//! `AppState`. When upstream finishes streaming a function call's arguments,
//! the relay looks the name up here; unregistered names are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Capability invoked for a named function call.
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    /// `arguments` is the parsed argument object, `{}` when absent or invalid.
    async fn handle(&self, arguments: Value);
}

/// Name to handler map.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    handlers: HashMap<String, Arc<dyn FunctionHandler>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn FunctionHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FunctionHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the named handler on its own task.
    ///
    /// Returns `false` without doing anything when the name is unknown.
    pub fn dispatch(&self, name: &str, raw_arguments: &str) -> bool {
        let Some(handler) = self.get(name) else {
            debug!(function = name, "No handler registered, ignoring function call");
            return false;
        };

        let arguments = parse_arguments(name, raw_arguments);
        let name = name.to_string();
        tokio::spawn(async move {
            debug!(function = %name, "Dispatching function call");
            handler.handle(arguments).await;
        });
        true
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

fn parse_arguments(name: &str, raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(function = name, "Invalid function arguments, using {{}}: {}", e);
            Value::Object(Default::default())
        }
    }
}
