use std::sync::Arc;

use jojo_core::scripting::{ExecutionEngine, RegistryHandle};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Current script registry snapshot, swapped on reload.
    pub registry: Arc<RegistryHandle>,
    /// Runs scripts on behalf of the handlers.
    pub engine: Arc<ExecutionEngine>,
}

impl AppState {
    /// Wire up state for `config` around an already loaded registry.
    pub fn new(config: ServerConfig, registry: RegistryHandle) -> Self {
        let engine = ExecutionEngine::new(config.engine.clone());
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            engine: Arc::new(engine),
        }
    }
}
