//! Application State
//!
//! Global state wiring the reconciliation engine, its configuration, and the
//! collaborator handles together for the application shell.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use sceneloom_core::{AgentBackend, ConversationStore};

use crate::models::settings::EngineConfig;
use crate::services::agent_run::{AgentRunEngine, EngineUpdate};
use crate::utils::error::{AppError, AppResult};

/// Application state shared across the shell
pub struct AppState {
    /// The reconciliation engine, built on initialization
    engine: Arc<RwLock<Option<Arc<AgentRunEngine>>>>,
    /// Engine configuration; read at initialization time
    config: Arc<RwLock<EngineConfig>>,
    /// Whether the state has been initialized
    initialized: Arc<RwLock<bool>>,
}

impl AppState {
    /// Create a new uninitialized app state
    pub fn new() -> Self {
        Self {
            engine: Arc::new(RwLock::new(None)),
            config: Arc::new(RwLock::new(EngineConfig::default())),
            initialized: Arc::new(RwLock::new(false)),
        }
    }

    /// Build the engine against the backend and store collaborators.
    ///
    /// Returns the receiving end of the engine's update channel; the caller
    /// owns forwarding updates to the rendering layer. Idempotence: a second
    /// initialization is rejected rather than silently replacing the engine.
    pub async fn initialize(
        &self,
        backend: Arc<dyn AgentBackend>,
        store: Arc<dyn ConversationStore>,
    ) -> AppResult<mpsc::UnboundedReceiver<EngineUpdate>> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Err(AppError::internal("App state already initialized"));
        }

        let config = self.config.read().await.clone();
        let (engine, updates) = AgentRunEngine::new(backend, store, config);
        {
            let mut engine_lock = self.engine.write().await;
            *engine_lock = Some(Arc::new(engine));
        }

        *initialized = true;
        Ok(updates)
    }

    /// The engine handle
    pub async fn engine(&self) -> AppResult<Arc<AgentRunEngine>> {
        self.engine
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::internal("Engine not initialized"))
    }

    /// Whether initialization has run
    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// Current engine configuration
    pub async fn get_config(&self) -> EngineConfig {
        self.config.read().await.clone()
    }

    /// Replace the configuration. Takes effect at the next initialization;
    /// a running engine keeps the config it was built with.
    pub async fn update_config(&self, config: EngineConfig) {
        let mut guard = self.config.write().await;
        *guard = config;
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("initialized", &self.initialized)
            .finish()
    }
}
