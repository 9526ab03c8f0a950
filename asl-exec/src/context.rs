use std::sync::Arc;

use asl_core::EngineConfig;
use uuid::Uuid;

use crate::task::{BackendRegistry, CallbackChannel};

/// Per-execution collaborators shared read-only by every frame of the
/// execution, Map branches included.
pub struct ExecutionContext {
    pub execution_id: Uuid,
    pub config: EngineConfig,
    pub backends: Arc<dyn BackendRegistry>,
    pub callbacks: Arc<dyn CallbackChannel>,
}

impl ExecutionContext {
    pub fn new(
        config: EngineConfig,
        backends: Arc<dyn BackendRegistry>,
        callbacks: Arc<dyn CallbackChannel>,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            config,
            backends,
            callbacks,
        }
    }

    pub fn with_execution_id(mut self, execution_id: Uuid) -> Self {
        self.execution_id = execution_id;
        self
    }
}
