use std::sync::Arc;
use chunkline_core::{AuditStore, Config, SanitizedConfig, UploadOrchestrator};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<UploadOrchestrator>,
    audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<UploadOrchestrator>,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            audit_store,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &UploadOrchestrator {
        self.orchestrator.as_ref()
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }
}
