pub mod audit;
pub mod config;
pub mod governor;
pub mod hooks;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod sink;
pub mod status;
pub mod testing;
pub mod transfer;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig,
};
pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditRecord,
    AuditStore, AuditWriter, MemoryAuditStore,
};
pub use governor::RateGovernor;
pub use hooks::{
    ArchiveConfig, ArchiveHook, CollectionConfig, CollectionHook, HookError, HookPlan,
    PostUploadHook,
};
pub use orchestrator::{
    DryRunReport, OrchestratorConfig, OrchestratorError, PlannedUpload, UploadOrchestrator,
};
pub use queue::{JobStatus, UploadJob, UploadRequest};
pub use sink::{CollectionInfo, HttpResumableSink, HttpSinkConfig, RemoteSink, SinkError};
pub use status::{StatusBoard, StatusSnapshot, UploadEvent};
pub use transfer::{TransferConfig, TransferEngine, TransferError};
