//! Upload orchestrator.
//!
//! A single background worker drains the queue one job at a time:
//! - **Transfer**: each job runs through the [`TransferEngine`](crate::transfer::TransferEngine)
//!   in its own task, so a panic becomes a failed job
//! - **Control**: pause, resume and cancellation are cooperative and only
//!   take effect between jobs or between chunks
//! - **Status**: every transition goes through the [`StatusBoard`](crate::status::StatusBoard)
//! - **Dry run**: [`UploadOrchestrator::dry_run`] inspects a batch without
//!   touching the status or the sink

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::UploadOrchestrator;
pub use types::{DryRunReport, OrchestratorError, PlannedUpload};
