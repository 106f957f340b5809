//! Types for the upload orchestrator.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::hooks::HookPlan;

/// Errors returned by orchestrator operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// A batch is still running.
    #[error("an upload batch is already in progress")]
    AlreadyActive,

    /// `start` was called with no requests.
    #[error("no uploads requested")]
    EmptyBatch,

    /// Status cannot be cleared while a batch is running.
    #[error("cannot clear status while uploads are in progress")]
    StillActive,
}

/// One file as a dry run sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedUpload {
    pub title: String,
    pub source_path: PathBuf,
    pub size_bytes: u64,
    /// False if the file could not be inspected; a real batch would fail it.
    pub readable: bool,
    pub chunks: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// What a batch would do, produced without uploading anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunReport {
    pub sink: String,
    pub privacy: String,
    pub total_jobs: usize,
    pub total_bytes: u64,
    pub unreadable: usize,
    pub jobs: Vec<PlannedUpload>,
    /// Plans reported by post-upload hooks.
    pub post_upload: Vec<HookPlan>,
    /// Hooks that could not plan, as `name: error`.
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            OrchestratorError::AlreadyActive.to_string(),
            "an upload batch is already in progress"
        );
        assert_eq!(
            OrchestratorError::StillActive.to_string(),
            "cannot clear status while uploads are in progress"
        );
    }
}
