//! Upload job types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A file the caller wants uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Local file to upload.
    pub source_path: PathBuf,
    /// Title shown on the remote platform.
    pub title: String,
    /// Optional description. Blank descriptions are not sent.
    #[serde(default)]
    pub description: Option<String>,
    /// Collection (playlist) to add the upload to once complete.
    #[serde(default)]
    pub collection: Option<String>,
}

impl UploadRequest {
    pub fn new(source_path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            title: title.into(),
            description: None,
            collection: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}

/// Lifecycle status of a single upload job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, not yet reached by the worker.
    Pending,
    /// Chunks are being sent.
    Uploading,
    /// Started, waiting at a chunk boundary for resume.
    #[serde(rename = "paused")]
    PausedWait,
    /// Remote side confirmed the upload.
    Completed,
    /// Transfer failed.
    Failed,
    /// Skipped before transfer because of a cancellation.
    Cancelled,
}

impl JobStatus {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Uploading => "uploading",
            JobStatus::PausedWait => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// An upload job owned by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    pub id: String,
    pub source_path: PathBuf,
    pub title: String,
    pub description: Option<String>,
    pub collection: Option<String>,
    /// Size at submission time; 0 if the file could not be inspected.
    pub size_bytes: u64,
    pub status: JobStatus,
    pub bytes_transferred: u64,
    /// Set by cancel-by-id while the job is still queued.
    pub cancelled: bool,
}

impl UploadJob {
    pub fn from_request(id: impl Into<String>, request: UploadRequest, size_bytes: u64) -> Self {
        Self {
            id: id.into(),
            source_path: request.source_path,
            title: request.title,
            description: request
                .description
                .filter(|d| !d.trim().is_empty()),
            collection: request.collection,
            size_bytes,
            status: JobStatus::Pending,
            bytes_transferred: 0,
            cancelled: false,
        }
    }
}
