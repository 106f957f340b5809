use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Audit event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // Transfers
    UploadCompleted {
        job_id: String,
        title: String,
        source_path: PathBuf,
        remote_id: String,
    },
    UploadFailed {
        job_id: String,
        title: String,
        source_path: PathBuf,
        error: String,
    },

    // Collections
    CollectionCreated {
        collection_id: String,
        title: String,
    },
    CollectionItemAdded {
        job_id: String,
        remote_id: String,
        collection_id: String,
        collection_title: String,
    },
    CollectionItemFailed {
        job_id: String,
        remote_id: String,
        collection: String,
        error: String,
    },

    // Archive
    FileArchived {
        job_id: String,
        source: PathBuf,
        destination: PathBuf,
    },
    ArchiveFailed {
        job_id: String,
        source: PathBuf,
        error: String,
    },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::UploadCompleted { .. } => "upload_completed",
            Self::UploadFailed { .. } => "upload_failed",
            Self::CollectionCreated { .. } => "collection_created",
            Self::CollectionItemAdded { .. } => "collection_item_added",
            Self::CollectionItemFailed { .. } => "collection_item_failed",
            Self::FileArchived { .. } => "file_archived",
            Self::ArchiveFailed { .. } => "archive_failed",
        }
    }

    /// The upload job this event belongs to, if any.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::UploadCompleted { job_id, .. }
            | Self::UploadFailed { job_id, .. }
            | Self::CollectionItemAdded { job_id, .. }
            | Self::CollectionItemFailed { job_id, .. }
            | Self::FileArchived { job_id, .. }
            | Self::ArchiveFailed { job_id, .. } => Some(job_id),
            Self::CollectionCreated { .. } => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub job_id: Option<String>,
    pub data: AuditEvent,
}
