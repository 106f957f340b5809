//! Status board types.

use serde::{Deserialize, Serialize};

use crate::queue::JobStatus;
use crate::transfer::ChunkProgress;

/// Point-in-time view of the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub total: usize,
    pub completed: usize,
    /// Failed jobs, including cancelled ones.
    pub failed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub paused: bool,
    pub cancel_requested: bool,
    /// A batch has been started and not cleared.
    pub active: bool,
    /// The worker has drained the queue.
    pub complete: bool,
    pub current_upload: Option<CurrentUpload>,
    pub completed_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    pub pending_ids: Vec<String>,
    /// Jobs skipped because of a cancellation. Always a subset of `failed_ids`.
    pub cancelled_ids: Vec<String>,
    /// Finished jobs in completion order.
    pub recent_uploads: Vec<RecentUpload>,
}

impl StatusSnapshot {
    /// Whether a batch is running and not yet drained.
    pub fn is_busy(&self) -> bool {
        self.active && !self.complete
    }

    /// Whether the counters add up.
    pub fn is_consistent(&self) -> bool {
        self.total == self.completed + self.failed + self.in_progress + self.pending
    }
}

/// The job the worker is currently transferring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUpload {
    pub job_id: String,
    pub title: String,
    /// Fraction complete (0.0 - 1.0).
    pub progress: f64,
    pub percent: u8,
    pub speed_mbps: f64,
    pub eta_secs: Option<f64>,
    /// `uploading` or `paused`.
    pub status: JobStatus,
}

impl CurrentUpload {
    pub(crate) fn new(job_id: &str, title: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            title: title.to_string(),
            progress: 0.0,
            percent: 0,
            speed_mbps: 0.0,
            eta_secs: None,
            status: JobStatus::Uploading,
        }
    }

    pub(crate) fn apply(&mut self, progress: &ChunkProgress) {
        self.progress = progress.fraction;
        self.percent = progress.percent();
        self.speed_mbps = progress.speed_mbps;
        self.eta_secs = progress.eta_secs;
    }
}

/// A finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentUpload {
    pub id: String,
    pub title: String,
    pub success: bool,
    pub status: JobStatus,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed { remote_id: String },
    Failed { error: String },
    Cancelled,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed { .. } => JobStatus::Completed,
            JobOutcome::Failed { .. } => JobStatus::Failed,
            JobOutcome::Cancelled => JobStatus::Cancelled,
        }
    }

    /// Label used for metrics.
    pub fn label(&self) -> &'static str {
        self.status().as_str()
    }
}

/// Events published as the batch progresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploadEvent {
    BatchStarted { total: usize },
    JobStarted { job_id: String, title: String },
    Progress { job_id: String, progress: ChunkProgress },
    Paused,
    Resumed,
    JobFinished { job_id: String, outcome: JobOutcome },
    BatchFinished { completed: usize, failed: usize },
}
