//! Recording hook and observer for assertions.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::hooks::{HookError, PostUploadHook};
use crate::queue::UploadJob;
use crate::transfer::{ChunkProgress, ProgressObserver};

/// Post-upload hook that records each call.
#[derive(Debug, Default)]
pub struct RecordingHook {
    calls: Arc<RwLock<Vec<(String, String)>>>,
    fail: bool,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hook that records the call and then fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(job_id, remote_id)` pairs in call order.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl PostUploadHook for RecordingHook {
    fn name(&self) -> &str {
        "recording"
    }

    async fn after_upload(&self, job: &UploadJob, remote_id: &str) -> Result<(), HookError> {
        self.calls
            .write()
            .await
            .push((job.id.clone(), remote_id.to_string()));
        if self.fail {
            return Err(HookError::NoFileName(job.source_path.clone()));
        }
        Ok(())
    }
}

/// Progress observer that records everything it sees.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    progress: RwLock<Vec<ChunkProgress>>,
    pause_changes: RwLock<Vec<bool>>,
}

impl RecordingObserver {
    pub async fn progress(&self) -> Vec<ChunkProgress> {
        self.progress.read().await.clone()
    }

    pub async fn pause_changes(&self) -> Vec<bool> {
        self.pause_changes.read().await.clone()
    }
}

#[async_trait]
impl ProgressObserver for RecordingObserver {
    async fn on_progress(&self, _job_id: &str, progress: ChunkProgress) {
        self.progress.write().await.push(progress);
    }

    async fn on_pause_changed(&self, _job_id: &str, paused: bool) {
        self.pause_changes.write().await.push(paused);
    }
}
