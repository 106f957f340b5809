//! Status board implementation.

use async_trait::async_trait;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::debug;

use super::types::{CurrentUpload, JobOutcome, RecentUpload, StatusSnapshot, UploadEvent};
use crate::queue::{JobStatus, UploadJob};
use crate::transfer::{pause_gate, ChunkProgress, PauseControl, PauseGate, ProgressObserver};

/// Shared batch state plus an event stream.
///
/// The pause gate, the idle signal and the cancel signal are only written
/// while the state lock is held, so they never disagree with a snapshot.
pub struct StatusBoard {
    state: RwLock<StatusSnapshot>,
    events: broadcast::Sender<UploadEvent>,
    pause: PauseControl,
    /// True while no batch is busy.
    idle: watch::Sender<bool>,
    cancel: watch::Sender<bool>,
}

impl StatusBoard {
    pub fn new(event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        let (pause, _) = pause_gate();
        let (idle, _) = watch::channel(true);
        let (cancel, _) = watch::channel(false);
        Self {
            state: RwLock::new(StatusSnapshot::default()),
            events,
            pause,
            idle,
            cancel,
        }
    }

    /// A gate that blocks while the batch is paused.
    pub fn pause_gate(&self) -> PauseGate {
        self.pause.gate()
    }

    /// Wait until no batch is busy.
    pub async fn wait_idle(&self) {
        let mut rx = self.idle.subscribe();
        let _ = rx.wait_for(|idle| *idle).await;
    }

    /// Wait until cancellation of the remaining jobs is requested.
    pub async fn wait_cancel_requested(&self) {
        let mut rx = self.cancel.subscribe();
        let _ = rx.wait_for(|cancel| *cancel).await;
    }

    /// Subscribe to batch events.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: UploadEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> StatusSnapshot {
        self.state.read().await.clone()
    }

    /// Whether a batch is running and not yet drained.
    pub async fn is_busy(&self) -> bool {
        self.state.read().await.is_busy()
    }

    /// Whether cancellation of the remaining jobs has been requested.
    pub async fn is_cancel_requested(&self) -> bool {
        self.state.read().await.cancel_requested
    }

    /// Reset the board for a new batch of pending jobs.
    ///
    /// Returns false, leaving the board untouched, if a batch is still busy.
    pub async fn begin_batch(&self, jobs: &[UploadJob]) -> bool {
        let mut state = self.state.write().await;
        if state.is_busy() {
            return false;
        }

        *state = StatusSnapshot {
            total: jobs.len(),
            pending: jobs.len(),
            active: true,
            pending_ids: jobs.iter().map(|j| j.id.clone()).collect(),
            ..Default::default()
        };
        self.pause.resume();
        self.cancel.send_replace(false);
        self.idle.send_replace(false);
        drop(state);

        self.publish(UploadEvent::BatchStarted { total: jobs.len() });
        true
    }

    /// Move a job from pending to in progress and make it current.
    pub async fn start_job(&self, job: &UploadJob) {
        let mut state = self.state.write().await;
        state.pending_ids.retain(|id| id != &job.id);
        state.pending = state.pending.saturating_sub(1);
        state.in_progress += 1;
        let mut current = CurrentUpload::new(&job.id, &job.title);
        if state.paused {
            current.status = JobStatus::PausedWait;
        }
        state.current_upload = Some(current);
        debug_assert!(state.is_consistent());
        drop(state);

        self.publish(UploadEvent::JobStarted {
            job_id: job.id.clone(),
            title: job.title.clone(),
        });
    }

    /// Record the terminal outcome of the current job.
    pub async fn finish_job(&self, job: &UploadJob, outcome: JobOutcome) {
        let mut state = self.state.write().await;
        state.in_progress = state.in_progress.saturating_sub(1);
        if state
            .current_upload
            .as_ref()
            .is_some_and(|c| c.job_id == job.id)
        {
            state.current_upload = None;
        }
        record_terminal(&mut state, job, &outcome);
        debug_assert!(state.is_consistent());
        drop(state);

        self.publish(UploadEvent::JobFinished {
            job_id: job.id.clone(),
            outcome,
        });
    }

    /// Record a job that was cancelled before it started.
    pub async fn skip_job(&self, job: &UploadJob) {
        let mut state = self.state.write().await;
        state.pending_ids.retain(|id| id != &job.id);
        state.pending = state.pending.saturating_sub(1);
        record_terminal(&mut state, job, &JobOutcome::Cancelled);
        debug_assert!(state.is_consistent());
        drop(state);

        self.publish(UploadEvent::JobFinished {
            job_id: job.id.clone(),
            outcome: JobOutcome::Cancelled,
        });
    }

    /// Mark the queue drained. From here on a new batch may begin.
    ///
    /// Returns the final `(completed, failed)` counts.
    pub async fn finish_batch(&self) -> (usize, usize) {
        let mut state = self.state.write().await;
        state.complete = true;
        state.active = false;
        state.cancel_requested = false;
        state.paused = false;
        state.current_upload = None;
        let (completed, failed) = (state.completed, state.failed);
        self.pause.resume();
        self.cancel.send_replace(false);
        // Published under the lock so it precedes the next BatchStarted
        self.publish(UploadEvent::BatchFinished { completed, failed });
        self.idle.send_replace(true);
        drop(state);

        (completed, failed)
    }

    /// Set the batch-level paused flag and the pause gate together.
    ///
    /// Returns false if no batch is busy or the flag already had that value.
    pub async fn set_paused(&self, paused: bool) -> bool {
        let mut state = self.state.write().await;
        if !state.is_busy() || state.paused == paused {
            return false;
        }
        state.paused = paused;
        if paused {
            self.pause.pause();
        } else {
            self.pause.resume();
        }
        drop(state);

        self.publish(if paused {
            UploadEvent::Paused
        } else {
            UploadEvent::Resumed
        });
        true
    }

    /// Set the cancel flag on a busy batch.
    pub async fn request_cancel(&self) -> bool {
        let mut state = self.state.write().await;
        if !state.is_busy() {
            return false;
        }
        state.cancel_requested = true;
        self.cancel.send_replace(true);
        true
    }

    /// Reset to idle. Rejected (returns false) while a batch is busy.
    pub async fn clear(&self) -> bool {
        let mut state = self.state.write().await;
        if state.is_busy() {
            return false;
        }
        *state = StatusSnapshot::default();
        true
    }
}

fn record_terminal(state: &mut StatusSnapshot, job: &UploadJob, outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Completed { .. } => {
            state.completed += 1;
            state.completed_ids.push(job.id.clone());
        }
        JobOutcome::Failed { .. } => {
            state.failed += 1;
            state.failed_ids.push(job.id.clone());
        }
        JobOutcome::Cancelled => {
            state.failed += 1;
            state.failed_ids.push(job.id.clone());
            state.cancelled_ids.push(job.id.clone());
        }
    }

    state.recent_uploads.push(RecentUpload {
        id: job.id.clone(),
        title: job.title.clone(),
        success: outcome.is_success(),
        status: outcome.status(),
    });
}

#[async_trait]
impl ProgressObserver for StatusBoard {
    async fn on_progress(&self, job_id: &str, progress: ChunkProgress) {
        {
            let mut state = self.state.write().await;
            match state.current_upload.as_mut() {
                Some(current) if current.job_id == job_id => current.apply(&progress),
                _ => {
                    debug!("Ignoring progress for job {} that is not current", job_id);
                    return;
                }
            }
        }

        self.publish(UploadEvent::Progress {
            job_id: job_id.to_string(),
            progress,
        });
    }

    async fn on_pause_changed(&self, job_id: &str, paused: bool) {
        let mut state = self.state.write().await;
        if let Some(current) = state.current_upload.as_mut() {
            if current.job_id == job_id {
                current.status = if paused {
                    JobStatus::PausedWait
                } else {
                    JobStatus::Uploading
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::UploadRequest;
    use std::time::Duration;

    fn jobs(n: usize) -> Vec<UploadJob> {
        (0..n)
            .map(|i| {
                UploadJob::from_request(
                    format!("job-{i}"),
                    UploadRequest::new(format!("/videos/{i}.mp4"), format!("Video {i}")),
                    1024,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_begin_batch_resets_counters() {
        let board = StatusBoard::new(16);
        let jobs = jobs(3);
        assert!(board.begin_batch(&jobs).await);

        let snapshot = board.snapshot().await;
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.pending, 3);
        assert_eq!(snapshot.in_progress, 0);
        assert!(snapshot.active);
        assert!(!snapshot.complete);
        assert_eq!(snapshot.pending_ids, vec!["job-0", "job-1", "job-2"]);
    }

    #[tokio::test]
    async fn test_begin_batch_rejected_while_busy() {
        let board = StatusBoard::new(16);
        assert!(board.begin_batch(&jobs(1)).await);
        assert!(!board.begin_batch(&jobs(2)).await);
        assert_eq!(board.snapshot().await.total, 1);
    }

    #[tokio::test]
    async fn test_counters_stay_consistent_through_transitions() {
        let board = StatusBoard::new(16);
        let jobs = jobs(3);
        board.begin_batch(&jobs).await;

        board.start_job(&jobs[0]).await;
        let snapshot = board.snapshot().await;
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.in_progress, 1);
        assert_eq!(
            snapshot.current_upload.as_ref().map(|c| c.job_id.as_str()),
            Some("job-0")
        );

        board
            .finish_job(
                &jobs[0],
                JobOutcome::Completed {
                    remote_id: "r0".into(),
                },
            )
            .await;
        assert!(board.snapshot().await.is_consistent());

        board.skip_job(&jobs[1]).await;
        assert!(board.snapshot().await.is_consistent());

        board.start_job(&jobs[2]).await;
        board
            .finish_job(
                &jobs[2],
                JobOutcome::Failed {
                    error: "boom".into(),
                },
            )
            .await;
        board.finish_batch().await;

        let snapshot = board.snapshot().await;
        assert!(snapshot.is_consistent());
        assert!(snapshot.complete);
        assert!(!snapshot.active);
        assert_eq!(snapshot.completed, 1);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.completed_ids, vec!["job-0"]);
        assert_eq!(snapshot.failed_ids, vec!["job-1", "job-2"]);
        assert_eq!(snapshot.cancelled_ids, vec!["job-1"]);
        assert!(snapshot.pending_ids.is_empty());
        assert!(snapshot.current_upload.is_none());

        let statuses: Vec<JobStatus> = snapshot.recent_uploads.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Completed, JobStatus::Cancelled, JobStatus::Failed]
        );
    }

    #[tokio::test]
    async fn test_progress_updates_current_upload() {
        let board = StatusBoard::new(16);
        let jobs = jobs(1);
        board.begin_batch(&jobs).await;
        board.start_job(&jobs[0]).await;

        let progress = ChunkProgress::compute(512, 1024, Duration::from_secs(1));
        board.on_progress("job-0", progress).await;
        // Progress for a job that is not current is dropped
        board
            .on_progress("job-9", ChunkProgress::compute(1, 2, Duration::from_secs(1)))
            .await;

        let current = board.snapshot().await.current_upload.unwrap();
        assert_eq!(current.percent, 50);
        assert!(current.eta_secs.is_some());
    }

    #[tokio::test]
    async fn test_pause_flags() {
        let board = StatusBoard::new(16);
        // No batch: nothing to pause
        assert!(!board.set_paused(true).await);

        let jobs = jobs(1);
        board.begin_batch(&jobs).await;
        assert!(board.set_paused(true).await);
        assert!(!board.set_paused(true).await);

        board.start_job(&jobs[0]).await;
        board.on_pause_changed("job-0", true).await;
        let current = board.snapshot().await.current_upload.unwrap();
        assert_eq!(current.status, JobStatus::PausedWait);

        assert!(board.set_paused(false).await);
        board.on_pause_changed("job-0", false).await;
        let current = board.snapshot().await.current_upload.unwrap();
        assert_eq!(current.status, JobStatus::Uploading);
    }

    #[tokio::test]
    async fn test_pause_gate_follows_flag() {
        let board = StatusBoard::new(16);
        let gate = board.pause_gate();
        let jobs = jobs(1);
        board.begin_batch(&jobs).await;

        board.set_paused(true).await;
        assert!(gate.is_paused());
        board.set_paused(false).await;
        assert!(!gate.is_paused());

        // Finishing a paused batch reopens the gate for the next one
        board.set_paused(true).await;
        board.skip_job(&jobs[0]).await;
        board.finish_batch().await;
        assert!(!gate.is_paused());
        assert!(!board.snapshot().await.paused);
    }

    #[tokio::test]
    async fn test_idle_signal_flips_with_batch() {
        let board = StatusBoard::new(16);
        tokio::time::timeout(Duration::from_secs(1), board.wait_idle())
            .await
            .expect("fresh board is idle");

        let jobs = jobs(1);
        board.begin_batch(&jobs).await;
        let waiting = tokio::time::timeout(Duration::from_millis(50), board.wait_idle()).await;
        assert!(waiting.is_err());

        board.skip_job(&jobs[0]).await;
        board.finish_batch().await;
        tokio::time::timeout(Duration::from_secs(1), board.wait_idle())
            .await
            .expect("finished board is idle");
        // A new batch can begin as soon as the board reports complete
        assert!(board.snapshot().await.complete);
        assert!(board.begin_batch(&jobs).await);
    }

    #[tokio::test]
    async fn test_cancel_signal_wakes_waiters() {
        let board = std::sync::Arc::new(StatusBoard::new(16));
        board.begin_batch(&jobs(2)).await;

        let waiter = {
            let board = board.clone();
            tokio::spawn(async move { board.wait_cancel_requested().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        assert!(board.request_cancel().await);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancel did not wake the waiter")
            .unwrap();
    }

    #[tokio::test]
    async fn test_clear_rejected_while_busy() {
        let board = StatusBoard::new(16);
        let jobs = jobs(1);
        board.begin_batch(&jobs).await;
        assert!(!board.clear().await);

        board.skip_job(&jobs[0]).await;
        board.finish_batch().await;
        assert!(board.clear().await);
        assert_eq!(board.snapshot().await, StatusSnapshot::default());
    }

    #[tokio::test]
    async fn test_events_published() {
        let board = StatusBoard::new(16);
        let mut events = board.subscribe();
        let jobs = jobs(1);

        board.begin_batch(&jobs).await;
        board.skip_job(&jobs[0]).await;
        board.finish_batch().await;

        assert_eq!(
            events.recv().await.unwrap(),
            UploadEvent::BatchStarted { total: 1 }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            UploadEvent::JobFinished {
                job_id: "job-0".into(),
                outcome: JobOutcome::Cancelled,
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            UploadEvent::BatchFinished {
                completed: 0,
                failed: 1,
            }
        );
    }
}
