//! Upload orchestrator implementation.
//!
//! Drains a batch sequentially on one background task:
//! - Pause is observed before each job and between chunks
//! - Batch-level and per-job cancellation skip jobs that have not started,
//!   including while the batch is paused between jobs
//! - The in-flight job always runs to a terminal state

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::{emit_to, AuditEvent, AuditHandle};
use crate::hooks::PostUploadHook;
use crate::metrics;
use crate::queue::{QueueStore, UploadJob, UploadRequest};
use crate::status::{JobOutcome, StatusBoard, StatusSnapshot, UploadEvent};
use crate::transfer::{PauseGate, TransferEngine};

use super::config::OrchestratorConfig;
use super::types::{DryRunReport, OrchestratorError, PlannedUpload};

/// The upload orchestrator - runs batches of uploads in the background.
pub struct UploadOrchestrator {
    config: OrchestratorConfig,
    engine: Arc<TransferEngine>,
    hooks: Arc<Vec<Arc<dyn PostUploadHook>>>,
    audit: Option<AuditHandle>,

    // Runtime state
    board: Arc<StatusBoard>,
    queue: Arc<Mutex<QueueStore>>,
}

impl UploadOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        engine: Arc<TransferEngine>,
        hooks: Vec<Arc<dyn PostUploadHook>>,
    ) -> Self {
        let board = Arc::new(StatusBoard::new(config.event_buffer));

        Self {
            config,
            engine,
            hooks: Arc::new(hooks),
            audit: None,
            board,
            queue: Arc::new(Mutex::new(QueueStore::default())),
        }
    }

    /// Set the audit handle for logging upload outcomes
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Inspect each file's size.
    async fn stat(request: &UploadRequest) -> Option<u64> {
        match tokio::fs::metadata(&request.source_path).await {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => {
                debug!("{} is not a regular file", request.source_path.display());
                None
            }
            Err(e) => {
                debug!("Cannot stat {}: {}", request.source_path.display(), e);
                None
            }
        }
    }

    /// Start uploading a batch. Returns the assigned job ids in submission order.
    ///
    /// A batch may start as soon as the previous one reports `complete`.
    pub async fn start(
        &self,
        requests: Vec<UploadRequest>,
    ) -> Result<Vec<String>, OrchestratorError> {
        if requests.is_empty() {
            return Err(OrchestratorError::EmptyBatch);
        }
        if self.board.is_busy().await {
            warn!("Rejected new batch: uploads already in progress");
            return Err(OrchestratorError::AlreadyActive);
        }

        let mut jobs = Vec::with_capacity(requests.len());
        for request in requests {
            // Unreadable files fail at transfer time
            let size = Self::stat(&request).await.unwrap_or(0);
            jobs.push(UploadJob::from_request(Uuid::new_v4().to_string(), request, size));
        }

        // The single point where a batch claims the worker
        if !self.board.begin_batch(&jobs).await {
            warn!("Rejected new batch: uploads already in progress");
            return Err(OrchestratorError::AlreadyActive);
        }

        let ids: Vec<String> = jobs.iter().map(|job| job.id.clone()).collect();
        let total_bytes: u64 = jobs.iter().map(|job| job.size_bytes).sum();
        *self.queue.lock().await = QueueStore::new(jobs);

        metrics::BATCHES_STARTED.inc();
        info!("Starting upload batch: {} files, {} bytes", ids.len(), total_bytes);

        self.spawn_worker();
        Ok(ids)
    }

    /// Report what `start` would do with `requests`.
    ///
    /// Nothing is uploaded, no status changes and no events are published, so
    /// a dry run is allowed while a batch is running.
    pub async fn dry_run(
        &self,
        requests: Vec<UploadRequest>,
    ) -> Result<DryRunReport, OrchestratorError> {
        if requests.is_empty() {
            return Err(OrchestratorError::EmptyBatch);
        }

        let transfer = self.engine.config();
        let chunk_size = transfer.effective_chunk_size().max(1) as u64;

        let mut planned = Vec::with_capacity(requests.len());
        let mut jobs = Vec::with_capacity(requests.len());
        for (i, request) in requests.into_iter().enumerate() {
            let size = Self::stat(&request).await;
            let size_bytes = size.unwrap_or(0);
            planned.push(PlannedUpload {
                title: request.title.clone(),
                source_path: request.source_path.clone(),
                size_bytes,
                readable: size.is_some(),
                chunks: size_bytes.div_ceil(chunk_size),
                collection: request.collection.clone(),
            });
            jobs.push(UploadJob::from_request(format!("dry-run-{}", i + 1), request, size_bytes));
        }

        let mut post_upload = Vec::new();
        let mut warnings = Vec::new();
        for hook in self.hooks.iter() {
            match hook.plan(&jobs).await {
                Ok(Some(plan)) => post_upload.push(plan),
                Ok(None) => {}
                Err(e) => {
                    warn!("Post-upload hook '{}' could not plan: {}", hook.name(), e);
                    warnings.push(format!("{}: {}", hook.name(), e));
                }
            }
        }

        let report = DryRunReport {
            sink: self.engine.sink().name().to_string(),
            privacy: transfer.default_privacy.clone(),
            total_jobs: planned.len(),
            total_bytes: planned.iter().map(|p| p.size_bytes).sum(),
            unreadable: planned.iter().filter(|p| !p.readable).count(),
            jobs: planned,
            post_upload,
            warnings,
        };
        info!(
            "Dry run: {} files, {} bytes, {} unreadable",
            report.total_jobs, report.total_bytes, report.unreadable
        );
        Ok(report)
    }

    /// Spawn the worker task for the current batch.
    fn spawn_worker(&self) {
        let worker = Worker {
            config: self.config.clone(),
            engine: Arc::clone(&self.engine),
            hooks: Arc::clone(&self.hooks),
            audit: self.audit.clone(),
            board: Arc::clone(&self.board),
            queue: Arc::clone(&self.queue),
            gate: self.board.pause_gate(),
        };

        tokio::spawn(worker.run());
    }

    /// Pause at the next job or chunk boundary. Returns false if no batch is running.
    pub async fn pause(&self) -> bool {
        if !self.board.is_busy().await {
            return false;
        }
        if self.board.set_paused(true).await {
            info!("Uploads paused");
        }
        true
    }

    /// Resume a paused batch. Returns false if no batch is running.
    pub async fn resume(&self) -> bool {
        if !self.board.is_busy().await {
            return false;
        }
        if self.board.set_paused(false).await {
            info!("Uploads resumed");
        }
        true
    }

    /// Cancel every job that has not started. The in-flight job finishes.
    ///
    /// Queued jobs drain even while the batch is paused between jobs.
    pub async fn cancel_all(&self) {
        if self.board.request_cancel().await {
            info!("Cancellation requested for remaining uploads");
        }
    }

    /// Cancel every job after the current one.
    ///
    /// Identical to [`cancel_all`](Self::cancel_all): neither interrupts the
    /// job in flight.
    pub async fn cancel_remaining(&self) {
        self.cancel_all().await
    }

    /// Cancel a single queued job. Returns false if the id is not queued.
    pub async fn cancel_by_id(&self, job_id: &str) -> bool {
        let cancelled = self.queue.lock().await.cancel(job_id);
        if cancelled {
            info!("Cancelled queued upload {}", job_id);
        }
        cancelled
    }

    /// Get a snapshot of the current batch.
    pub async fn status(&self) -> StatusSnapshot {
        self.board.snapshot().await
    }

    /// Reset the status to idle. Rejected while a batch is running.
    pub async fn clear_status(&self) -> Result<(), OrchestratorError> {
        if self.board.clear().await {
            Ok(())
        } else {
            Err(OrchestratorError::StillActive)
        }
    }

    /// Subscribe to batch events.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.board.subscribe()
    }

    /// Wait until no batch is running.
    pub async fn wait_idle(&self) {
        self.board.wait_idle().await
    }

    /// Cancel queued jobs, lift any pause and wait for the in-flight job.
    pub async fn shutdown(&self) {
        info!("Shutting down upload orchestrator");
        self.cancel_all().await;
        self.board.set_paused(false).await;
        self.wait_idle().await;
        info!("Upload orchestrator stopped");
    }
}

/// State moved into the background task for one batch.
struct Worker {
    config: OrchestratorConfig,
    engine: Arc<TransferEngine>,
    hooks: Arc<Vec<Arc<dyn PostUploadHook>>>,
    audit: Option<AuditHandle>,
    board: Arc<StatusBoard>,
    queue: Arc<Mutex<QueueStore>>,
    gate: PauseGate,
}

impl Worker {
    async fn run(mut self) {
        info!("Upload worker started");

        loop {
            // A cancel releases a pause between jobs so the queue drains
            if !self.board.is_cancel_requested().await {
                tokio::select! {
                    waited = self.gate.wait_while_paused() => {
                        if waited {
                            debug!("Upload worker resumed");
                        }
                    }
                    _ = self.board.wait_cancel_requested() => {
                        debug!("Cancelled while paused, draining queue");
                    }
                }
            }

            let Some(job) = self.queue.lock().await.pop_next() else {
                break;
            };

            if self.board.is_cancel_requested().await {
                info!("Skipping '{}': batch cancelled", job.title);
                self.skip(&job).await;
                continue;
            }
            if job.cancelled {
                info!("Skipping '{}': cancelled by id", job.title);
                self.skip(&job).await;
                continue;
            }

            self.process(&job).await;
            tokio::time::sleep(self.config.inter_job_delay()).await;
        }

        let (completed, failed) = self.board.finish_batch().await;
        info!(
            "Upload batch finished: {} completed, {} failed",
            completed, failed
        );
    }

    async fn skip(&self, job: &UploadJob) {
        self.board.skip_job(job).await;
        metrics::UPLOADS_TOTAL
            .with_label_values(&[JobOutcome::Cancelled.label()])
            .inc();
    }

    /// Transfer one job and record its terminal state.
    async fn process(&self, job: &UploadJob) {
        self.board.start_job(job).await;
        info!("Uploading {} ('{}')", job.id, job.title);

        let outcome = self.transfer(job).await;
        self.board.finish_job(job, outcome.clone()).await;
        metrics::UPLOADS_TOTAL
            .with_label_values(&[outcome.label()])
            .inc();

        match &outcome {
            JobOutcome::Completed { remote_id } => {
                emit_to(
                    &self.audit,
                    AuditEvent::UploadCompleted {
                        job_id: job.id.clone(),
                        title: job.title.clone(),
                        source_path: job.source_path.clone(),
                        remote_id: remote_id.clone(),
                    },
                )
                .await;
                self.run_hooks(job, remote_id).await;
            }
            JobOutcome::Failed { error } => {
                emit_to(
                    &self.audit,
                    AuditEvent::UploadFailed {
                        job_id: job.id.clone(),
                        title: job.title.clone(),
                        source_path: job.source_path.clone(),
                        error: error.clone(),
                    },
                )
                .await;
            }
            JobOutcome::Cancelled => {}
        }
    }

    /// Run the engine in its own task so a panic fails only this job.
    async fn transfer(&self, job: &UploadJob) -> JobOutcome {
        let engine = Arc::clone(&self.engine);
        let board = Arc::clone(&self.board);
        let gate = self.gate.clone();
        let task_job = job.clone();

        let handle = tokio::spawn(async move {
            engine.transfer(&task_job, gate, board.as_ref()).await
        });

        match handle.await {
            Ok(Ok(outcome)) => {
                info!(
                    "Upload {} complete: remote id {} ({} chunks in {:.1}s)",
                    job.id,
                    outcome.remote_id,
                    outcome.chunks,
                    outcome.elapsed.as_secs_f64()
                );
                JobOutcome::Completed {
                    remote_id: outcome.remote_id,
                }
            }
            Ok(Err(e)) => {
                error!("Upload {} ('{}') failed: {}", job.id, job.title, e);
                JobOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(e) => {
                error!("Upload task for {} panicked: {}", job.id, e);
                JobOutcome::Failed {
                    error: format!("upload task aborted: {}", e),
                }
            }
        }
    }

    async fn run_hooks(&self, job: &UploadJob, remote_id: &str) {
        for hook in self.hooks.iter() {
            if let Err(e) = hook.after_upload(job, remote_id).await {
                warn!("Post-upload hook '{}' failed for {}: {}", hook.name(), job.id, e);
                metrics::HOOK_FAILURES
                    .with_label_values(&[hook.name()])
                    .inc();
            }
        }
    }
}
