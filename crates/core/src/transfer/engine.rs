//! Transfer engine implementation.

use std::future::Future;
use std::io::SeekFrom;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::TransferConfig;
use super::pause::PauseGate;
use super::retry::{RetryDecision, RetryPolicy};
use super::types::{ChunkProgress, ProgressObserver, TransferError, TransferOutcome};
use crate::governor::RateGovernor;
use crate::metrics;
use crate::queue::UploadJob;
use crate::sink::{ChunkOutcome, RemoteSink, SessionHandle, SinkError, UploadMetadata};

/// Streams one job at a time to a remote sink in resumable chunks.
pub struct TransferEngine {
    sink: Arc<dyn RemoteSink>,
    config: TransferConfig,
    retry: RetryPolicy,
}

impl TransferEngine {
    /// Create a new engine for the given sink.
    pub fn new(sink: Arc<dyn RemoteSink>, config: TransferConfig) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self {
            sink,
            config,
            retry,
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn RemoteSink> {
        &self.sink
    }

    fn governor(&self) -> RateGovernor {
        if self.config.throttling_enabled {
            RateGovernor::new(self.config.max_upload_rate_mbps)
        } else {
            RateGovernor::disabled()
        }
    }

    fn metadata(&self, job: &UploadJob) -> UploadMetadata {
        UploadMetadata {
            title: job.title.clone(),
            description: job.description.clone(),
            privacy: self.config.default_privacy.clone(),
            tags: self.config.tags.clone(),
        }
    }

    /// Upload `job` to the sink.
    ///
    /// The pause gate is consulted before every chunk, never during one.
    /// Transient chunk failures are retried in place; the upload never
    /// restarts from byte 0.
    pub async fn transfer(
        &self,
        job: &UploadJob,
        pause: PauseGate,
        observer: &dyn ProgressObserver,
    ) -> Result<TransferOutcome, TransferError> {
        let started = Instant::now();
        let result = self.run(job, pause, observer, started).await;

        let label = if result.is_ok() { "success" } else { "failed" };
        metrics::UPLOAD_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        job: &UploadJob,
        mut pause: PauseGate,
        observer: &dyn ProgressObserver,
        started: Instant,
    ) -> Result<TransferOutcome, TransferError> {
        let source_err = |source| TransferError::Source {
            path: job.source_path.clone(),
            source,
        };

        let mut file = File::open(&job.source_path).await.map_err(source_err)?;
        let total = file.metadata().await.map_err(source_err)?.len();
        if total == 0 {
            return Err(TransferError::EmptySource(job.source_path.clone()));
        }

        let chunk_size = self.config.effective_chunk_size();
        let mut governor = self.governor();
        let metadata = self.metadata(job);
        let sink = self.sink.as_ref();

        let session = self
            .retrying(&job.id, 0, || sink.begin_upload(&metadata, total))
            .await?;

        info!(
            "Uploading '{}' ({} bytes, {} byte chunks, throttled: {})",
            job.title,
            total,
            chunk_size,
            governor.is_enabled()
        );

        let mut buffer = vec![0u8; chunk_size];
        let mut offset = 0u64;
        let mut chunks = 0u32;

        loop {
            if pause.is_paused() {
                info!("Upload of '{}' paused at byte {}", job.title, offset);
                observer.on_pause_changed(&job.id, true).await;
                pause.wait_while_paused().await;
                observer.on_pause_changed(&job.id, false).await;
                info!("Upload of '{}' resumed at byte {}", job.title, offset);
            }

            governor.throttle().await;

            let len = chunk_size.min((total - offset) as usize);
            let chunk = &mut buffer[..len];
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(source_err)?;
            file.read_exact(chunk).await.map_err(source_err)?;
            let chunk: &[u8] = chunk;

            let outcome = self
                .retrying(&job.id, offset, || send_checked(sink, &session, chunk, offset, total))
                .await?;
            chunks += 1;

            match outcome {
                ChunkOutcome::Complete { remote_id } => {
                    let advanced = total - offset;
                    governor.record(advanced);
                    metrics::BYTES_UPLOADED.inc_by(advanced);
                    observer
                        .on_progress(
                            &job.id,
                            ChunkProgress::compute(total, total, started.elapsed()),
                        )
                        .await;

                    info!("Upload of '{}' complete: remote id {}", job.title, remote_id);
                    return Ok(TransferOutcome {
                        remote_id,
                        bytes: total,
                        chunks,
                        elapsed: started.elapsed(),
                    });
                }
                ChunkOutcome::Continue { acknowledged } => {
                    let advanced = acknowledged - offset;
                    governor.record(advanced);
                    metrics::BYTES_UPLOADED.inc_by(advanced);
                    offset = acknowledged;

                    let progress = ChunkProgress::compute(offset, total, started.elapsed());
                    debug!(
                        "[{}] chunk {} acknowledged: {}/{} bytes ({:.2} Mbps)",
                        job.id, chunks, offset, total, progress.speed_mbps
                    );
                    observer.on_progress(&job.id, progress).await;

                    if offset >= total {
                        return Err(TransferError::Incomplete(total));
                    }
                }
            }
        }
    }

    /// Run a sink operation, retrying transient failures with backoff.
    async fn retrying<T, F, Fut>(
        &self,
        job_id: &str,
        offset: u64,
        mut op: F,
    ) -> Result<T, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SinkError>>,
    {
        let mut failed_attempts = 0u32;
        loop {
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            failed_attempts += 1;

            match self.retry.decide(failed_attempts, &error) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        "[{}] attempt {} at offset {} failed ({}), retrying in {:?}",
                        job_id, failed_attempts, offset, error, delay
                    );
                    metrics::CHUNK_RETRIES
                        .with_label_values(&[error.kind()])
                        .inc();
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::NoRetry if error.is_transient() => {
                    return Err(TransferError::RetriesExhausted {
                        offset,
                        attempts: failed_attempts,
                        last_error: error,
                    });
                }
                RetryDecision::NoRetry => return Err(TransferError::Rejected(error)),
            }
        }
    }
}

/// Send a chunk and reject acknowledgements outside the chunk just sent.
async fn send_checked(
    sink: &dyn RemoteSink,
    session: &SessionHandle,
    chunk: &[u8],
    offset: u64,
    total: u64,
) -> Result<ChunkOutcome, SinkError> {
    let outcome = sink.send_chunk(session, chunk, offset, total).await?;
    if let ChunkOutcome::Continue { acknowledged } = outcome {
        if acknowledged <= offset {
            return Err(SinkError::Stalled { offset });
        }
        if acknowledged > offset + chunk.len() as u64 {
            return Err(SinkError::Protocol(format!(
                "acknowledged offset {} beyond chunk end {}",
                acknowledged,
                offset + chunk.len() as u64
            )));
        }
    }
    Ok(outcome)
}
