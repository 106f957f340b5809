//! Types for the transfer engine.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sink::SinkError;

/// Errors that end a job's transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source file could not be opened or read.
    #[error("cannot read source file {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source file has no bytes to upload.
    #[error("source file is empty: {0}")]
    EmptySource(PathBuf),

    /// A chunk kept failing with transient errors until the retry budget ran out.
    #[error("chunk at offset {offset} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        offset: u64,
        attempts: u32,
        last_error: SinkError,
    },

    /// The remote sink refused the upload (auth, quota, malformed input).
    #[error("upload rejected by remote sink: {0}")]
    Rejected(SinkError),

    /// All bytes were acknowledged but the sink never reported completion.
    #[error("remote sink acknowledged all {0} bytes without completing the upload")]
    Incomplete(u64),
}

impl TransferError {
    /// The sink error behind this failure, if any.
    pub fn sink_error(&self) -> Option<&SinkError> {
        match self {
            TransferError::RetriesExhausted { last_error, .. } => Some(last_error),
            TransferError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

/// A successful transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Identifier assigned by the remote sink.
    pub remote_id: String,
    /// Bytes uploaded.
    pub bytes: u64,
    /// Chunks acknowledged.
    pub chunks: u32,
    /// Wall time from session start to completion.
    pub elapsed: Duration,
}

/// Progress after an acknowledged chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkProgress {
    /// Fraction complete (0.0 - 1.0).
    pub fraction: f64,
    pub total_bytes: u64,
    pub bytes_uploaded: u64,
    /// Average speed since the upload started, in megabits per second.
    pub speed_mbps: f64,
    /// Estimated seconds remaining; `None` until a speed is known.
    pub eta_secs: Option<f64>,
}

impl ChunkProgress {
    /// Compute progress from totals and the time since the upload started.
    ///
    /// Speed is averaged over the whole upload rather than the last chunk to
    /// smooth out jitter.
    pub fn compute(bytes_uploaded: u64, total_bytes: u64, elapsed: Duration) -> Self {
        let fraction = if total_bytes == 0 {
            1.0
        } else {
            (bytes_uploaded as f64 / total_bytes as f64).min(1.0)
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let speed_bps = if elapsed_secs > 0.0 {
            bytes_uploaded as f64 / elapsed_secs
        } else {
            0.0
        };
        let remaining = total_bytes.saturating_sub(bytes_uploaded) as f64;
        let eta_secs = (speed_bps > 0.0).then(|| remaining / speed_bps);

        Self {
            fraction,
            total_bytes,
            bytes_uploaded,
            speed_mbps: speed_bps * 8.0 / 1_000_000.0,
            eta_secs,
        }
    }

    /// Whole percent complete.
    pub fn percent(&self) -> u8 {
        (self.fraction * 100.0).floor().clamp(0.0, 100.0) as u8
    }
}

/// Receives progress from the transfer engine.
#[async_trait]
pub trait ProgressObserver: Send + Sync {
    /// Called after every acknowledged chunk.
    async fn on_progress(&self, job_id: &str, progress: ChunkProgress);

    /// Called when the engine starts or stops waiting at a paused chunk boundary.
    async fn on_pause_changed(&self, _job_id: &str, _paused: bool) {}
}

/// Observer that ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl ProgressObserver for NoopObserver {
    async fn on_progress(&self, _job_id: &str, _progress: ChunkProgress) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_compute() {
        // 2 MB of 8 MB in 2 s: 1 MB/s = 8 Mbps, 6 s left
        let progress = ChunkProgress::compute(2_000_000, 8_000_000, Duration::from_secs(2));
        assert_eq!(progress.fraction, 0.25);
        assert_eq!(progress.percent(), 25);
        assert!((progress.speed_mbps - 8.0).abs() < 1e-9);
        assert!((progress.eta_secs.unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_without_elapsed_time_has_no_eta() {
        let progress = ChunkProgress::compute(100, 1000, Duration::ZERO);
        assert_eq!(progress.speed_mbps, 0.0);
        assert!(progress.eta_secs.is_none());
    }

    #[test]
    fn test_progress_complete() {
        let progress = ChunkProgress::compute(1000, 1000, Duration::from_millis(10));
        assert_eq!(progress.percent(), 100);
        assert_eq!(progress.eta_secs, Some(0.0));
    }

    #[test]
    fn test_error_display() {
        let err = TransferError::RetriesExhausted {
            offset: 262_144,
            attempts: 4,
            last_error: SinkError::Timeout,
        };
        assert_eq!(
            err.to_string(),
            "chunk at offset 262144 failed after 4 attempts: Request timeout"
        );
        assert_eq!(err.sink_error(), Some(&SinkError::Timeout));
    }
}
