//! Testing utilities and mock implementations.
//!
//! These mocks stand in for the remote platform so the orchestrator and the
//! HTTP binding can be exercised end to end without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use chunkline_core::testing::{fixtures, MockRemoteSink};
//! use chunkline_core::sink::SinkError;
//!
//! let sink = MockRemoteSink::new();
//!
//! // First chunk times out twice, then succeeds
//! sink.fail_chunk_at(0, vec![SinkError::Timeout, SinkError::Timeout]).await;
//!
//! // Use in a TransferEngine...
//! ```

mod mock_remote_sink;
mod recording;

pub use mock_remote_sink::{MockRemoteSink, RecordedChunk, RecordedSession};
pub use recording::{RecordingHook, RecordingObserver};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::queue::UploadRequest;

    /// Write a file of `size` bytes with a repeating byte pattern.
    pub fn write_media_file(dir: &Path, name: &str, size: usize) -> PathBuf {
        let path = dir.join(name);
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, data).expect("failed to write fixture file");
        path
    }

    /// An upload request titled after the file name.
    pub fn upload_request(path: &Path) -> UploadRequest {
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string());
        UploadRequest::new(path, title)
    }

    /// Write `count` files of `size` bytes and return requests for them.
    pub fn upload_batch(dir: &Path, count: usize, size: usize) -> Vec<UploadRequest> {
        (0..count)
            .map(|i| upload_request(&write_media_file(dir, &format!("video-{i}.mp4"), size)))
            .collect()
    }
}
