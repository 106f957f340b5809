//! Resumable chunked transfer of a single upload job.
//!
//! The engine opens a session on the remote sink, then streams the file in
//! fixed-size chunks. Between chunks it honours the pause gate and the rate
//! governor; a failed chunk is retried in place with exponential backoff.

mod config;
mod engine;
mod pause;
mod retry;
mod types;

pub use config::{RetryConfig, TransferConfig};
pub use engine::TransferEngine;
pub use pause::{pause_gate, PauseControl, PauseGate};
pub use retry::{RetryDecision, RetryPolicy};
pub use types::{ChunkProgress, NoopObserver, ProgressObserver, TransferError, TransferOutcome};
