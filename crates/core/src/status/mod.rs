//! Shared, pollable upload status.
//!
//! The [`StatusBoard`] is written by the orchestrator worker and read by any
//! number of callers. Every job transition updates all counters under a single
//! lock acquisition, so a snapshot always satisfies
//! `total == completed + failed + in_progress + pending`.

mod board;
mod types;

pub use board::StatusBoard;
pub use types::{CurrentUpload, JobOutcome, RecentUpload, StatusSnapshot, UploadEvent};
