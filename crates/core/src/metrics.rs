//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (batches, job outcomes)
//! - Transfer engine (bytes, chunk retries, durations)
//! - Rate governor (time spent throttling)

use once_cell::sync::Lazy;
use prometheus::{Counter, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Orchestrator Metrics
// =============================================================================

/// Batches started total.
pub static BATCHES_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("chunkline_batches_started_total", "Total upload batches started").unwrap()
});

/// Upload jobs finished total by result.
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("chunkline_uploads_total", "Total upload jobs by outcome"),
        &["result"], // "completed", "failed", "cancelled"
    )
    .unwrap()
});

/// Post-upload hook failures by hook name.
pub static HOOK_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "chunkline_hook_failures_total",
            "Total post-upload hook failures",
        ),
        &["hook"],
    )
    .unwrap()
});

// =============================================================================
// Transfer Metrics
// =============================================================================

/// Bytes acknowledged by the remote sink.
pub static BYTES_UPLOADED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "chunkline_bytes_uploaded_total",
        "Total bytes acknowledged by the remote sink",
    )
    .unwrap()
});

/// Chunk retry attempts by error kind.
pub static CHUNK_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("chunkline_chunk_retries_total", "Total chunk retry attempts"),
        &["kind"],
    )
    .unwrap()
});

/// Upload duration in seconds.
pub static UPLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("chunkline_upload_duration_seconds", "Duration of uploads").buckets(
            vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0],
        ),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Rate Governor Metrics
// =============================================================================

/// Seconds spent sleeping to honour the throttle ceiling.
pub static THROTTLE_DELAY_SECONDS: Lazy<Counter> = Lazy::new(|| {
    Counter::new(
        "chunkline_throttle_delay_seconds_total",
        "Total time spent throttling uploads",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(BATCHES_STARTED.clone()),
        Box::new(UPLOADS_TOTAL.clone()),
        Box::new(HOOK_FAILURES.clone()),
        // Transfer
        Box::new(BYTES_UPLOADED.clone()),
        Box::new(CHUNK_RETRIES.clone()),
        Box::new(UPLOAD_DURATION.clone()),
        // Governor
        Box::new(THROTTLE_DELAY_SECONDS.clone()),
    ]
}
