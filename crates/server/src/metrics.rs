//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the chunkline server:
//! - HTTP request metrics (latency, counts)
//! - Batch status gauges (collected dynamically)
//! - Core upload metrics registered from `chunkline_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "chunkline_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("chunkline_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "chunkline_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Batch Metrics (collected dynamically)
// =============================================================================

/// Jobs in the current batch by state.
pub static BATCH_JOBS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("chunkline_batch_jobs", "Jobs in the current batch by state"),
        &["state"],
    )
    .unwrap()
});

/// Batch running state (1 = running, 0 = idle).
pub static BATCH_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "chunkline_batch_active",
        "Whether an upload batch is running (1) or idle (0)",
    )
    .unwrap()
});

/// Batch paused state (1 = paused).
pub static BATCH_PAUSED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("chunkline_batch_paused", "Whether the batch is paused (1)").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Batch
    registry.register(Box::new(BATCH_JOBS.clone())).unwrap();
    registry.register(Box::new(BATCH_ACTIVE.clone())).unwrap();
    registry.register(Box::new(BATCH_PAUSED.clone())).unwrap();

    // Core metrics (orchestrator, transfer, governor)
    for metric in chunkline_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the batch gauges reflect the status board.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.orchestrator().status().await;

    BATCH_ACTIVE.set(i64::from(status.is_busy()));
    BATCH_PAUSED.set(i64::from(status.paused));

    for (label, count) in [
        ("pending", status.pending),
        ("in_progress", status.in_progress),
        ("completed", status.completed),
        ("failed", status.failed),
        ("cancelled", status.cancelled_ids.len()),
    ] {
        BATCH_JOBS.with_label_values(&[label]).set(count as i64);
    }
}
