//! Transfer configuration.

use serde::{Deserialize, Serialize};

/// Configuration for chunked transfers (the `[upload]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Enable bandwidth throttling.
    #[serde(default)]
    pub throttling_enabled: bool,

    /// Throughput ceiling in megabits per second (10^6 bits).
    #[serde(default = "default_max_rate")]
    pub max_upload_rate_mbps: f64,

    /// Chunk size when throttling is disabled (bytes).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunk size when throttling is enabled (bytes).
    /// Smaller chunks give the governor finer control.
    #[serde(default = "default_throttled_chunk_size")]
    pub throttled_chunk_size: usize,

    /// Privacy status requested for new uploads.
    #[serde(default = "default_privacy")]
    pub default_privacy: String,

    /// Tags attached to every upload.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Chunk retry behaviour.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_rate() -> f64 {
    10.0
}

fn default_chunk_size() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_throttled_chunk_size() -> usize {
    256 * 1024 // 256 KiB
}

fn default_privacy() -> String {
    "private".to_string()
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            throttling_enabled: false,
            max_upload_rate_mbps: default_max_rate(),
            chunk_size: default_chunk_size(),
            throttled_chunk_size: default_throttled_chunk_size(),
            default_privacy: default_privacy(),
            tags: Vec::new(),
            retry: RetryConfig::default(),
        }
    }
}

impl TransferConfig {
    /// Chunk size in effect for the current throttling setting.
    pub fn effective_chunk_size(&self) -> usize {
        if self.throttling_enabled {
            self.throttled_chunk_size
        } else {
            self.chunk_size
        }
    }
}

/// Retry configuration for a single chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first failed attempt (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    5000 // 5 seconds
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
        }
    }
}
