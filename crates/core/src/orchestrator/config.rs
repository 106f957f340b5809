//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the upload orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Pause between one job finishing and the next starting (milliseconds).
    #[serde(default = "default_inter_job_delay")]
    pub inter_job_delay_ms: u64,

    /// Capacity of the event broadcast channel.
    /// Slow subscribers skip events once this many are buffered.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_inter_job_delay() -> u64 {
    1000 // 1 second
}

fn default_event_buffer() -> usize {
    256
}

impl OrchestratorConfig {
    pub fn inter_job_delay(&self) -> Duration {
        Duration::from_millis(self.inter_job_delay_ms)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            inter_job_delay_ms: default_inter_job_delay(),
            event_buffer: default_event_buffer(),
        }
    }
}
