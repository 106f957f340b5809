//! Adaptive bandwidth governor for chunked uploads.
//!
//! The governor keeps a measurement window that is reset at every check.
//! When the bits sent in the window exceed what the ceiling allows for the
//! elapsed time, the caller sleeps for the difference. This corrects bursts
//! after the fact instead of metering tokens, so a single window may overshoot.

use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::metrics;

/// Bits per megabit (decimal, as network rates are quoted).
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Delay needed so that `bytes` sent over `elapsed` stays under `ceiling_mbps`.
///
/// Returns zero when the achieved rate is already at or below the ceiling,
/// or when nothing was sent.
pub fn required_delay(bytes: u64, elapsed: Duration, ceiling_mbps: f64) -> Duration {
    if bytes == 0 || ceiling_mbps <= 0.0 {
        return Duration::ZERO;
    }

    let bits = bytes as f64 * 8.0;
    let elapsed_secs = elapsed.as_secs_f64();
    let ceiling_bps = ceiling_mbps * BITS_PER_MEGABIT;

    if elapsed_secs > 0.0 && bits / elapsed_secs <= ceiling_bps {
        return Duration::ZERO;
    }

    let target_secs = bits / ceiling_bps;
    let delay = target_secs - elapsed_secs;
    if delay > 0.0 {
        Duration::from_secs_f64(delay)
    } else {
        Duration::ZERO
    }
}

/// Windowed rate governor. A no-op when constructed without a ceiling.
#[derive(Debug)]
pub struct RateGovernor {
    ceiling_mbps: Option<f64>,
    window_start: Instant,
    window_bytes: u64,
}

impl RateGovernor {
    /// Create a governor that keeps throughput under `ceiling_mbps`.
    pub fn new(ceiling_mbps: f64) -> Self {
        Self {
            ceiling_mbps: Some(ceiling_mbps),
            window_start: Instant::now(),
            window_bytes: 0,
        }
    }

    /// Create a governor that never delays.
    pub fn disabled() -> Self {
        Self {
            ceiling_mbps: None,
            window_start: Instant::now(),
            window_bytes: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.ceiling_mbps.is_some()
    }

    /// Account for bytes acknowledged by the remote side in the current window.
    pub fn record(&mut self, bytes: u64) {
        self.window_bytes += bytes;
    }

    /// Delay owed for the current window, without resetting it.
    pub fn pending_delay(&self) -> Duration {
        match self.ceiling_mbps {
            Some(ceiling) => {
                required_delay(self.window_bytes, self.window_start.elapsed(), ceiling)
            }
            None => Duration::ZERO,
        }
    }

    /// Sleep for the delay owed by the current window, then start a new window.
    ///
    /// Returns the time slept.
    pub async fn throttle(&mut self) -> Duration {
        let delay = self.pending_delay();
        if !delay.is_zero() {
            debug!(
                window_bytes = self.window_bytes,
                delay_ms = delay.as_millis() as u64,
                "Throttling upload"
            );
            metrics::THROTTLE_DELAY_SECONDS.inc_by(delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
        self.reset_window();
        delay
    }

    fn reset_window(&mut self) {
        self.window_start = Instant::now();
        self.window_bytes = 0;
    }
}
