//! Per-stream download throttling.
//!
//! The limiter is an approximate leaky bucket with chunk granularity: after
//! each chunk is written the caller reports the running byte count and the
//! elapsed time; when the observed throughput is above the budget the
//! stream is suspended for `chunk_len / budget` seconds. Overshoot is
//! bounded by one chunk per adjustment.

use std::time::Duration;
use tracing::trace;

/// Bytes-per-second ceiling. Zero disables limiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateBudget(u64);

impl RateBudget {
    pub const UNLIMITED: RateBudget = RateBudget(0);

    pub fn new(bytes_per_sec: u64) -> Self {
        Self(bytes_per_sec)
    }

    pub fn bytes_per_sec(&self) -> u64 {
        self.0
    }

    pub fn is_unlimited(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    budget: RateBudget,
}

impl RateLimiter {
    pub fn new(budget: RateBudget) -> Self {
        Self { budget }
    }

    pub fn unlimited() -> Self {
        Self::new(RateBudget::UNLIMITED)
    }

    pub fn budget(&self) -> RateBudget {
        self.budget
    }

    /// How long to pause after a chunk of `chunk_len` bytes, given the
    /// totals so far. `None` means carry on immediately.
    pub fn delay_for(&self, bytes_written: u64, elapsed: Duration, chunk_len: usize) -> Option<Duration> {
        if self.budget.is_unlimited() || bytes_written == 0 || chunk_len == 0 {
            return None;
        }

        let budget = self.budget.bytes_per_sec();
        let secs = elapsed.as_secs_f64();
        let over_budget = secs <= 0.0 || bytes_written as f64 / secs > budget as f64;
        if !over_budget {
            return None;
        }

        let millis = (chunk_len as u64).saturating_mul(1000) / budget;
        Some(Duration::from_millis(millis.max(1)))
    }

    /// Sleep for [`delay_for`](Self::delay_for), if any.
    pub async fn throttle(&self, bytes_written: u64, elapsed: Duration, chunk_len: usize) {
        if let Some(delay) = self.delay_for(bytes_written, elapsed, chunk_len) {
            trace!(delay_ms = delay.as_millis() as u64, bytes_written, "throttling");
            tokio::time::sleep(delay).await;
        }
    }
}
