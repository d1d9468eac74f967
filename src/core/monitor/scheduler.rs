//! Poll cycle timing
//!
//! Pure timing decisions, kept apart from the I/O loop so pacing, jitter and
//! overrun handling can be tested without sleeping.

use crate::config::MonitorConfig;
use rand::Rng;
use std::time::Duration;

/// Shortest pause between two cycles, even when a cycle overran
pub const MIN_CYCLE_SLEEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleScheduler {
    cycle: Duration,
    pacing: Duration,
    jitter_ms: u64,
    error_backoff: Duration,
}

impl CycleScheduler {
    pub fn new(cycle: Duration, pacing: Duration, jitter_ms: u64, error_backoff: Duration) -> Self {
        Self {
            cycle,
            pacing,
            jitter_ms,
            error_backoff,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            Duration::from_secs(config.cycle_seconds),
            Duration::from_millis(config.pacing_ms),
            config.jitter_ms,
            Duration::from_secs(config.error_backoff_seconds),
        )
    }

    /// Sleep that completes the cycle, never below [`MIN_CYCLE_SLEEP`]
    pub fn remaining_sleep(&self, elapsed: Duration) -> Duration {
        self.cycle.saturating_sub(elapsed).max(MIN_CYCLE_SLEEP)
    }

    /// Pause between two subscriptions
    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay_with(&mut rand::thread_rng())
    }

    pub fn pacing_delay_with<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.jitter_ms == 0 {
            return self.pacing;
        }
        self.pacing + Duration::from_millis(rng.gen_range(0..=self.jitter_ms))
    }

    /// Pause after a cycle aborted
    pub fn error_backoff(&self) -> Duration {
        self.error_backoff
    }

    pub fn cycle(&self) -> Duration {
        self.cycle
    }
}

impl Default for CycleScheduler {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}
