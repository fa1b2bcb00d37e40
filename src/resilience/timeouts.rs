//! Per-attempt timeout budgets.
//!
//! A cold backend can take tens of seconds to answer its first request, so
//! each attempt gets a larger deadline than the one before.

use std::time::Duration;
use crate::config::TimeoutConfig;

/// Escalating per-attempt deadlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutSchedule {
    initial: Duration,
    progressive: Vec<Duration>,
    max: Duration,
}

impl TimeoutSchedule {
    pub fn new(initial: Duration, progressive: Vec<Duration>, max: Duration) -> Self {
        Self { initial, progressive, max }
    }

    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_ms),
            config.progressive_ms.iter().copied().map(Duration::from_millis).collect(),
            Duration::from_millis(config.max_ms),
        )
    }

    /// Deadline for a 1-based attempt number.
    pub fn for_attempt(&self, attempt: u32) -> Duration {
        let budget = if attempt <= 1 {
            self.initial
        } else {
            self.progressive
                .get(attempt as usize - 2)
                .copied()
                .unwrap_or(self.max)
        };
        budget.min(self.max)
    }

    /// Sum of the deadlines of the first `attempts` attempts.
    pub fn total_for(&self, attempts: u32) -> Duration {
        (1..=attempts).map(|n| self.for_attempt(n)).sum()
    }
}

impl Default for TimeoutSchedule {
    fn default() -> Self {
        Self::from_config(&TimeoutConfig::default())
    }
}
