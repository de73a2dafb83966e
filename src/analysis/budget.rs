use std::time::Duration;

use tokio::time::Instant;

/// Wall-clock budget of one analysis.
///
/// Gating is cooperative: a stage checks the budget before it starts and never
/// gets interrupted once running.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    start: Instant,
    total: Duration,
}

impl Budget {
    pub fn start(total: Duration) -> Self {
        Self {
            start: Instant::now(),
            total,
        }
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// The point in time, relative to the start, where `fraction` of the budget is used.
    pub fn threshold(&self, fraction: f64) -> Duration {
        self.total.mul_f64(fraction.max(0.0))
    }

    /// True once more than `fraction` of the budget has been used.
    pub fn exceeded(&self, fraction: f64) -> bool {
        self.elapsed() > self.threshold(fraction)
    }
}
