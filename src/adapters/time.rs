//! Host time adapter.
//!
//! Maps `std::time::Instant` onto the service's virtual clock, which counts
//! from service start.

use core::time::Duration;
use std::time::Instant;

/// Monotonic clock anchored at construction.
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time since construction.
    pub fn now(&self) -> Duration {
        self.start.elapsed()
    }

    /// Block until `deadline` (clock time), capped at `max_wait`.
    pub fn sleep_until(&self, deadline: Duration, max_wait: Duration) {
        let wait = deadline.saturating_sub(self.now()).min(max_wait);
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}
