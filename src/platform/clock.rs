//! Clock capabilities
//!
//! Time sources are injected rather than read from ambient globals so that
//! cache expiry and performance measurements can be driven deterministically
//! in tests.

use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;

/// A source of timestamps in milliseconds
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds
    fn now_ms(&self) -> f64;
}

/// Wall clock measured in milliseconds since the Unix epoch
///
/// Used for cache timestamps, where the absolute time matters less than
/// agreement between the write and the later read.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        Utc::now().timestamp_millis() as f64
    }
}

/// High-resolution monotonic clock, relative to its creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Creates a clock whose zero is the moment of creation
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to
///
/// Useful for tests and simulations that need exact control over elapsed time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Creates a clock starting at the given time
    pub fn starting_at(now_ms: f64) -> Self {
        Self {
            now: Mutex::new(now_ms),
        }
    }

    /// Moves the clock forward by `ms` milliseconds
    pub fn advance(&self, ms: f64) {
        *self.now.lock() += ms;
    }

    /// Sets the clock to an absolute time
    pub fn set(&self, now_ms: f64) {
        *self.now.lock() = now_ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::starting_at(100.0);
        assert_eq!(clock.now_ms(), 100.0);

        clock.advance(50.5);
        assert_eq!(clock.now_ms(), 150.5);

        clock.set(10.0);
        assert_eq!(clock.now_ms(), 10.0);
    }

    #[test]
    fn test_monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(first >= 0.0);
        assert!(second >= first);
    }

    #[test]
    fn test_system_clock_is_epoch_based() {
        let now = SystemClock.now_ms();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800_000.0);
    }
}
