//! Clock abstraction for test determinism.
//!
//! Every time-driven component (VAD hangover, STT reset deadlines, OSC cooldown/TTL)
//! reads the current time through this trait instead of calling `Instant::now()`
//! directly, so tests can drive time deterministically with [`FakeClock`].

use parking_lot::Mutex;
use std::sync::Arc;

/// Monotonic time source, expressed in fractional seconds.
///
/// Seconds (not `Instant`) because durations here are compared, added, and logged
/// across crate boundaries (VAD hangover, STT deadlines, OSC TTL) where a plain
/// `f64` composes more simply than converting through `Duration` at every call site.
pub trait Clock: Send + Sync {
    /// Current monotonic time in seconds. Not tied to wall-clock time; only
    /// differences between calls are meaningful.
    fn now(&self) -> f64;
}

/// Real monotonic clock backed by `std::time::Instant`.
pub struct SystemClock {
    epoch: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Manually-advanced clock for deterministic tests.
pub struct FakeClock {
    now: Mutex<f64>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::with_start(0.0)
    }

    pub fn with_start(start_seconds: f64) -> Self {
        Self {
            now: Mutex::new(start_seconds),
        }
    }

    /// Advance the clock. Panics on a negative duration, matching the invariant
    /// that time never moves backward.
    pub fn advance(&self, seconds: f64) {
        assert!(seconds >= 0.0, "FakeClock cannot advance by a negative duration");
        *self.now.lock() += seconds;
    }

    pub fn set(&self, seconds: f64) {
        *self.now.lock() = seconds;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

/// Shared, cloneable handle to a clock, threaded through components that need
/// to read the current time.
pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock::new())
}

pub fn fake_clock() -> Arc<FakeClock> {
    Arc::new(FakeClock::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic_and_nonnegative() {
        let clock = SystemClock::new();
        let t0 = clock.now();
        let t1 = clock.now();
        assert!(t0 >= 0.0);
        assert!(t1 >= t0);
    }

    #[test]
    fn fake_clock_advances_by_exact_amount() {
        let clock = FakeClock::new();
        assert_eq!(clock.now(), 0.0);
        clock.advance(5.0);
        assert_eq!(clock.now(), 5.0);
        clock.advance(0.25);
        assert_eq!(clock.now(), 5.25);
    }

    #[test]
    fn fake_clock_can_start_at_arbitrary_time() {
        let clock = FakeClock::with_start(100.0);
        assert_eq!(clock.now(), 100.0);
    }

    #[test]
    #[should_panic]
    fn fake_clock_rejects_negative_advance() {
        let clock = FakeClock::new();
        clock.advance(-1.0);
    }
}
