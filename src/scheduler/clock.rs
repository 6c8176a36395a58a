//! Monotonic time for the scheduler: delayed actions, request-deadline
//! draining cadence, and the deterministic clock `TestScheduler` uses
//! in place of real time (§4.4, §4.5's `steady_time`).
//!
//! Wall-clock timestamps on messages and events still go through
//! `chrono::Utc::now()` (§3.2) — `Tick` is a separate, opaque counter
//! used only to order and schedule work within a running process. The
//! two are intentionally not interchangeable: a `Tick` from a
//! `LogicalClock` means nothing outside the `TestScheduler` that
//! advanced it.

// Layer 1: Standard library imports
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// An opaque point in scheduler time. Only meaningful relative to the
/// `Clock` that produced it — ordering and subtraction between ticks
/// from different clocks is not defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(u64);

impl Tick {
    /// Advance this tick by `nanos` nanoseconds, saturating rather than
    /// wrapping at `u64::MAX`.
    pub fn advance(self, nanos: u64) -> Self {
        Tick(self.0.saturating_add(nanos))
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t+{}ns", self.0)
    }
}

/// Source of scheduler time. `SystemClock` wraps a real monotonic
/// clock; `LogicalClock` is explicitly driven by `TestScheduler` so
/// timing-dependent tests (delayed actions, request timeouts observed
/// through `Coordinator::steady_time`) are reproducible.
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current tick.
    fn now(&self) -> Tick;

    /// `duration` converted to the number of ticks from `now()`.
    /// Always `duration`'s nanosecond count — ticks are nanosecond
    /// granularity on every implementation.
    fn ticks_from(&self, duration: Duration) -> u64 {
        duration.as_nanos().min(u64::MAX as u128) as u64
    }
}

/// Real wall-clock time, anchored to an arbitrary process-start epoch
/// so `Tick` values stay small and comparable within one process run.
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Tick {
        Tick(self.epoch.elapsed().as_nanos().min(u64::MAX as u128) as u64)
    }
}

/// A clock that only moves when told to. Backs `TestScheduler`'s
/// `advance_time`: nothing observes real wall-clock time, so a test
/// that never calls `advance_time` can assert "no time has passed" and
/// mean it.
#[derive(Debug, Clone)]
pub struct LogicalClock {
    nanos: Arc<AtomicU64>,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move the clock forward by `duration`, returning the new tick.
    pub fn advance(&self, duration: Duration) -> Tick {
        let delta = self.ticks_from(duration);
        let updated = self.nanos.fetch_add(delta, Ordering::AcqRel) + delta;
        Tick(updated)
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Tick {
        Tick(self.nanos.load(Ordering::Acquire))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        std::thread::sleep(Duration::from_millis(1));
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn logical_clock_only_moves_on_advance() {
        let clock = LogicalClock::new();
        let a = clock.now();
        assert_eq!(a, clock.now());
        let b = clock.advance(Duration::from_millis(50));
        assert_eq!(b.as_nanos(), 50_000_000);
        assert_eq!(clock.now(), b);
    }

    #[test]
    fn tick_advance_saturates() {
        let tick = Tick(u64::MAX - 1);
        assert_eq!(tick.advance(10).as_nanos(), u64::MAX);
    }
}
