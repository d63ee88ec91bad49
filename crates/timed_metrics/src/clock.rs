//! Time sources for timers
//!
//! Clocks report a monotonic offset from an arbitrary origin. Only differences
//! between two readings of the same clock are meaningful.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock {
    /// Current reading. Must never decrease between calls.
    fn now(&self) -> Duration;
}

impl<F> Clock for F
where
    F: Fn() -> Duration,
{
    fn now(&self) -> Duration {
        self()
    }
}

/// Wall-clock source backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic clock that only moves when told to.
///
/// Clones share the same reading, so a test can keep one handle and give
/// another to the timer under test.
///
/// ```ignore
/// let clock = ManualClock::new();
/// let timer = Timer::with_clock(clock.clone());
/// timer.start("load")?;
/// clock.advance(Duration::from_secs(5));
/// timer.stop("load")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    reading: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.reading.set(self.reading.get() + delta);
    }

    /// Jump to an absolute reading. Readings earlier than the current one
    /// are ignored to keep the clock monotonic.
    pub fn set(&self, reading: Duration) {
        if reading > self.reading.get() {
            self.reading.set(reading);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.reading.get()
    }
}
