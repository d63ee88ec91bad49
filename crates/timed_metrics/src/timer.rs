//! Named stopwatch registry

use crate::{Clock, MonotonicClock, Report, ReportEntry, ReportSettings, TimerError, TimerSlot};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Slot used by [`Timer::start_main`], [`Timer::scope`] and [`Timer::elapsed`].
pub const MAIN_SLOT: &str = "main";

/// A set of named stopwatches sharing one clock.
///
/// Slots are created on the first `start` of a new name and remembered in
/// creation order. All operations take `&self`; the timer is meant to be used
/// from a single thread and is not `Sync`.
pub struct Timer {
    clock: Box<dyn Clock>,
    slots: RefCell<SlotTable>,
}

#[derive(Default)]
struct SlotTable {
    slots: Vec<TimerSlot>,
    name_lookup: HashMap<String, usize>,
}

impl SlotTable {
    fn get(&self, name: &str) -> Option<&TimerSlot> {
        self.name_lookup.get(name).map(|&index| &self.slots[index])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut TimerSlot> {
        let index = *self.name_lookup.get(name)?;
        Some(&mut self.slots[index])
    }

    fn get_or_insert(&mut self, name: &str) -> &mut TimerSlot {
        let index = match self.name_lookup.get(name) {
            Some(&index) => index,
            None => {
                let index = self.slots.len();
                self.slots.push(TimerSlot::new(name));
                self.name_lookup.insert(name.to_string(), index);
                index
            }
        };
        &mut self.slots[index]
    }

    /// `main` if present, otherwise the sum over every slot, all read at `now`.
    fn total(&self, now: Duration) -> Duration {
        match self.get(MAIN_SLOT) {
            Some(main) => main.elapsed(now),
            None => self.slots.iter().map(|slot| slot.elapsed(now)).sum(),
        }
    }
}

impl Timer {
    /// Timer backed by the monotonic wall clock.
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }

    /// Timer reading from a caller-supplied clock.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self::with_boxed_clock(Box::new(clock))
    }

    pub fn with_boxed_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            slots: RefCell::new(SlotTable::default()),
        }
    }

    /// Start the named slot, creating it if needed.
    pub fn start(&self, name: &str) -> Result<(), TimerError> {
        let now = self.clock.now();
        self.slots.borrow_mut().get_or_insert(name).start(now)?;
        tracing::trace!(slot = name, "timer started");
        Ok(())
    }

    /// Stop the named slot. Names that were never started are `NotStarted`
    /// and do not create a slot.
    pub fn stop(&self, name: &str) -> Result<(), TimerError> {
        let now = self.clock.now();
        let mut table = self.slots.borrow_mut();
        let slot = table.get_mut(name).ok_or_else(|| TimerError::NotStarted {
            name: name.to_string(),
        })?;
        let run = slot.stop(now)?;
        tracing::trace!(slot = name, run_us = run.as_micros() as u64, "timer stopped");
        Ok(())
    }

    pub fn start_main(&self) -> Result<(), TimerError> {
        self.start(MAIN_SLOT)
    }

    pub fn stop_main(&self) -> Result<(), TimerError> {
        self.stop(MAIN_SLOT)
    }

    /// Elapsed time of the `main` slot if it exists, otherwise the sum over
    /// every slot.
    pub fn elapsed(&self) -> Duration {
        let now = self.clock.now();
        self.slots.borrow().total(now)
    }

    /// Elapsed time of one slot, `None` if it was never started.
    pub fn slot_elapsed(&self, name: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.slots.borrow().get(name).map(|slot| slot.elapsed(now))
    }

    /// Completed runs of one slot (0 for unknown names).
    pub fn runs(&self, name: &str) -> usize {
        self.slots.borrow().get(name).map_or(0, TimerSlot::runs)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.slots
            .borrow()
            .get(name)
            .is_some_and(TimerSlot::is_running)
    }

    /// Slot names in creation order.
    pub fn slot_names(&self) -> Vec<String> {
        self.slots
            .borrow()
            .slots
            .iter()
            .map(|slot| slot.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().slots.is_empty()
    }

    /// Start `main` and stop it when the returned guard goes out of scope.
    pub fn scope(&self) -> Result<TimerGuard<'_>, TimerError> {
        self.guard(MAIN_SLOT)
    }

    /// Start `name` and stop it when the returned guard goes out of scope.
    pub fn guard(&self, name: &str) -> Result<TimerGuard<'_>, TimerError> {
        self.start(name)?;
        Ok(TimerGuard {
            timer: self,
            name: name.to_string(),
            armed: true,
        })
    }

    /// Run `f` with slot `name` running. The slot is stopped even if `f`
    /// panics.
    pub fn time<F, R>(&self, name: &str, f: F) -> Result<R, TimerError>
    where
        F: FnOnce() -> R,
    {
        let guard = self.guard(name)?;
        let result = f();
        guard.finish()?;
        Ok(result)
    }

    pub fn report(&self) -> Report {
        self.report_with(&ReportSettings::default())
    }

    pub fn report_with(&self, settings: &ReportSettings) -> Report {
        let now = self.clock.now();
        let table = self.slots.borrow();
        let total = table.total(now);
        let entries = table
            .slots
            .iter()
            .map(|slot| ReportEntry {
                name: slot.name().to_string(),
                elapsed: slot.elapsed(now),
                runs: slot.runs(),
                running: slot.is_running(),
            })
            .collect();
        Report::new(total, entries, settings.clone())
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.report(), f)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("slots", &self.slot_names())
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

/// Stops its slot when dropped.
///
/// Dropping cannot report a failed stop (for instance when the slot was
/// stopped by hand inside the scope), so such failures are logged. Use
/// [`TimerGuard::finish`] to receive them instead.
#[must_use = "the slot stops as soon as the guard is dropped"]
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    name: String,
    armed: bool,
}

impl TimerGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop the slot now and surface any failure.
    pub fn finish(mut self) -> Result<(), TimerError> {
        self.armed = false;
        self.timer.stop(&self.name)
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.timer.stop(&self.name) {
            tracing::warn!(slot = %self.name, error = %err, "scoped timer failed to stop");
        }
    }
}
