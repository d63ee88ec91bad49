//! Single named stopwatch

use crate::TimerError;
use std::time::Duration;

/// One stopwatch inside a [`Timer`](crate::Timer).
///
/// A slot is either idle or running. Completed runs are kept in order; the
/// running marker is the clock reading taken by `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSlot {
    name: String,
    accumulated: Vec<Duration>,
    running_since: Option<Duration>,
}

impl TimerSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accumulated: Vec::new(),
            running_since: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Idle -> Running.
    pub fn start(&mut self, now: Duration) -> Result<(), TimerError> {
        if self.running_since.is_some() {
            return Err(TimerError::AlreadyStarted {
                name: self.name.clone(),
            });
        }
        self.running_since = Some(now);
        Ok(())
    }

    /// Running -> Idle. Returns the duration of the run that just ended.
    pub fn stop(&mut self, now: Duration) -> Result<Duration, TimerError> {
        let since = self.running_since.take().ok_or_else(|| TimerError::NotStarted {
            name: self.name.clone(),
        })?;
        let run = now.saturating_sub(since);
        self.accumulated.push(run);
        Ok(run)
    }

    /// Completed runs plus the live run, if any.
    pub fn elapsed(&self, now: Duration) -> Duration {
        let completed: Duration = self.accumulated.iter().sum();
        match self.running_since {
            Some(since) => completed + now.saturating_sub(since),
            None => completed,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Number of completed runs.
    #[inline]
    pub fn runs(&self) -> usize {
        self.accumulated.len()
    }

    /// Completed run durations in the order they finished.
    pub fn history(&self) -> &[Duration] {
        &self.accumulated
    }
}
