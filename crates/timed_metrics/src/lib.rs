//! Timed Metrics - named stopwatches and timing reports
//!
//! A [`Timer`] keeps any number of named [`TimerSlot`]s, each of which can be
//! started and stopped repeatedly. Completed runs accumulate; a running slot
//! also counts its live time.
//!
//! # Usage
//!
//! ```ignore
//! use timed_metrics::Timer;
//!
//! let timer = Timer::new();
//! timer.start("load")?;
//! // ... do work ...
//! timer.stop("load")?;
//!
//! {
//!     let _main = timer.scope()?; // stops "main" when dropped
//!     // ... do work ...
//! }
//! println!("{timer}");
//! ```

mod clock;
mod error;
mod report;
mod slot;
mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::TimerError;
pub use report::{format_duration, DurationStyle, Report, ReportEntry, ReportSettings};
pub use slot::TimerSlot;
pub use timer::{Timer, TimerGuard, MAIN_SLOT};

// ============================================================================
// Macros
// ============================================================================

/// Time a block under a named slot, yielding the block's value.
///
/// Expands to [`Timer::time`], so the result is wrapped in
/// `Result<_, TimerError>`.
///
/// ```ignore
/// let sum = time_scope!(timer, "sum", { values.iter().sum::<u64>() })?;
/// ```
#[macro_export]
macro_rules! time_scope {
    ($timer:expr, $name:expr, $body:block) => {
        $timer.time($name, || $body)
    };
}
