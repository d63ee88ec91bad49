//! Timed Core
//!
//! Contains the instrumentation layer built on `timed_metrics`:
//! - Type definitions and the instrumenter that times their operations
//! - Settings shared by the instrumenter and the reports
//! - A process-wide single-instance-per-type registry

pub mod instrument;
pub mod settings;
pub mod singleton;

pub use instrument::{
    arg, instrument, CallError, Instance, InstrumentError, InstrumentedType, Instrumenter,
    TypeDefinition,
};
pub use settings::{InstrumentSettings, Settings, SettingsError};
pub use timed_metrics;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
