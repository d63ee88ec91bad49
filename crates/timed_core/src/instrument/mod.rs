//! Per-operation timing instrumentation.
//!
//! A [`TypeDefinition`] lists a type's initializer, operations and data
//! attributes. The [`Instrumenter`] turns it into an [`InstrumentedType`]:
//! every instance owns a private [`Timer`](timed_metrics::Timer), created
//! before the initializer runs, and every exposed operation records each call
//! under a slot named after the operation.
//!
//! Wrapping is explicit and inspectable: each [`Operation`] carries a timed
//! flag, and the process-wide registry lists what was wrapped per type name.
//! Subtypes built with [`TypeDefinition::extend`] inherit already-timed
//! operations as they are, so a call is never timed twice.

mod call_error;
mod definition;
mod instance;
mod instrument_error;
mod instrumenter;
mod operation;
mod registry;

pub use call_error::CallError;
pub use definition::{ClockFactory, DefinitionId, InitFn, TypeDefinition};
pub use instance::{Instance, InstrumentedType, INIT_NAME};
pub use instrument_error::InstrumentError;
pub use instrumenter::{instrument, Instrumenter, TIMER_ACCESSOR};
pub use operation::{arg, value_kind, Member, Operation, OperationFn, OperationMeta};
pub use registry::{is_instrumented, wrapped_operations};
