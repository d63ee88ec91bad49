use thiserror::Error;

/// Errors that can occur while instrumenting a type definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstrumentError {
    #[error("cannot time '{attribute}': expected an operation but got <{actual_kind}>")]
    InvalidOperationKind {
        attribute: String,
        actual_kind: String,
    },

    #[error("type '{type_name}' has no member '{name}'")]
    UnknownMember { type_name: String, name: String },

    #[error("member '{name}' is reserved for the timer accessor")]
    ReservedMember { name: String },
}
