use thiserror::Error;
use timed_metrics::TimerError;

/// Errors returned when constructing an instance or calling one of its
/// operations.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("type '{type_name}' has no operation '{name}'")]
    UnknownOperation { type_name: String, name: String },

    #[error("'{name}' takes {expected} argument(s) but {actual} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Timer(#[from] TimerError),

    /// Failure raised by the operation (or initializer) body itself.
    #[error(transparent)]
    Operation(anyhow::Error),
}

impl CallError {
    /// The failure raised by user code, if that is what this is.
    pub fn operation_error(&self) -> Option<&anyhow::Error> {
        match self {
            CallError::Operation(err) => Some(err),
            _ => None,
        }
    }

    /// Downcast a user failure to its concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        self.operation_error().and_then(|err| err.downcast_ref::<E>())
    }
}
