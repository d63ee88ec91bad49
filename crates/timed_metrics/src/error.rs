use thiserror::Error;

/// Misuse of a stopwatch slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer <{name}> already started")]
    AlreadyStarted { name: String },

    #[error("timer <{name}> not started")]
    NotStarted { name: String },
}

impl TimerError {
    /// Name of the slot the failure refers to.
    pub fn slot(&self) -> &str {
        match self {
            TimerError::AlreadyStarted { name } | TimerError::NotStarted { name } => name,
        }
    }
}
