//! Error types for the Tempo kernel abstraction.

use crate::types::Time;
use thiserror::Error;

/// Errors reported by kernels, schedulers and the facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// An implementation was injected after the facade had already
    /// resolved one. Singleton identity is violated; callers treat this
    /// as fatal.
    #[error(
        "cannot set the simulator implementation after it has been resolved; \
         call set_implementation before any other Simulator call or after teardown"
    )]
    ImplementationAlreadySet,

    /// No kernel is registered under the configured name.
    #[error("unknown simulator implementation type: {0}")]
    UnknownSimulatorType(String),

    /// No scheduler is registered under the configured name.
    #[error("unknown scheduler type: {0}")]
    UnknownSchedulerType(String),

    /// The event would fire before the current virtual time.
    #[error("cannot schedule an event with negative delay {delay}")]
    NegativeDelay { delay: Time },

    /// `now + delay` does not fit in the time representation.
    #[error("scheduling {delay} after {now} overflows virtual time")]
    TimeOverflow { now: Time, delay: Time },

    /// The handle's event already ran, was cancelled, or its kernel is gone.
    #[error("event handle E#{uid} is expired")]
    InvalidHandle { uid: u64 },

    /// Malformed configuration input.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SimError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
