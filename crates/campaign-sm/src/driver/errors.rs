//! Errors of the driver.

use thiserror::Error;

use crate::driver::state::DriverState;

/// Errors that can occur while processing a driver event.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// The event makes no sense in the current state.
    #[error("received invalid event {event} in state {state}")]
    InvalidEvent {
        /// The state in which the event was received.
        state: String,
        /// The invalid event.
        event: String,
    },

    /// The driver already stopped.
    #[error("event {event} rejected in terminal state {state}")]
    Terminal {
        /// The terminal state.
        state: DriverState,
        /// The rejected event.
        event: String,
    },
}

/// The result type of the driver.
pub type DriverResult<T> = Result<T, DriverError>;
