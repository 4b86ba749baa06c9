//! Error handling for the AreaKit event bus
//!
//! Provides the error type returned by the publish and subscribe surface of
//! [`EventBus`](crate::event_bus::EventBus).
//!
//! Failures inside subscriber code never surface here: actions run on the UI
//! scheduler, and deferred calls report their errors through the log.

use std::io;
use thiserror::Error;

/// Event bus error type
#[derive(Error, Debug)]
pub enum BusError {
    /// The bus has been stopped and no longer accepts traffic
    #[error("Event bus has been stopped")]
    Stopped,

    /// A worker thread could not be started
    #[error("Failed to spawn {thread} thread: {source}")]
    SpawnFailed {
        /// Name of the thread that failed to start.
        thread: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The bus configuration is not usable
    #[error("Invalid bus configuration '{field}': {reason}")]
    InvalidConfig {
        /// The offending configuration field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl BusError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error means the bus is shut down
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Result type for event bus operations
pub type Result<T> = std::result::Result<T, BusError>;
