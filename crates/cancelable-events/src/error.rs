//! Error types for event dispatch.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while dispatching an event.
///
/// Cancellation is not an error: a listener that cancels an emission yields
/// [`EmitOutcome::Canceled`](crate::EmitOutcome::Canceled).
#[derive(Debug, Error)]
pub enum EmitError {
    /// A listener suspended while being dispatched on the synchronous path.
    #[error("asynchronous listener in synchronous dispatch of \"{event}\"")]
    ProtocolViolation {
        /// Event that was being dispatched
        event: String,
    },

    /// A listener body returned an error.
    ///
    /// The remaining listeners of that emission are not invoked.
    #[error("listener for \"{event}\" failed: {source}")]
    ListenerFault {
        /// Event that was being dispatched
        event: String,
        /// Error returned by the listener
        #[source]
        source: anyhow::Error,
    },

    /// A suspending listener did not settle within the configured timeout.
    #[error("listener for \"{event}\" timed out after {limit:?}")]
    Timeout {
        /// Event that was being dispatched
        event: String,
        /// Configured per-listener limit
        limit: Duration,
    },
}

/// Specialized Result type for dispatch operations
pub type EmitResult<T> = Result<T, EmitError>;

impl EmitError {
    /// Create a protocol violation error
    pub fn protocol_violation(event: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            event: event.into(),
        }
    }

    /// Create a listener fault error
    pub fn listener_fault(event: impl Into<String>, source: anyhow::Error) -> Self {
        Self::ListenerFault {
            event: event.into(),
            source,
        }
    }

    /// Create a timeout error
    pub fn timeout(event: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            event: event.into(),
            limit,
        }
    }

    /// Name of the event whose dispatch failed.
    pub fn event(&self) -> &str {
        match self {
            Self::ProtocolViolation { event }
            | Self::ListenerFault { event, .. }
            | Self::Timeout { event, .. } => event,
        }
    }

    /// Check if this error is a protocol violation
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::ProtocolViolation { .. })
    }

    /// Check if this error came from a listener body
    pub fn is_listener_fault(&self) -> bool {
        matches!(self, Self::ListenerFault { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::ProtocolViolation { .. } => "protocol_violation",
            Self::ListenerFault { .. } => "listener_fault",
            Self::Timeout { .. } => "timeout",
        }
    }
}
