//! Error types for ChainPulse.
//!
//! All errors in ChainPulse are strongly typed using thiserror.
//! None of them are fatal to the process: every failure path in the
//! services degrades to a published fallback message or a log line.

use thiserror::Error;

use crate::broker::Topic;

/// Validation errors that occur during input validation.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Metric change '{metric}' is not listed in affected metrics")]
    UnlistedMetricChange {
        metric: String,
    },

    #[error("Invalid payload for {field}: {reason}")]
    InvalidPayload {
        field: String,
        reason: String,
    },
}

/// Execution errors that occur while services react to events.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Subscriber on '{topic}' failed: {reason}")]
    SubscriberFailed {
        topic: Topic,
        reason: String,
    },

    #[error("Subscriber on '{topic}' panicked")]
    SubscriberPanicked {
        topic: Topic,
    },

    #[error("Text generation failed: {reason}")]
    TextGeneration {
        reason: String,
    },

    #[error("Text generation backend is not configured: {reason}")]
    Unconfigured {
        reason: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Timer '{timer}' needs a Tokio runtime")]
    NoRuntime {
        timer: String,
    },
}

/// Transport errors for the outbound push channel and HTTP surface.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind {addr}: {message}")]
    BindFailed {
        addr: String,
        message: String,
    },

    #[error("Failed to serialize payload: {message}")]
    SerializationFailed {
        message: String,
    },

    #[error("Server error: {message}")]
    Server {
        message: String,
    },
}

/// Top-level error type for ChainPulse.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl PulseError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if the caller is at fault (maps to a client error).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(TransportError::SerializationFailed {
            message: err.to_string(),
        })
    }
}

/// Result type alias for ChainPulse operations.
pub type PulseResult<T> = Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_missing_field() {
        let err = ValidationError::MissingField {
            field: "decision".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("decision"));
        assert!(msg.contains("missing"));
    }

    #[test]
    fn test_validation_error_unlisted_metric() {
        let err = ValidationError::UnlistedMetricChange {
            metric: "return-rate".to_string(),
        };
        assert!(format!("{err}").contains("return-rate"));
    }

    #[test]
    fn test_execution_error_subscriber_failed() {
        let err = ExecutionError::SubscriberFailed {
            topic: Topic::new("anomaly"),
            reason: "boom".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("anomaly"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_execution_error_timeout() {
        let err = ExecutionError::Timeout { duration_ms: 5000 };
        assert!(format!("{err}").contains("5000ms"));
    }

    #[test]
    fn test_pulse_error_from_validation() {
        let err: PulseError = ValidationError::MissingField {
            field: "scenario".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_pulse_error_from_execution() {
        let err: PulseError = ExecutionError::TextGeneration {
            reason: "quota".to_string(),
        }
        .into();
        assert!(err.is_execution());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_pulse_error_from_serde() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: PulseError = parse.into();
        assert!(err.is_transport());
    }
}
