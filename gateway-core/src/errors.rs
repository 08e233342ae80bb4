//! Error taxonomy shared by every executor.

use gateway_sdk::objects::ErrorCategory;
use thiserror::Error;

use crate::adapter::SinkError;

/// Errors reported by an executor to the caller of `Validate` or `Start`.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The configuration payload is absent.
    #[error("event source can't be empty")]
    EmptySource,

    /// The configuration payload could not be parsed.
    #[error("failed to parse the event source. err: {0}")]
    ParseFailed(String),

    /// The configuration parsed but violates the source type's rules.
    #[error("invalid event source: {0}")]
    InvalidSource(String),

    /// The listener could not establish or keep its external connection.
    #[error("connection failure: {0}")]
    Connection(String),

    /// The listener faulted and was stopped by the fault boundary.
    #[error("event source {name} stopped after a fault: {reason}")]
    ListenerFaulted { name: String, reason: String },

    /// The outbound stream rejected a data unit.
    #[error("outbound stream failed: {0}")]
    Stream(#[from] SinkError),

    /// No executor is registered for the requested source type.
    #[error("unknown event source type: {0}")]
    UnknownKind(String),
}

impl ExecutorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExecutorError::EmptySource => ErrorCategory::EmptySource,
            ExecutorError::ParseFailed(_) => ErrorCategory::ParseFailure,
            ExecutorError::InvalidSource(_) => ErrorCategory::InvalidSource,
            ExecutorError::Connection(_) => ErrorCategory::Connection,
            ExecutorError::ListenerFaulted { .. } => ErrorCategory::ListenerFault,
            ExecutorError::Stream(_) => ErrorCategory::Stream,
            ExecutorError::UnknownKind(_) => ErrorCategory::UnknownSourceType,
        }
    }
}

impl From<lapin::Error> for ExecutorError {
    fn from(e: lapin::Error) -> Self {
        ExecutorError::Connection(e.to_string())
    }
}
