//! Error types for upstream legacy-service calls

use crate::{EntityKind, FailureClass};
use thiserror::Error;

/// Failure of a single call (or a whole retry sequence) against the legacy
/// record service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("Upstream rejected {path} with status {status}")]
    Rejected { status: u16, path: String },

    #[error("Upstream failed {path} with status {status}")]
    Server { status: u16, path: String },

    #[error("No response from upstream for {path}: {reason}")]
    Transport { path: String, reason: String },

    #[error("Upstream call {path} timed out after {after_ms}ms")]
    Timeout { path: String, after_ms: u64 },

    #[error("Malformed upstream body for {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Upstream unavailable after {attempts} attempts: {last}")]
    Unavailable {
        attempts: u32,
        last: Box<UpstreamError>,
    },
}

impl UpstreamError {
    /// Retry classification. An exhausted budget is permanent so it is never
    /// retried a second time by an outer caller.
    pub fn class(&self) -> FailureClass {
        match self {
            UpstreamError::Server { .. }
            | UpstreamError::Transport { .. }
            | UpstreamError::Timeout { .. } => FailureClass::Transient,
            UpstreamError::NotFound { .. }
            | UpstreamError::Rejected { .. }
            | UpstreamError::Decode { .. }
            | UpstreamError::Unavailable { .. } => FailureClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class().is_transient()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::NotFound { .. })
    }

    /// HTTP status observed from upstream, if any response was received.
    /// For `Unavailable` this is the status of the last attempt.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::NotFound { .. } => Some(404),
            UpstreamError::Rejected { status, .. } | UpstreamError::Server { status, .. } => {
                Some(*status)
            }
            UpstreamError::Unavailable { last, .. } => last.status(),
            UpstreamError::Transport { .. }
            | UpstreamError::Timeout { .. }
            | UpstreamError::Decode { .. } => None,
        }
    }

    /// The failure that ended the call: the last attempt for `Unavailable`,
    /// the error itself otherwise.
    pub fn root(&self) -> &UpstreamError {
        match self {
            UpstreamError::Unavailable { last, .. } => last.root(),
            other => other,
        }
    }
}

/// Result type alias for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}
