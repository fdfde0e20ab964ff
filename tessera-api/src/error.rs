//! Error Types for the Tessera API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversion into GraphQL field errors with diagnostic extensions

use async_graphql::ErrorExtensions;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::{ConfigError, UpstreamError};
use tessera_storage::LoadError;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur while serving a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request contains invalid input data
    InvalidInput,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist upstream
    EntityNotFound,

    // ========================================================================
    // Upstream Errors (502, 503, 504)
    // ========================================================================
    /// Upstream refused the call with a client-class status
    UpstreamRejected,

    /// Upstream answered with a body that does not match its contract
    UpstreamMalformed,

    /// Upstream failed transiently (retry budget not yet applied)
    UpstreamFailed,

    /// Retry budget exhausted
    ServiceUnavailable,

    /// A single attempt exceeded its deadline
    Timeout,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,
            ErrorCode::UpstreamRejected
            | ErrorCode::UpstreamMalformed
            | ErrorCode::UpstreamFailed => StatusCode::BAD_GATEWAY,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::EntityNotFound => "ENTITY_NOT_FOUND",
            ErrorCode::UpstreamRejected => "UPSTREAM_REJECTED",
            ErrorCode::UpstreamMalformed => "UPSTREAM_MALFORMED",
            ErrorCode::UpstreamFailed => "UPSTREAM_FAILED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error for API operations.
///
/// Served as JSON on plain HTTP routes and as a GraphQL field error (with
/// `details` flattened into the extensions) on the graph endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional diagnostics (failure class, upstream status, attempts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// GRAPHQL INTEGRATION
// ============================================================================

/// GraphQL field error carrying `code` plus every `details` entry as an
/// extension, so clients see the upstream status and failure class.
impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.message.clone()).extend_with(|_, ext| {
            ext.set("code", self.code.as_str());
            if let Some(serde_json::Value::Object(details)) = &self.details {
                for (key, value) in details {
                    if let Ok(value) = async_graphql::Value::from_json(value.clone()) {
                        ext.set(key.as_str(), value);
                    }
                }
            }
        })
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        let code = match err.root() {
            UpstreamError::NotFound { .. } => ErrorCode::EntityNotFound,
            UpstreamError::Rejected { .. } => ErrorCode::UpstreamRejected,
            UpstreamError::Decode { .. } => ErrorCode::UpstreamMalformed,
            _ if matches!(err, UpstreamError::Unavailable { .. }) => ErrorCode::ServiceUnavailable,
            UpstreamError::Timeout { .. } => ErrorCode::Timeout,
            _ => ErrorCode::UpstreamFailed,
        };

        // Class of the last attempt, not of the exhausted budget.
        let mut details = serde_json::json!({ "class": err.root().class().as_str() });
        if let Some(status) = err.status() {
            details["status"] = status.into();
        }
        if let UpstreamError::Unavailable { attempts, .. } = &err {
            details["attempts"] = (*attempts).into();
        }

        ApiError::new(code, err.to_string()).with_details(details)
    }
}

impl From<LoadError<UpstreamError>> for ApiError {
    fn from(err: LoadError<UpstreamError>) -> Self {
        match err {
            LoadError::Failed(inner) => inner.into(),
            LoadError::Dropped => ApiError::internal_error("Loader dropped before resolving the key"),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::invalid_input(err.to_string())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
