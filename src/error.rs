//! Error types for Ensemble Shield.
//!
//! Defines a unified error type that maps cleanly to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Unified error type for Ensemble Shield operations.
#[derive(Debug, Error)]
pub enum ShieldError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The decision engine returned BLOCK for a generation request.
    #[error("Request blocked by guardrails")]
    Blocked,

    /// Generated text failed the output policy.
    #[error("Generated output violated output policy")]
    OutputPolicyViolation,

    /// A model collaborator (embedder, classifier, scorer, generator) failed.
    #[error("{component} failed: {message}")]
    Collaborator {
        component: &'static str,
        message: String,
    },

    #[error("Collaborator call exceeded {0:?}")]
    CollaboratorTimeout(Duration),

    /// The caller stopped waiting; remaining pipeline work was skipped.
    #[error("Request abandoned after timeout")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShieldError {
    /// Shorthand for a collaborator failure.
    pub fn collaborator(component: &'static str, message: impl Into<String>) -> Self {
        ShieldError::Collaborator {
            component,
            message: message.into(),
        }
    }
}

/// Error response body for API clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ShieldError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ShieldError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            ShieldError::Blocked => (
                StatusCode::FORBIDDEN,
                "BLOCKED",
                self.to_string(),
                None,
            ),
            ShieldError::OutputPolicyViolation => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "OUTPUT_POLICY_VIOLATION",
                self.to_string(),
                None,
            ),
            ShieldError::Collaborator { component, message } => {
                // Log the actual error but don't expose internals
                tracing::error!(component = %component, error = %message, "Collaborator error");
                (
                    StatusCode::BAD_GATEWAY,
                    "COLLABORATOR_ERROR",
                    format!("{} is unavailable", component),
                    None,
                )
            }
            ShieldError::CollaboratorTimeout(limit) => {
                tracing::error!(timeout_ms = limit.as_millis() as u64, "Collaborator timeout");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "COLLABORATOR_TIMEOUT",
                    self.to_string(),
                    None,
                )
            }
            ShieldError::Cancelled => (
                StatusCode::GATEWAY_TIMEOUT,
                "REQUEST_CANCELLED",
                self.to_string(),
                None,
            ),
            ShieldError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Configuration error".to_string(),
                Some(msg.clone()),
            ),
            ShieldError::Io(e) => {
                tracing::error!(error = %e, "I/O error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "An I/O error occurred".to_string(),
                    None,
                )
            }
            ShieldError::Serialization(e) => (
                StatusCode::BAD_REQUEST,
                "SERIALIZATION_ERROR",
                "Failed to process request/response".to_string(),
                Some(e.to_string()),
            ),
            ShieldError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for Shield operations.
pub type ShieldResult<T> = Result<T, ShieldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ShieldError::BadRequest("text is required".into()), StatusCode::BAD_REQUEST),
            (ShieldError::Blocked, StatusCode::FORBIDDEN),
            (ShieldError::OutputPolicyViolation, StatusCode::INTERNAL_SERVER_ERROR),
            (ShieldError::collaborator("embedder", "boom"), StatusCode::BAD_GATEWAY),
            (
                ShieldError::CollaboratorTimeout(Duration::from_secs(5)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (ShieldError::Cancelled, StatusCode::GATEWAY_TIMEOUT),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_precision() {
        let error = ShieldError::CollaboratorTimeout(Duration::from_millis(100));
        assert_eq!(error.to_string(), "Collaborator call exceeded 100ms");
    }

    #[test]
    fn test_blocked_message() {
        assert_eq!(
            ShieldError::Blocked.to_string(),
            "Request blocked by guardrails"
        );
        assert_eq!(
            ShieldError::OutputPolicyViolation.to_string(),
            "Generated output violated output policy"
        );
    }
}
