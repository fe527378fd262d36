//! Error types for request dispatch and outbound calls.

use crate::assertion::AssertionError;
use hyper::StatusCode;
use thiserror::Error;

/// Request-scoped failure, mapped 1:1 onto an HTTP status and a JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("URL Not Found")]
    NotFound,
    #[error("Method For URL Not Found")]
    MethodNotAllowed,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::NotFound => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure of a chained outbound request.
#[derive(Debug, Error)]
pub enum RequesterError {
    #[error("Invalid request target {url}: {reason}")]
    Build { url: String, reason: String },
    #[error("Error serializing request body: {0}")]
    Body(#[source] serde_json::Error),
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Status code mismatch, expected {expected} got {actual}")]
    StatusMismatch { expected: u16, actual: u16 },
    #[error("Unable to decode response body: {0}")]
    ResponseBody(String),
    #[error("Invalid expected body field: {0}")]
    BodyField(#[from] AssertionError),
    #[error("Expected header {name} does not match, expected: {expected}; got: {actual}")]
    HeaderMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

impl RequesterError {
    /// Whether the call completed but the response broke the expected contract
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RequesterError::StatusMismatch { .. }
                | RequesterError::ResponseBody(_)
                | RequesterError::BodyField(_)
                | RequesterError::HeaderMismatch { .. }
        )
    }
}
