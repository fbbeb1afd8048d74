/// Unified error types for the writing registry
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Query input is not in the expected hash/address format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Query input is blank
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Request body or parameter errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network failures talking to a data source
    #[error("Source transport error: {0}")]
    SourceTransport(String),

    /// Data source answered with something we cannot decode
    #[error("Malformed source response: {0}")]
    MalformedResponse(String),

    /// ABI encoding/decoding errors
    #[error("ABI error: {0}")]
    Abi(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    /// Whether this error is a user-correctable query validation failure
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RegistryError::InvalidFormat(_)
                | RegistryError::EmptyInput(_)
                | RegistryError::Validation(_)
        )
    }
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert RegistryError to HTTP response
impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            RegistryError::RateLimitExceeded { retry_after } => Some(retry_after.as_secs().max(1)),
            _ => None,
        };

        let (status, error_code, message) = match self {
            RegistryError::InvalidFormat(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidFormat",
                self.to_string(),
            ),
            RegistryError::EmptyInput(_) => (
                StatusCode::BAD_REQUEST,
                "EmptyInput",
                self.to_string(),
            ),
            RegistryError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            RegistryError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            RegistryError::SourceTransport(_)
            | RegistryError::MalformedResponse(_)
            | RegistryError::Abi(_) => (
                StatusCode::BAD_GATEWAY,
                "UpstreamError",
                self.to_string(),
            ),
            RegistryError::Internal(_) | RegistryError::Io(_) | RegistryError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_bad_request() {
        let response = RegistryError::InvalidFormat("bad hash".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = RegistryError::EmptyInput("handle".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let response = RegistryError::Internal("secret".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limit_sets_retry_after() {
        let response = RegistryError::RateLimitExceeded {
            retry_after: std::time::Duration::from_secs(2),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");

        let response = RegistryError::Validation("x".to_string()).into_response();
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_is_validation() {
        assert!(RegistryError::EmptyInput(String::new()).is_validation());
        assert!(!RegistryError::SourceTransport(String::new()).is_validation());
    }
}
