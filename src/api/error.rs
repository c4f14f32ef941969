//! Error types for API operations.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when calling the API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Server answered with a non-success status
    ///
    /// `data` holds the parsed error body, or `None` when the body was not JSON.
    #[error("API Error: {status} {status_text}")]
    Status {
        status: u16,
        status_text: String,
        data: Option<Value>,
    },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A custom transport failed before a response was received
    #[error("Transport failed: {0}")]
    Transport(String),

    /// Success response body was not valid JSON for the requested type
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request body could not be serialized
    #[error("Failed to serialize request body: {0}")]
    Serialize(String),

    /// Response body was rejected by the installed validator
    #[error("Response failed validation: {0}")]
    Validation(String),
}

impl ApiError {
    /// Returns the HTTP status for [`ApiError::Status`] errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the parsed error body for [`ApiError::Status`] errors
    pub fn data(&self) -> Option<&Value> {
        match self {
            ApiError::Status { data, .. } => data.as_ref(),
            _ => None,
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_error_message() {
        let err = ApiError::Status {
            status: 404,
            status_text: "Not Found".to_string(),
            data: None,
        };
        assert_eq!(err.to_string(), "API Error: 404 Not Found");
        assert_eq!(err.status(), Some(404));
        assert!(err.data().is_none());
    }

    #[test]
    fn test_status_error_exposes_body() {
        let err = ApiError::Status {
            status: 422,
            status_text: "Unprocessable Entity".to_string(),
            data: Some(json!({"field": "name"})),
        };
        assert_eq!(err.data(), Some(&json!({"field": "name"})));
    }

    #[test]
    fn test_non_status_errors_have_no_status() {
        let err = ApiError::Transport("connection reset".to_string());
        assert!(err.status().is_none());
        assert!(err.to_string().contains("connection reset"));
    }
}
