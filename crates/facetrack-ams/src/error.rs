//! Media Services client error types.

use thiserror::Error;

use facetrack_models::ODataError;

/// Result type for Media Services operations.
pub type AmsResult<T> = Result<T, AmsError>;

/// Errors that can occur while talking to the Media Services REST API.
#[derive(Debug, Error)]
pub enum AmsError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Redirect from {0} carried no location header")]
    MissingRedirectLocation(String),

    #[error("{operation} returned {status}: {message}")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AmsError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build an error for a response whose status the caller did not expect.
    ///
    /// The OData error message is used when the body carries one, otherwise
    /// the raw body is kept.
    pub fn unexpected_status(operation: impl Into<String>, status: u16, body: &str) -> Self {
        let message = ODataError::message_from_body(body).unwrap_or_else(|| body.to_string());
        Self::UnexpectedStatus {
            operation: operation.into(),
            status,
            message,
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            AmsError::UnexpectedStatus { status, .. } => Some(*status),
            AmsError::AuthError(_) => Some(401),
            AmsError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if error is retryable.
    ///
    /// Network failures, throttling and server errors are transient; every
    /// other status is a permanent API error.
    pub fn is_retryable(&self) -> bool {
        match self {
            AmsError::Network(_) | AmsError::InvalidResponse(_) | AmsError::Json(_) => true,
            AmsError::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_uses_odata_message() {
        let body = r#"{"error":{"code":"","message":{"lang":"en-US","value":"Asset not found"}}}"#;
        let err = AmsError::unexpected_status("create_asset_file", 404, body);
        assert_eq!(err.to_string(), "create_asset_file returned 404: Asset not found");
        assert_eq!(err.http_status(), Some(404));
    }

    #[test]
    fn test_unexpected_status_keeps_raw_body() {
        let err = AmsError::unexpected_status("list_jobs", 502, "Bad Gateway");
        assert_eq!(err.to_string(), "list_jobs returned 502: Bad Gateway");
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(AmsError::unexpected_status("op", 500, "").is_retryable());
        assert!(AmsError::unexpected_status("op", 503, "").is_retryable());
        assert!(AmsError::unexpected_status("op", 429, "").is_retryable());
        assert!(!AmsError::unexpected_status("op", 400, "").is_retryable());
        assert!(!AmsError::unexpected_status("op", 404, "").is_retryable());
        assert!(!AmsError::auth_error("expired").is_retryable());
        assert!(!AmsError::invalid_argument("empty oid").is_retryable());
    }
}
