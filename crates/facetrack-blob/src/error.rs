//! Storage error types.

use serde::Deserialize;
use thiserror::Error;

/// Result type for storage operations.
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Invalid account key: {0}")]
    InvalidKey(String),

    #[error("Invalid blob address: {0}")]
    InvalidAddress(String),

    #[error("{operation} returned {status}: {message}")]
    RequestFailed {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("Invalid list response: {0}")]
    InvalidListing(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error body returned by the storage service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StorageErrorBody {
    code: String,
    #[serde(default)]
    message: Option<String>,
}

impl BlobError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    /// Build an error for a failed storage call.
    ///
    /// Uses the `<Error><Code>` element of the body when present.
    pub fn request_failed(operation: impl Into<String>, status: u16, body: &str) -> Self {
        let message = quick_xml::de::from_str::<StorageErrorBody>(body)
            .map(|e| match e.message {
                Some(msg) => format!("{}: {}", e.code, msg.lines().next().unwrap_or_default()),
                None => e.code,
            })
            .unwrap_or_else(|_| body.to_string());

        Self::RequestFailed {
            operation: operation.into(),
            status,
            message,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            BlobError::RequestFailed { status, .. } => Some(*status),
            BlobError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            BlobError::Network(_) => true,
            BlobError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_failed_reads_storage_error_code() {
        let body = "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>AuthenticationFailed</Code><Message>Server failed to authenticate the request.\nRequestId:abc</Message></Error>";
        let err = BlobError::request_failed("list_blobs", 403, body);
        assert_eq!(
            err.to_string(),
            "list_blobs returned 403: AuthenticationFailed: Server failed to authenticate the request."
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_request_failed_keeps_raw_body() {
        let err = BlobError::request_failed("put_blob", 503, "busy");
        assert_eq!(err.to_string(), "put_blob returned 503: busy");
        assert!(err.is_retryable());
        assert_eq!(err.http_status(), Some(503));
    }
}
