//! OData verbose envelopes.
//!
//! With `Accept: application/json;odata=verbose` every entity is wrapped in a
//! `{"d": {...}}` object and collections in `{"d": {"results": [...]}}`.

use serde::{Deserialize, Serialize};

/// A single entity response: `{"d": T}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataEntity<T> {
    pub d: T,
}

impl<T> ODataEntity<T> {
    pub fn into_inner(self) -> T {
        self.d
    }
}

/// A collection response: `{"d": {"results": [T, ...]}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataCollection<T> {
    pub d: ODataResults<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataResults<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> ODataCollection<T> {
    pub fn into_results(self) -> Vec<T> {
        self.d.results
    }
}

/// Error body returned by the service on 4xx/5xx.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataErrorDetail {
    #[serde(default)]
    pub code: String,
    pub message: ODataErrorMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataErrorMessage {
    #[serde(default)]
    pub lang: Option<String>,
    pub value: String,
}

impl ODataError {
    /// Best-effort extraction of the human-readable message from a body.
    pub fn message_from_body(body: &str) -> Option<String> {
        serde_json::from_str::<ODataError>(body)
            .ok()
            .map(|e| e.error.message.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MediaProcessor;

    #[test]
    fn test_collection_decoding() {
        let body = r#"{"d":{"results":[
            {"Id":"nb:mpid:UUID:1","Name":"Azure Media Face Detector","Version":"1.0"},
            {"Id":"nb:mpid:UUID:2","Name":"Media Encoder Standard","Version":"1.1"}
        ]}}"#;

        let collection: ODataCollection<MediaProcessor> = serde_json::from_str(body).unwrap();
        let results = collection.into_results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "Azure Media Face Detector");
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"code":"","message":{"lang":"en-US","value":"Resource Asset not found"}}}"#;
        assert_eq!(
            ODataError::message_from_body(body).as_deref(),
            Some("Resource Asset not found")
        );
        assert!(ODataError::message_from_body("<html>").is_none());
    }
}
