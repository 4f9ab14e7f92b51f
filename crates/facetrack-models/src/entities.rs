//! Entities returned by the Media Services REST API.
//!
//! Only the properties the pipeline reads are modeled; everything else in
//! the payload is ignored.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::job_state::{translate_job_state, JobState};
use crate::utils::string_or_number;

/// A media asset (a container of files in storage).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Storage container URI, e.g. `https://acct.blob.core.windows.net/asset-1234`
    #[serde(default)]
    pub uri: Option<String>,
}

impl Asset {
    /// Name of the storage container backing this asset.
    pub fn container_name(&self) -> Option<String> {
        self.uri.as_deref().and_then(first_path_segment)
    }
}

/// A file that belongs to an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssetFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_primary: Option<bool>,
    #[serde(default)]
    pub parent_asset_id: Option<String>,
}

/// Permission and duration contract underlying a locator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessPolicy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration_in_minutes: Option<f64>,
}

/// A time-bounded handle granting storage access to an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Locator {
    pub id: String,
    /// Container URL, e.g. `https://acct.blob.core.windows.net/asset-1234`
    #[serde(default)]
    pub base_uri: String,
    /// SAS query string including the leading `?`
    #[serde(default)]
    pub content_access_component: String,
    #[serde(default)]
    pub start_time: Option<String>,
}

impl Locator {
    /// Storage container name: the last path segment of the base URI.
    pub fn container_name(&self) -> Option<String> {
        last_path_segment(&self.base_uri)
    }

    /// SAS token without the leading `?`.
    pub fn sas_token(&self) -> &str {
        self.content_access_component
            .strip_prefix('?')
            .unwrap_or(&self.content_access_component)
    }

    /// Scheme, host and port of the base URI.
    pub fn storage_origin(&self) -> Option<String> {
        origin(&self.base_uri)
    }
}

/// A `__deferred` navigation link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deferred {
    #[serde(rename = "__deferred")]
    pub deferred: DeferredLink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredLink {
    pub uri: String,
}

/// A queued unit of remote processing work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Raw state code as reported by the service
    #[serde(default, deserialize_with = "string_or_number")]
    pub state: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub output_media_assets: Option<Deferred>,
}

impl Job {
    /// A job is finished once the service stamps its end time.
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn job_state(&self) -> Option<JobState> {
        JobState::from_code(&self.state)
    }

    /// Label for the current state, empty for unknown codes.
    pub fn state_label(&self) -> &'static str {
        translate_job_state(&self.state)
    }

    /// Link to the job's output assets collection.
    pub fn output_assets_uri(&self) -> Option<&str> {
        self.output_media_assets
            .as_ref()
            .map(|d| d.deferred.uri.as_str())
    }
}

/// A named remote processing capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaProcessor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

fn first_path_segment(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    let segment = url.path_segments()?.find(|s| !s.is_empty())?;
    Some(segment.to_string())
}

fn last_path_segment(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    Some(segment.to_string())
}

fn origin(uri: &str) -> Option<String> {
    let url = Url::parse(uri).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odata::ODataEntity;

    #[test]
    fn test_locator_container_and_token() {
        let locator = Locator {
            id: "nb:lid:UUID:1".to_string(),
            base_uri: "https://media.blob.core.windows.net/asset-0a1b2c".to_string(),
            content_access_component: "?sv=2012-02-12&sr=c&sig=abc".to_string(),
            start_time: None,
        };

        assert_eq!(locator.container_name().as_deref(), Some("asset-0a1b2c"));
        assert_eq!(locator.sas_token(), "sv=2012-02-12&sr=c&sig=abc");
        assert_eq!(
            locator.storage_origin().as_deref(),
            Some("https://media.blob.core.windows.net")
        );
    }

    #[test]
    fn test_locator_trailing_slash() {
        let locator = Locator {
            id: "l".to_string(),
            base_uri: "http://127.0.0.1:9000/asset-77/".to_string(),
            content_access_component: "sig=x".to_string(),
            start_time: None,
        };

        assert_eq!(locator.container_name().as_deref(), Some("asset-77"));
        assert_eq!(locator.sas_token(), "sig=x");
        assert_eq!(locator.storage_origin().as_deref(), Some("http://127.0.0.1:9000"));
    }

    #[test]
    fn test_asset_container_name() {
        let asset = Asset {
            id: "nb:cid:UUID:9".to_string(),
            name: "out".to_string(),
            uri: Some("https://media.blob.core.windows.net/asset-9f/".to_string()),
        };
        assert_eq!(asset.container_name().as_deref(), Some("asset-9f"));

        let no_uri = Asset {
            uri: None,
            ..asset
        };
        assert!(no_uri.container_name().is_none());
    }

    #[test]
    fn test_job_decoding() {
        let body = r#"{"d":{
            "Id":"nb:jid:UUID:42",
            "Name":"analysed_clip",
            "State":3,
            "StartTime":"2017-06-01T10:00:00",
            "EndTime":"2017-06-01T10:05:00",
            "OutputMediaAssets":{"__deferred":{"uri":"https://ams/api/Jobs('nb%3Ajid')/OutputMediaAssets"}}
        }}"#;

        let job = serde_json::from_str::<ODataEntity<Job>>(body).unwrap().into_inner();
        assert!(job.is_finished());
        assert_eq!(job.state_label(), "Finished");
        assert_eq!(job.job_state(), Some(JobState::Finished));
        assert_eq!(
            job.output_assets_uri(),
            Some("https://ams/api/Jobs('nb%3Ajid')/OutputMediaAssets")
        );
    }

    #[test]
    fn test_null_job_state_has_empty_label() {
        let body = r#"{"d":{"Id":"j","State":null,"EndTime":null}}"#;
        let job = serde_json::from_str::<ODataEntity<Job>>(body).unwrap().into_inner();
        assert_eq!(job.state, "");
        assert_eq!(job.state_label(), "");
        assert!(!job.is_finished());
    }

    #[test]
    fn test_running_job_decoding() {
        let body = r#"{"d":{"Id":"j","State":"2","EndTime":null}}"#;
        let job = serde_json::from_str::<ODataEntity<Job>>(body).unwrap().into_inner();
        assert!(!job.is_finished());
        assert_eq!(job.state_label(), "Processing");
        assert!(job.output_assets_uri().is_none());
    }
}
