//! Runner configuration.
//!
//! Secrets come from the JSON credential file; everything else comes from
//! environment variables with defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use facetrack_ams::{AmsConfig, ClientCredentials};

use crate::error::{RunnerError, RunnerResult};
use crate::retry::PollPolicy;

/// Name of the processor the job runs on.
pub const DEFAULT_PROCESSOR_NAME: &str = "Azure Media Face Detector";

/// Prefix of the job and output asset names.
pub const OUTPUT_ASSET_PREFIX: &str = "analysed_";

/// Contents of the credential file.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Media Services account name
    #[serde(rename = "accountName")]
    pub account_name: String,
    /// Secret of the AAD application
    #[serde(rename = "accountKey")]
    pub account_key: String,
    #[serde(rename = "sto_accountName")]
    pub storage_account_name: String,
    #[serde(rename = "sto_accountKey")]
    pub storage_account_key: String,
    pub tenant_id: String,
    pub application_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("storage_account_name", &self.storage_account_name)
            .field("storage_account_key", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("application_id", &self.application_id)
            .finish()
    }
}

impl Credentials {
    /// Load the credential file.
    pub fn load(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RunnerError::MissingConfigFile(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw).map_err(|e| {
            RunnerError::config_error(format!("invalid credential file {}: {}", path.display(), e))
        })
    }

    /// Client-credentials grant for the AAD application.
    pub fn client_credentials(&self) -> ClientCredentials {
        ClientCredentials {
            tenant_id: self.tenant_id.clone(),
            client_id: self.application_id.clone(),
            client_secret: self.account_key.clone(),
        }
    }
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Credential file path
    pub credentials_path: PathBuf,
    /// Video to analyse
    pub video_path: PathBuf,
    /// Directory receiving the downloaded outputs
    pub output_folder: PathBuf,
    /// Processor preset sent as the task configuration
    pub task_template_path: PathBuf,
    pub processor_name: String,
    /// Blob endpoint used instead of the one derived from locator and asset URIs
    pub blob_endpoint: Option<String>,
    pub poll: PollPolicy,
    pub ams: AmsConfig,
}

impl RunnerConfig {
    /// Path of the credential file, read before the rest of the configuration.
    pub fn credentials_path_from_env() -> PathBuf {
        std::env::var("FACETRACK_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./config.json"))
    }

    /// Create config from environment variables.
    pub fn from_env() -> RunnerResult<Self> {
        let video_path = std::env::var("FACETRACK_VIDEO_PATH")
            .map(PathBuf::from)
            .map_err(|_| RunnerError::config_error("FACETRACK_VIDEO_PATH not set"))?;

        let ams = AmsConfig::from_env().map_err(|e| RunnerError::config_error(e.to_string()))?;

        Ok(Self {
            credentials_path: Self::credentials_path_from_env(),
            video_path,
            output_folder: std::env::var("FACETRACK_OUTPUT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./output")),
            task_template_path: std::env::var("FACETRACK_TASK_TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./emotion.json")),
            processor_name: std::env::var("FACETRACK_PROCESSOR_NAME")
                .unwrap_or_else(|_| DEFAULT_PROCESSOR_NAME.to_string()),
            blob_endpoint: std::env::var("FACETRACK_BLOB_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            poll: PollPolicy::from_env(),
            ams,
        })
    }

    /// Asset name: the video file name without its extension.
    pub fn asset_name(&self) -> RunnerResult<String> {
        self.video_path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                RunnerError::config_error(format!(
                    "cannot derive an asset name from {}",
                    self.video_path.display()
                ))
            })
    }

    /// Name of the job and of its output asset.
    pub fn output_asset_name(&self) -> RunnerResult<String> {
        Ok(format!("{}{}", OUTPUT_ASSET_PREFIX, self.asset_name()?))
    }
}
