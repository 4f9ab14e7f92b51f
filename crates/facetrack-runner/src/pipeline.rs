//! Upload, analyse and download pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, Instrument};

use facetrack_ams::{AadTokenProvider, AmsClient};
use facetrack_blob::{BlobConfig, BlobCredentials};

use crate::config::{Credentials, RunnerConfig};
use crate::error::{RunnerError, RunnerResult, Step, StepContext};
use crate::logging::StepLogger;

/// Storage account used to read job outputs.
#[derive(Clone)]
pub struct StorageAccount {
    pub name: String,
    pub key: String,
}

impl StorageAccount {
    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self {
            name: credentials.storage_account_name.clone(),
            key: credentials.storage_account_key.clone(),
        }
    }

    pub(crate) fn blob_credentials(&self) -> RunnerResult<BlobCredentials> {
        BlobCredentials::shared_key(&self.name, &self.key).step(Step::ListOutputBlobs)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub asset_id: String,
    pub job_id: String,
    pub output_asset_id: String,
    pub downloaded: Vec<PathBuf>,
}

/// Drives one video through the whole pipeline.
pub struct Pipeline {
    pub(crate) ams: AmsClient,
    pub(crate) config: RunnerConfig,
    pub(crate) storage: StorageAccount,
    pub(crate) logger: StepLogger,
}

impl Pipeline {
    pub fn new(ams: AmsClient, config: RunnerConfig, storage: StorageAccount) -> RunnerResult<Self> {
        let logger = StepLogger::new(config.asset_name()?);
        Ok(Self {
            ams,
            config,
            storage,
            logger,
        })
    }

    /// Authenticate, discover the REST endpoint and build the pipeline.
    pub async fn connect(config: RunnerConfig, credentials: &Credentials) -> RunnerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RunnerError::config_error(format!("failed to build HTTP client: {}", e)))?;

        let provider = AadTokenProvider::new(
            http,
            &config.ams.auth_endpoint,
            credentials.client_credentials(),
            config.ams.resource.clone(),
        )
        .step(Step::Authenticate)?;

        let mut ams = AmsClient::new(&config.ams, Arc::new(provider)).step(Step::Authenticate)?;

        ams.access_token().await.step(Step::Authenticate)?;
        info!("Access token acquired");

        let endpoint = ams
            .discover_endpoint()
            .await
            .step(Step::DiscoverEndpoint)?
            .to_string();
        info!(endpoint = %endpoint, "REST endpoint discovered");

        Self::new(ams, config, StorageAccount::from_credentials(credentials))
    }

    pub fn logger(&self) -> &StepLogger {
        &self.logger
    }

    /// Run every step in order, stopping at the first failure.
    pub async fn run(&self) -> RunnerResult<RunSummary> {
        let span = self.logger.create_span();

        let result = async {
            let upload = self.upload_video().await?;
            let job_id = self.submit_job(&upload).await?;
            let output_uri = self.poll_job(&job_id).await?;
            let download = self.download_results(&output_uri).await?;

            Ok::<_, RunnerError>(RunSummary {
                asset_id: upload.asset_id,
                job_id,
                output_asset_id: download.asset_id,
                downloaded: download.files,
            })
        }
        .instrument(span)
        .await;

        if let Err(e) = &result {
            if let Some(step) = e.step() {
                self.logger.log_error(step, &e.to_string());
            }
        }
        result
    }

    /// Blob endpoint for a container URL, unless one is configured.
    pub(crate) fn blob_config(&self, resource_url: Option<&str>, step: Step) -> RunnerResult<BlobConfig> {
        if let Some(endpoint) = &self.config.blob_endpoint {
            return Ok(BlobConfig::new(endpoint.clone()));
        }

        match resource_url {
            Some(url) => BlobConfig::from_resource_url(url).step(step),
            None => Ok(BlobConfig::for_account(&self.storage.name)),
        }
    }
}
