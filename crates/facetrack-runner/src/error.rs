//! Runner error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use facetrack_ams::AmsError;
use facetrack_blob::BlobError;

pub type RunnerResult<T> = Result<T, RunnerError>;

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Authenticate,
    DiscoverEndpoint,
    CreateAsset,
    CreateAssetFile,
    CreateWriteAccessPolicy,
    CreateSasLocator,
    UploadBlob,
    UpdateAssetFileMetadata,
    DeleteLocator,
    DeleteAccessPolicy,
    ResolveProcessorId,
    SubmitJob,
    PollJob,
    ResolveOutputAsset,
    GetOutputAsset,
    ListOutputBlobs,
    DownloadBlob,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Authenticate => "Authenticate",
            Step::DiscoverEndpoint => "DiscoverEndpoint",
            Step::CreateAsset => "CreateAsset",
            Step::CreateAssetFile => "CreateAssetFile",
            Step::CreateWriteAccessPolicy => "CreateWriteAccessPolicy",
            Step::CreateSasLocator => "CreateSasLocator",
            Step::UploadBlob => "UploadBlob",
            Step::UpdateAssetFileMetadata => "UpdateAssetFileMetadata",
            Step::DeleteLocator => "DeleteLocator",
            Step::DeleteAccessPolicy => "DeleteAccessPolicy",
            Step::ResolveProcessorId => "ResolveProcessorId",
            Step::SubmitJob => "SubmitJob",
            Step::PollJob => "PollJob",
            Step::ResolveOutputAsset => "ResolveOutputAsset",
            Step::GetOutputAsset => "GetOutputAsset",
            Step::ListOutputBlobs => "ListOutputBlobs",
            Step::DownloadBlob => "DownloadBlob",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Credential file not found: {}", .0.display())]
    MissingConfigFile(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{step} failed: {source}")]
    Ams {
        step: Step,
        #[source]
        source: AmsError,
    },

    #[error("{step} failed: {source}")]
    Blob {
        step: Step,
        #[source]
        source: BlobError,
    },

    #[error("Media processor not found: {0}")]
    ProcessorNotFound(String),

    #[error("{step} failed: {message}")]
    MissingOutput { step: Step, message: String },

    #[error("Job {job_id} still running after {attempts} polls")]
    PollExhausted { job_id: String, attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn missing_output(step: Step, msg: impl Into<String>) -> Self {
        Self::MissingOutput {
            step,
            message: msg.into(),
        }
    }

    /// Step the error is attributed to, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            RunnerError::Ams { step, .. }
            | RunnerError::Blob { step, .. }
            | RunnerError::MissingOutput { step, .. } => Some(*step),
            RunnerError::ProcessorNotFound(_) => Some(Step::ResolveProcessorId),
            RunnerError::PollExhausted { .. } => Some(Step::PollJob),
            _ => None,
        }
    }
}

/// Attach the failing step to a client error.
pub trait StepContext<T> {
    fn step(self, step: Step) -> RunnerResult<T>;
}

impl<T> StepContext<T> for Result<T, AmsError> {
    fn step(self, step: Step) -> RunnerResult<T> {
        self.map_err(|source| RunnerError::Ams { step, source })
    }
}

impl<T> StepContext<T> for Result<T, BlobError> {
    fn step(self, step: Step) -> RunnerResult<T> {
        self.map_err(|source| RunnerError::Blob { step, source })
    }
}
