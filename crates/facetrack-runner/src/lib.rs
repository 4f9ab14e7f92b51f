//! Face detection pipeline runner.
//!
//! This crate provides:
//! - Credential file and environment configuration
//! - Upload orchestration (asset, file, policy, locator, blob)
//! - Job submission and polling with a retry policy
//! - Output asset download
//! - Structured step logging

pub mod config;
pub mod download;
pub mod error;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod retry;
pub mod upload;


pub use config::{Credentials, RunnerConfig};
pub use download::DownloadOutcome;
pub use error::{RunnerError, RunnerResult, Step};
pub use logging::StepLogger;
pub use pipeline::{Pipeline, RunSummary, StorageAccount};
pub use retry::{FailureTracker, PollPolicy};
pub use upload::UploadOutcome;
