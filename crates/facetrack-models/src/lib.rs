//! Shared data models for the Media Services REST API.
//!
//! This crate provides Serde-serializable types for:
//! - OData verbose envelopes (`{"d": ...}`) and collection results
//! - Asset, asset file, access policy, locator, job and processor entities
//! - Typed request bodies for every create/update call
//! - Job state codes and their labels

pub mod entities;
pub mod job_state;
pub mod odata;
pub mod requests;
pub mod utils;

// Re-export common types
pub use entities::{AccessPolicy, Asset, AssetFile, Deferred, Job, Locator, MediaProcessor};
pub use job_state::{translate_job_state, JobState};
pub use odata::{ODataCollection, ODataEntity, ODataError};
pub use requests::{
    AccessPolicyPermission, CreateAccessPolicy, CreateAsset, CreateAssetFile, CreateJob,
    CreateLocator, EncryptionSettings, InputAssetRef, JobTask, LocatorType, UpdateAssetFile,
    VIDEO_MIME_TYPE,
};
