//! Upload orchestration.
//!
//! Creates the asset and its file entry, opens a short-lived write locator,
//! uploads the video into the asset's container, records its size and
//! closes the locator again. Each step consumes identifiers produced by
//! the previous ones, so the first failure ends the run.

use reqwest::StatusCode;

use facetrack_blob::{BlobClient, BlobCredentials};
use facetrack_models::{
    AccessPolicy, AccessPolicyPermission, Asset, AssetFile, CreateAccessPolicy, CreateAsset,
    CreateAssetFile, CreateLocator, Locator, UpdateAssetFile, VIDEO_MIME_TYPE,
};

use crate::error::{RunnerError, RunnerResult, Step, StepContext};
use crate::pipeline::Pipeline;

/// Name of the write access policy used for the upload.
pub const UPLOAD_POLICY_NAME: &str = "8k_UploadPolicy";

/// Lifetime of the write access policy, in minutes.
pub const UPLOAD_POLICY_MINUTES: u32 = 5;

/// Identifiers produced by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub asset_id: String,
    pub asset_file_id: String,
    /// Storage container backing the asset
    pub sto_asset_name: String,
    pub processor_id: String,
    pub content_length: u64,
}

impl Pipeline {
    /// Upload the configured video and resolve the processor to run on it.
    pub async fn upload_video(&self) -> RunnerResult<UploadOutcome> {
        let log = &self.logger;
        let name = self.config.asset_name()?;
        let file_name = format!("{}.mp4", name);

        log.log_start(Step::CreateAsset);
        let asset: Asset = self
            .ams
            .create_asset(&CreateAsset::new(&name))
            .await
            .and_then(|r| r.entity(StatusCode::CREATED, "create_asset"))
            .step(Step::CreateAsset)?;
        log.log_value(Step::CreateAsset, "Media Asset Name", &name);
        log.log_value(Step::CreateAsset, "Media Asset Id", &asset.id);

        log.log_start(Step::CreateAssetFile);
        let asset_file: AssetFile = self
            .ams
            .create_asset_file(&CreateAssetFile::new(&asset.id, &file_name))
            .await
            .and_then(|r| r.entity(StatusCode::CREATED, "create_asset_file"))
            .step(Step::CreateAssetFile)?;
        log.log_value(Step::CreateAssetFile, "Media Assetfile Name", &asset_file.name);
        log.log_value(Step::CreateAssetFile, "Media Assetfile Id", &asset_file.id);

        log.log_start(Step::CreateWriteAccessPolicy);
        let policy: AccessPolicy = self
            .ams
            .create_access_policy(&CreateAccessPolicy::new(
                UPLOAD_POLICY_NAME,
                UPLOAD_POLICY_MINUTES,
                AccessPolicyPermission::Write,
            ))
            .await
            .and_then(|r| r.entity(StatusCode::CREATED, "create_access_policy"))
            .step(Step::CreateWriteAccessPolicy)?;
        log.log_value(Step::CreateWriteAccessPolicy, "Asset Access Policy Id", &policy.id);

        log.log_start(Step::CreateSasLocator);
        let locator: Locator = self
            .ams
            .create_locator(&CreateLocator::sas(&asset.id, &policy.id))
            .await
            .and_then(|r| r.entity(StatusCode::CREATED, "create_locator"))
            .step(Step::CreateSasLocator)?;
        let sto_asset_name = locator.container_name().ok_or_else(|| {
            RunnerError::missing_output(
                Step::CreateSasLocator,
                format!("locator BaseUri {:?} names no container", locator.base_uri),
            )
        })?;
        log.log_value(Step::CreateSasLocator, "SAS URL Locator Id", &locator.id);
        log.log_value(Step::CreateSasLocator, "SAS URL Locator Base URI", &locator.base_uri);

        log.log_start(Step::UploadBlob);
        let blob_config = self.blob_config(locator.storage_origin().as_deref(), Step::UploadBlob)?;
        let blob = BlobClient::new(blob_config, BlobCredentials::sas(locator.sas_token()))
            .step(Step::UploadBlob)?;
        let content_length = blob
            .upload_file(&self.config.video_path, &sto_asset_name, &file_name, VIDEO_MIME_TYPE)
            .await
            .step(Step::UploadBlob)?;
        log.log_value(Step::UploadBlob, "Video File Uploaded", content_length);

        log.log_start(Step::UpdateAssetFileMetadata);
        self.ams
            .update_asset_file(
                &asset_file.id,
                &UpdateAssetFile::new(&asset.id, &asset_file.id, &file_name, content_length),
            )
            .await
            .and_then(|r| r.expect_status(StatusCode::NO_CONTENT, "update_asset_file").map(|_| ()))
            .step(Step::UpdateAssetFileMetadata)?;
        log.log_value(Step::UpdateAssetFileMetadata, "Assetfile Content Length Updated", content_length);

        log.log_start(Step::DeleteLocator);
        self.ams
            .delete_locator(&locator.id)
            .await
            .and_then(|r| r.expect_status(StatusCode::NO_CONTENT, "delete_locator").map(|_| ()))
            .step(Step::DeleteLocator)?;
        log.log_status(Step::DeleteLocator, StatusCode::NO_CONTENT.as_u16());

        log.log_start(Step::DeleteAccessPolicy);
        self.ams
            .delete_access_policy(&policy.id)
            .await
            .and_then(|r| r.expect_status(StatusCode::NO_CONTENT, "delete_access_policy").map(|_| ()))
            .step(Step::DeleteAccessPolicy)?;
        log.log_status(Step::DeleteAccessPolicy, StatusCode::NO_CONTENT.as_u16());

        log.log_start(Step::ResolveProcessorId);
        let processor = self
            .ams
            .find_media_processor(&self.config.processor_name)
            .await
            .step(Step::ResolveProcessorId)?
            .ok_or_else(|| RunnerError::ProcessorNotFound(self.config.processor_name.clone()))?;
        log.log_value(Step::ResolveProcessorId, "Media Processor Id", &processor.id);

        Ok(UploadOutcome {
            asset_id: asset.id,
            asset_file_id: asset_file.id,
            sto_asset_name,
            processor_id: processor.id,
            content_length,
        })
    }
}
