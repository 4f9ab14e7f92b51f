//! Result download.

use std::path::{Component, Path, PathBuf};

use reqwest::StatusCode;
use tracing::info;

use facetrack_blob::BlobClient;
use facetrack_models::Asset;

use crate::error::{RunnerError, RunnerResult, Step, StepContext};
use crate::pipeline::Pipeline;

/// Files fetched from the job's output asset.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub asset_id: String,
    pub container: String,
    pub files: Vec<PathBuf>,
}

impl Pipeline {
    /// Download every blob of the job's first output asset.
    ///
    /// Each blob lands in `<output_folder>/<blob name>.json`.
    pub async fn download_results(&self, output_assets_uri: &str) -> RunnerResult<DownloadOutcome> {
        let log = &self.logger;

        log.log_start(Step::ResolveOutputAsset);
        let outputs: Vec<Asset> = self
            .ams
            .get_deferred(output_assets_uri)
            .await
            .and_then(|r| r.collection(StatusCode::OK, "get_output_assets"))
            .step(Step::ResolveOutputAsset)?;
        let output_id = outputs
            .into_iter()
            .next()
            .map(|a| a.id)
            .ok_or_else(|| RunnerError::missing_output(Step::ResolveOutputAsset, "job produced no output asset"))?;
        log.log_value(Step::ResolveOutputAsset, "Indexed Media Asset Id", &output_id);

        log.log_start(Step::GetOutputAsset);
        let asset: Asset = self
            .ams
            .list_assets(Some(&output_id))
            .await
            .and_then(|r| r.entity(StatusCode::OK, "list_assets"))
            .step(Step::GetOutputAsset)?;
        let container = asset.container_name().ok_or_else(|| {
            RunnerError::missing_output(
                Step::GetOutputAsset,
                format!("asset {} has no storage container URI", output_id),
            )
        })?;
        log.log_value(Step::GetOutputAsset, "Output Asset Container", &container);

        log.log_start(Step::ListOutputBlobs);
        let blob_config = self.blob_config(asset.uri.as_deref(), Step::ListOutputBlobs)?;
        let blob = BlobClient::new(blob_config, self.storage.blob_credentials()?)
            .step(Step::ListOutputBlobs)?;
        let blobs = blob.list_blobs(&container).await.step(Step::ListOutputBlobs)?;

        let targets = blobs
            .iter()
            .map(|item| output_path(&self.config.output_folder, &item.name))
            .collect::<RunnerResult<Vec<_>>>()?;

        tokio::fs::create_dir_all(&self.config.output_folder).await?;

        let mut files = Vec::with_capacity(blobs.len());
        for (item, target) in blobs.iter().zip(targets) {
            log.log_value(Step::ListOutputBlobs, "Blob", &item.name);

            blob.download_to_path(&container, &item.name, &target)
                .await
                .step(Step::DownloadBlob)?;

            if item.is_json() {
                info!(blob = %item.name, path = %target.display(), "Results saved as JSON");
            }
            files.push(target);
        }

        Ok(DownloadOutcome {
            asset_id: output_id,
            container,
            files,
        })
    }
}

/// Local file for a listed blob, `<folder>/<name>.json`.
///
/// Blob names come from the remote listing and must stay inside `folder`.
fn output_path(folder: &Path, blob_name: &str) -> RunnerResult<PathBuf> {
    let relative = Path::new(blob_name);
    let contained = relative.components().next().is_some()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if !contained {
        return Err(RunnerError::missing_output(
            Step::DownloadBlob,
            format!("blob name {:?} escapes the output folder", blob_name),
        ));
    }

    Ok(folder.join(format!("{}.json", blob_name)))
}
