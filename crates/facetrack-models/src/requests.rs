//! Typed request bodies for create and update calls.
//!
//! Property names follow the OData entity model. Numeric and boolean
//! scalars are sent as JSON strings, which the service accepts for every
//! entity below.

use serde::Serialize;

use crate::utils::as_string;

/// MIME type of the uploaded video and its asset file.
pub const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Encryption version sent for storage-encrypted asset files.
const STORAGE_ENCRYPTION_VERSION: &str = "1.0";

/// Body for `POST /Assets`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAsset {
    pub name: String,
    /// Asset creation options bitmask (0 = none)
    #[serde(serialize_with = "as_string")]
    pub options: u32,
}

impl CreateAsset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: 0,
        }
    }

    pub fn with_options(mut self, options: u32) -> Self {
        self.options = options;
        self
    }
}

/// Encryption properties of a storage-encrypted asset file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptionSettings {
    #[serde(serialize_with = "as_string")]
    pub is_encrypted: bool,
    pub encryption_scheme: String,
    pub encryption_version: String,
    pub encryption_key_id: String,
}

impl EncryptionSettings {
    /// Storage encryption with the given content key.
    pub fn storage(key_id: impl Into<String>) -> Self {
        Self {
            is_encrypted: true,
            encryption_scheme: "StorageEncryption".to_string(),
            encryption_version: STORAGE_ENCRYPTION_VERSION.to_string(),
            encryption_key_id: key_id.into(),
        }
    }
}

/// Body for `POST /Files`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAssetFile {
    #[serde(flatten)]
    pub encryption: Option<EncryptionSettings>,
    #[serde(serialize_with = "as_string")]
    pub is_primary: bool,
    pub mime_type: String,
    pub name: String,
    pub parent_asset_id: String,
}

impl CreateAssetFile {
    pub fn new(parent_asset_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            encryption: None,
            is_primary: false,
            mime_type: VIDEO_MIME_TYPE.to_string(),
            name: name.into(),
            parent_asset_id: parent_asset_id.into(),
        }
    }

    pub fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    pub fn with_encryption(mut self, encryption: EncryptionSettings) -> Self {
        self.encryption = Some(encryption);
        self
    }
}

/// Body for `MERGE /Files('<id>')` (sent as PATCH).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateAssetFile {
    #[serde(serialize_with = "as_string")]
    pub content_file_size: u64,
    pub id: String,
    pub mime_type: String,
    pub name: String,
    pub parent_asset_id: String,
}

impl UpdateAssetFile {
    pub fn new(
        parent_asset_id: impl Into<String>,
        asset_file_id: impl Into<String>,
        name: impl Into<String>,
        content_file_size: u64,
    ) -> Self {
        Self {
            content_file_size,
            id: asset_file_id.into(),
            mime_type: VIDEO_MIME_TYPE.to_string(),
            name: name.into(),
            parent_asset_id: parent_asset_id.into(),
        }
    }
}

/// Access policy permission flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicyPermission {
    None,
    Read,
    Write,
    Delete,
    List,
}

impl AccessPolicyPermission {
    pub fn code(&self) -> u32 {
        match self {
            AccessPolicyPermission::None => 0,
            AccessPolicyPermission::Read => 1,
            AccessPolicyPermission::Write => 2,
            AccessPolicyPermission::Delete => 4,
            AccessPolicyPermission::List => 8,
        }
    }
}

/// Body for `POST /AccessPolicies`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAccessPolicy {
    pub name: String,
    #[serde(serialize_with = "as_string")]
    pub duration_in_minutes: u32,
    #[serde(serialize_with = "as_string")]
    pub permissions: u32,
}

impl CreateAccessPolicy {
    pub fn new(
        name: impl Into<String>,
        duration_in_minutes: u32,
        permission: AccessPolicyPermission,
    ) -> Self {
        Self {
            name: name.into(),
            duration_in_minutes,
            permissions: permission.code(),
        }
    }
}

/// Locator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorType {
    /// Shared access signature URL into blob storage
    Sas,
    /// Streaming origin URL
    OnDemandOrigin,
}

impl LocatorType {
    pub fn code(&self) -> u8 {
        match self {
            LocatorType::Sas => 1,
            LocatorType::OnDemandOrigin => 2,
        }
    }
}

/// Body for `POST /Locators`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateLocator {
    pub access_policy_id: String,
    pub asset_id: String,
    #[serde(rename = "Type")]
    pub locator_type: u8,
}

impl CreateLocator {
    pub fn sas(asset_id: impl Into<String>, access_policy_id: impl Into<String>) -> Self {
        Self {
            access_policy_id: access_policy_id.into(),
            asset_id: asset_id.into(),
            locator_type: LocatorType::Sas.code(),
        }
    }
}

/// Reference to an input asset by its entity URI.
#[derive(Debug, Clone, Serialize)]
pub struct InputAssetRef {
    #[serde(rename = "__metadata")]
    pub metadata: InputAssetMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputAssetMetadata {
    pub uri: String,
}

impl InputAssetRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            metadata: InputAssetMetadata { uri: uri.into() },
        }
    }
}

/// One task inside a job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobTask {
    /// Processor preset, passed through verbatim
    pub configuration: String,
    pub media_processor_id: String,
    pub task_body: String,
}

impl JobTask {
    /// Single-input, single-output task writing to a new asset named `output_asset_name`.
    pub fn new(
        media_processor_id: impl Into<String>,
        configuration: impl Into<String>,
        output_asset_name: &str,
    ) -> Self {
        Self {
            configuration: configuration.into(),
            media_processor_id: media_processor_id.into(),
            task_body: task_body_xml(output_asset_name),
        }
    }
}

/// Body for `POST /Jobs`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateJob {
    pub name: String,
    pub input_media_assets: Vec<InputAssetRef>,
    pub tasks: Vec<JobTask>,
}

impl CreateJob {
    /// Job with one input asset and one task. The output asset takes the job name.
    pub fn single_task(
        name: impl Into<String>,
        input_asset_uri: impl Into<String>,
        media_processor_id: impl Into<String>,
        configuration: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let task = JobTask::new(media_processor_id, configuration, &name);
        Self {
            name,
            input_media_assets: vec![InputAssetRef::new(input_asset_uri)],
            tasks: vec![task],
        }
    }
}

/// Task body wiring job input 0 to a freshly created output asset.
pub fn task_body_xml(output_asset_name: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-16"?>"#,
            "<taskBody>",
            "<inputAsset>JobInputAsset(0)</inputAsset>",
            r#"<outputAsset assetCreationOptions="0" assetName="{}">JobOutputAsset(0)</outputAsset>"#,
            "</taskBody>"
        ),
        quick_xml::escape::escape(output_asset_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn to_value<T: Serialize>(body: &T) -> Value {
        serde_json::to_value(body).unwrap()
    }

    #[test]
    fn test_create_asset_body() {
        assert_eq!(
            to_value(&CreateAsset::new("clip")),
            json!({"Name": "clip", "Options": "0"})
        );
    }

    #[test]
    fn test_create_asset_file_body() {
        let body = CreateAssetFile::new("nb:cid:UUID:1", "clip.mp4");
        assert_eq!(
            to_value(&body),
            json!({
                "IsPrimary": "false",
                "MimeType": "video/mp4",
                "Name": "clip.mp4",
                "ParentAssetId": "nb:cid:UUID:1"
            })
        );
    }

    #[test]
    fn test_create_encrypted_asset_file_body() {
        let body = CreateAssetFile::new("a", "clip.mp4")
            .primary(true)
            .with_encryption(EncryptionSettings::storage("nb:kid:UUID:7"));
        let value = to_value(&body);

        assert_eq!(value["IsEncrypted"], "true");
        assert_eq!(value["EncryptionScheme"], "StorageEncryption");
        assert_eq!(value["EncryptionVersion"], "1.0");
        assert_eq!(value["EncryptionKeyId"], "nb:kid:UUID:7");
        assert_eq!(value["IsPrimary"], "true");
    }

    #[test]
    fn test_access_policy_body() {
        let body = CreateAccessPolicy::new("8k_UploadPolicy", 5, AccessPolicyPermission::Write);
        assert_eq!(
            to_value(&body),
            json!({"Name": "8k_UploadPolicy", "DurationInMinutes": "5", "Permissions": "2"})
        );
    }

    #[test]
    fn test_locator_body() {
        assert_eq!(
            to_value(&CreateLocator::sas("asset", "policy")),
            json!({"AccessPolicyId": "policy", "AssetId": "asset", "Type": 1})
        );
    }

    #[test]
    fn test_update_asset_file_body() {
        let body = UpdateAssetFile::new("asset", "file", "clip.mp4", 1_048_576);
        assert_eq!(
            to_value(&body),
            json!({
                "ContentFileSize": "1048576",
                "Id": "file",
                "MimeType": "video/mp4",
                "Name": "clip.mp4",
                "ParentAssetId": "asset"
            })
        );
    }

    #[test]
    fn test_job_body_embeds_configuration_as_string() {
        let config = r#"{"version":"1.0","options":{"TrackingMode":"Fast"}}"#;
        let job = CreateJob::single_task(
            "analysed_clip",
            "https://ams/api/Assets%28%27a%27%29",
            "nb:mpid:UUID:face",
            config,
        );
        let value = to_value(&job);

        assert_eq!(value["Name"], "analysed_clip");
        assert_eq!(
            value["InputMediaAssets"][0]["__metadata"]["uri"],
            "https://ams/api/Assets%28%27a%27%29"
        );
        assert_eq!(value["Tasks"][0]["Configuration"], config);
        assert_eq!(value["Tasks"][0]["MediaProcessorId"], "nb:mpid:UUID:face");
        assert!(value["Tasks"][0]["TaskBody"]
            .as_str()
            .unwrap()
            .contains(r#"assetName="analysed_clip""#));
    }

    #[test]
    fn test_task_body_escapes_asset_name() {
        let xml = task_body_xml(r#"a "quoted" <name> & more"#);
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-16"?><taskBody>"#));
        assert!(xml.contains("<inputAsset>JobInputAsset(0)</inputAsset>"));
        assert!(xml.contains("a &quot;quoted&quot; &lt;name&gt; &amp; more"));
        assert!(xml.ends_with("JobOutputAsset(0)</outputAsset></taskBody>"));
    }
}
