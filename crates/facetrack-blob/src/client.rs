//! Blob storage client implementation.

use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use tracing::{debug, info};
use url::Url;

use crate::error::{BlobError, BlobResult};
use crate::listing::{block_list_xml, parse_list_response, BlobItem};
use crate::signing::{SharedKeySigner, X_MS_DATE_FORMAT};

/// Storage service version sent with every request.
pub const STORAGE_API_VERSION: &str = "2019-12-12";

/// Files larger than this are uploaded in blocks of this size (4 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

const X_MS_VERSION: HeaderName = HeaderName::from_static("x-ms-version");
const X_MS_DATE: HeaderName = HeaderName::from_static("x-ms-date");
const X_MS_BLOB_TYPE: HeaderName = HeaderName::from_static("x-ms-blob-type");
const X_MS_BLOB_CONTENT_TYPE: HeaderName = HeaderName::from_static("x-ms-blob-content-type");

/// How requests are authorized.
#[derive(Debug, Clone)]
pub enum BlobCredentials {
    /// Shared access signature query string, without the leading `?`
    Sas(String),
    /// Account name and key
    SharedKey(SharedKeySigner),
}

impl BlobCredentials {
    /// SAS credentials from a locator's content access component.
    pub fn sas(token: &str) -> Self {
        Self::Sas(token.trim_start_matches('?').to_string())
    }

    pub fn shared_key(account: impl Into<String>, account_key: &str) -> BlobResult<Self> {
        Ok(Self::SharedKey(SharedKeySigner::new(account, account_key)?))
    }
}

/// Configuration for the blob client.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Blob service endpoint, e.g. `https://account.blob.core.windows.net`
    pub endpoint: String,
    pub block_size: usize,
    pub timeout: Duration,
}

impl BlobConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            block_size: DEFAULT_BLOCK_SIZE,
            timeout: Duration::from_secs(300),
        }
    }

    /// Default public endpoint of a storage account.
    pub fn for_account(account: &str) -> Self {
        Self::new(format!("https://{}.blob.core.windows.net", account))
    }

    /// Endpoint taken from the scheme and authority of a blob or container URL.
    pub fn from_resource_url(resource_url: &str) -> BlobResult<Self> {
        let url = Url::parse(resource_url)
            .map_err(|e| BlobError::invalid_address(format!("{}: {}", resource_url, e)))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(BlobError::invalid_address(format!(
                "{} has no host",
                resource_url
            )));
        }
        Ok(Self::new(origin.ascii_serialization()))
    }
}

/// Azure Blob storage client.
#[derive(Clone)]
pub struct BlobClient {
    http: Client,
    endpoint: Url,
    credentials: BlobCredentials,
    block_size: usize,
}

impl BlobClient {
    pub fn new(config: BlobConfig, credentials: BlobCredentials) -> BlobResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| BlobError::config_error(format!("invalid blob endpoint: {}", e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(BlobError::config_error("blob endpoint cannot be a base URL"));
        }
        if config.block_size == 0 {
            return Err(BlobError::config_error("block size must be positive"));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("facetrack-blob/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            credentials,
            block_size: config.block_size,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// URL of a blob, or of the container itself when `blob` is `None`.
    pub fn resource_url(&self, container: &str, blob: Option<&str>) -> BlobResult<Url> {
        if container.is_empty() {
            return Err(BlobError::invalid_address("container name is empty"));
        }

        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| BlobError::invalid_address("endpoint cannot be a base URL"))?;
            segments.pop_if_empty().push(container);
            if let Some(blob) = blob {
                if blob.is_empty() {
                    return Err(BlobError::invalid_address("blob name is empty"));
                }
                segments.extend(blob.split('/'));
            }
        }
        Ok(url)
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Upload a local file as a block blob and return its size in bytes.
    ///
    /// Files up to the block size go up in a single request; larger files
    /// are staged block by block and committed with a block list.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        container: &str,
        blob: &str,
        content_type: &str,
    ) -> BlobResult<u64> {
        let path = path.as_ref();
        debug!("Uploading {} to {}/{}", path.display(), container, blob);

        let data = tokio::fs::read(path).await?;
        let total = data.len() as u64;

        if data.len() <= self.block_size {
            self.put_blob(container, blob, data, content_type).await?;
            report_progress(blob, total, total);
        } else {
            let mut block_ids = Vec::new();
            let mut uploaded = 0u64;

            for (index, chunk) in data.chunks(self.block_size).enumerate() {
                let block_id = block_id(index);
                self.put_block(container, blob, &block_id, chunk.to_vec())
                    .await?;
                block_ids.push(block_id);

                uploaded += chunk.len() as u64;
                report_progress(blob, uploaded, total);
            }

            self.put_block_list(container, blob, &block_ids, content_type)
                .await?;
        }

        info!("Uploaded {} to {}/{}", path.display(), container, blob);
        Ok(total)
    }

    /// Create or replace a block blob in one request.
    pub async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> BlobResult<()> {
        let url = self.resource_url(container, Some(blob))?;

        let mut headers = HeaderMap::new();
        headers.insert(X_MS_BLOB_TYPE, HeaderValue::from_static("BlockBlob"));
        headers.insert(CONTENT_TYPE, header_value(content_type)?);

        self.send("put_blob", Method::PUT, url, headers, Some(data))
            .await?;
        Ok(())
    }

    /// Stage one block of a blob.
    pub async fn put_block(
        &self,
        container: &str,
        blob: &str,
        block_id: &str,
        data: Vec<u8>,
    ) -> BlobResult<()> {
        let mut url = self.resource_url(container, Some(blob))?;
        url.query_pairs_mut()
            .append_pair("comp", "block")
            .append_pair("blockid", block_id);

        self.send("put_block", Method::PUT, url, HeaderMap::new(), Some(data))
            .await?;
        Ok(())
    }

    /// Commit staged blocks in order.
    pub async fn put_block_list(
        &self,
        container: &str,
        blob: &str,
        block_ids: &[String],
        content_type: &str,
    ) -> BlobResult<()> {
        let mut url = self.resource_url(container, Some(blob))?;
        url.query_pairs_mut().append_pair("comp", "blocklist");

        let mut headers = HeaderMap::new();
        headers.insert(X_MS_BLOB_CONTENT_TYPE, header_value(content_type)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));

        let body = block_list_xml(block_ids)?;
        self.send(
            "put_block_list",
            Method::PUT,
            url,
            headers,
            Some(body.into_bytes()),
        )
        .await?;
        Ok(())
    }

    // =========================================================================
    // List and download
    // =========================================================================

    /// List every blob in a container, following continuation markers.
    pub async fn list_blobs(&self, container: &str) -> BlobResult<Vec<BlobItem>> {
        let mut blobs = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut url = self.resource_url(container, None)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("restype", "container").append_pair("comp", "list");
                if let Some(marker) = &marker {
                    query.append_pair("marker", marker);
                }
            }

            let response = self
                .send("list_blobs", Method::GET, url, HeaderMap::new(), None)
                .await?;
            let page = parse_list_response(&response.text().await?)?;

            debug!(container = %container, count = page.blobs.len(), "Listed blob page");
            blobs.extend(page.blobs);

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(blobs)
    }

    /// Download a blob as bytes.
    pub async fn download_bytes(&self, container: &str, blob: &str) -> BlobResult<Vec<u8>> {
        debug!("Downloading {}/{}", container, blob);

        let url = self.resource_url(container, Some(blob))?;
        let response = self
            .send("get_blob", Method::GET, url, HeaderMap::new(), None)
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Download a blob to a local file, creating parent directories.
    pub async fn download_to_path(
        &self,
        container: &str,
        blob: &str,
        path: impl AsRef<Path>,
    ) -> BlobResult<u64> {
        let path = path.as_ref();
        let data = self.download_bytes(container, blob).await?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, &data).await?;

        info!("Downloaded {}/{} to {}", container, blob, path.display());
        Ok(data.len() as u64)
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    async fn send(
        &self,
        operation: &str,
        method: Method,
        mut url: Url,
        mut headers: HeaderMap,
        body: Option<Vec<u8>>,
    ) -> BlobResult<Response> {
        headers.insert(X_MS_VERSION, HeaderValue::from_static(STORAGE_API_VERSION));
        let content_length = body.as_ref().map(Vec::len).unwrap_or(0);
        if body.is_some() {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
        }

        match &self.credentials {
            BlobCredentials::Sas(token) => {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{}&{}", existing, token),
                    _ => token.clone(),
                };
                url.set_query(Some(&query));
            }
            BlobCredentials::SharedKey(signer) => {
                let date = chrono::Utc::now().format(X_MS_DATE_FORMAT).to_string();
                headers.insert(X_MS_DATE, header_value(&date)?);
                let authorization = signer.authorization(&method, &url, &headers)?;
                let mut value = header_value(&authorization)?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::request_failed(operation, status.as_u16(), &body));
        }

        Ok(response)
    }
}

/// Fixed-width block id so every id in a blob has the same length.
fn block_id(index: usize) -> String {
    STANDARD.encode(format!("block-{:06}", index))
}

fn header_value(value: &str) -> BlobResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| BlobError::config_error(format!("invalid header value: {}", value)))
}

fn report_progress(blob: &str, uploaded: u64, total: u64) {
    const MB: f64 = 1024.0 * 1024.0;
    info!(
        blob = %blob,
        uploaded_mb = uploaded as f64 / MB,
        total_mb = total as f64 / MB,
        "Upload progress"
    );
}
