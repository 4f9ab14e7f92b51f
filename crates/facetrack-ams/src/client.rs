//! Media Services REST API client.
//!
//! - Endpoint discovery (the per-account redirected URL)
//! - Token caching with a single re-authentication on 401
//! - Resource CRUD helpers returning the raw response
//! - Observability (tracing spans, metrics)

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};

use facetrack_models::{
    CreateAccessPolicy, CreateAsset, CreateAssetFile, CreateJob, CreateLocator, MediaProcessor,
    UpdateAssetFile,
};

use crate::envelope::{RequestFormat, DEFAULT_API_VERSION};
use crate::error::{AmsError, AmsResult};
use crate::executor::{join_url, AmsResponse, RequestExecutor};
use crate::metrics::{record_redirect, record_request};
use crate::paths;
use crate::token::{TokenProvider, DEFAULT_AUTH_ENDPOINT, DEFAULT_RESOURCE};
use crate::token_cache::TokenCache;

// =============================================================================
// Configuration
// =============================================================================

/// Media Services client configuration.
#[derive(Debug, Clone)]
pub struct AmsConfig {
    /// REST API endpoint, e.g. `https://account.restv2.westeurope.media.azure.net/api/`
    pub rest_endpoint: String,
    /// Authority used for token requests
    pub auth_endpoint: String,
    /// Resource the token is requested for
    pub resource: String,
    /// Value of the `x-ms-version` header
    pub api_version: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl AmsConfig {
    pub fn new(rest_endpoint: impl Into<String>) -> Self {
        Self {
            rest_endpoint: rest_endpoint.into(),
            auth_endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
            resource: DEFAULT_RESOURCE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> AmsResult<Self> {
        let rest_endpoint = std::env::var("AMS_REST_ENDPOINT")
            .map_err(|_| AmsError::config_error("AMS_REST_ENDPOINT not set"))?;

        if rest_endpoint.trim().is_empty() {
            return Err(AmsError::config_error("AMS_REST_ENDPOINT cannot be empty"));
        }

        Ok(Self {
            rest_endpoint,
            auth_endpoint: std::env::var("AMS_AUTH_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_AUTH_ENDPOINT.to_string()),
            resource: std::env::var("AMS_RESOURCE")
                .unwrap_or_else(|_| DEFAULT_RESOURCE.to_string()),
            api_version: std::env::var("AMS_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_API_VERSION.to_string()),
            timeout: Duration::from_secs(
                std::env::var("AMS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("AMS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        })
    }
}

/// Base endpoint plus the redirected variant discovered for the session.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base: String,
    pub redirected: Option<String>,
}

impl Endpoint {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            redirected: None,
        }
    }

    /// Endpoint requests are sent to.
    pub fn active(&self) -> &str {
        self.redirected.as_deref().unwrap_or(&self.base)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Media Services REST API client.
#[derive(Clone)]
pub struct AmsClient {
    executor: RequestExecutor,
    endpoint: Endpoint,
    token_cache: Arc<TokenCache>,
    format: RequestFormat,
}

impl AmsClient {
    /// Create a client. No request is made until the first call.
    pub fn new(config: &AmsConfig, provider: Arc<dyn TokenProvider>) -> AmsResult<Self> {
        let executor =
            RequestExecutor::new(config.timeout, config.connect_timeout, &config.api_version)?;

        Ok(Self {
            executor,
            endpoint: Endpoint::new(&config.rest_endpoint),
            token_cache: Arc::new(TokenCache::new(provider)),
            format: RequestFormat::Json,
        })
    }

    /// Create a client and discover the redirected endpoint.
    pub async fn connect(config: &AmsConfig, provider: Arc<dyn TokenProvider>) -> AmsResult<Self> {
        let mut client = Self::new(config, provider)?;
        client.discover_endpoint().await?;
        Ok(client)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Get a valid access token.
    pub async fn access_token(&self) -> AmsResult<String> {
        self.token_cache.get_token().await
    }

    /// Resolve the redirected endpoint once for this session.
    pub async fn discover_endpoint(&mut self) -> AmsResult<&str> {
        let token = self.access_token().await?;
        let base = self.endpoint.base.clone();

        let redirected = self
            .execute_request("discover_endpoint", async {
                self.executor.discover_endpoint(&base, &token).await
            })
            .await?;

        info!(endpoint = %redirected, "Resolved REST endpoint");
        self.endpoint.redirected = Some(redirected);
        Ok(self.endpoint.active())
    }

    /// URI of an asset entity, as referenced from job inputs.
    pub fn asset_uri(&self, asset_id: &str) -> AmsResult<String> {
        let path = paths::encoded_entity_path(paths::ASSETS, asset_id)?;
        Ok(join_url(self.endpoint.active(), &path))
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    /// POST a new entity into a collection.
    pub async fn create<B: Serialize>(
        &self,
        operation: &str,
        collection: &str,
        body: &B,
    ) -> AmsResult<AmsResponse> {
        let body = serde_json::to_string(body)?;
        self.send(operation, Method::POST, collection, Some(&body)).await
    }

    /// GET a collection, or a single entity when an OID is given.
    pub async fn list(
        &self,
        operation: &str,
        collection: &str,
        oid: Option<&str>,
    ) -> AmsResult<AmsResponse> {
        let path = paths::list_path(collection, oid)?;
        self.send(operation, Method::GET, &path, None).await
    }

    /// Merge properties into an existing entity.
    pub async fn update<B: Serialize>(
        &self,
        operation: &str,
        collection: &str,
        oid: &str,
        body: &B,
    ) -> AmsResult<AmsResponse> {
        let path = paths::encoded_entity_path(collection, oid)?;
        let body = serde_json::to_string(body)?;
        self.send(operation, Method::PATCH, &path, Some(&body)).await
    }

    /// DELETE an entity.
    pub async fn delete(
        &self,
        operation: &str,
        collection: &str,
        oid: &str,
    ) -> AmsResult<AmsResponse> {
        let path = paths::encoded_entity_path(collection, oid)?;
        self.send(operation, Method::DELETE, &path, None).await
    }

    /// GET an absolute URI such as a `__deferred` link, without following redirects.
    pub async fn get_deferred(&self, uri: &str) -> AmsResult<AmsResponse> {
        self.execute_request("get_deferred", async {
            let token = self.access_token().await?;
            self.executor.get_uri(uri, &token, false).await
        })
        .await
    }

    // =========================================================================
    // Assets
    // =========================================================================

    pub async fn create_asset(&self, body: &CreateAsset) -> AmsResult<AmsResponse> {
        self.create("create_asset", paths::ASSETS, body).await
    }

    pub async fn list_assets(&self, oid: Option<&str>) -> AmsResult<AmsResponse> {
        self.list("list_assets", paths::ASSETS, oid).await
    }

    pub async fn delete_asset(&self, oid: &str) -> AmsResult<AmsResponse> {
        self.delete("delete_asset", paths::ASSETS, oid).await
    }

    // =========================================================================
    // Asset files
    // =========================================================================

    pub async fn create_asset_file(&self, body: &CreateAssetFile) -> AmsResult<AmsResponse> {
        self.create("create_asset_file", paths::FILES, body).await
    }

    pub async fn list_asset_files(&self, oid: Option<&str>) -> AmsResult<AmsResponse> {
        self.list("list_asset_files", paths::FILES, oid).await
    }

    pub async fn update_asset_file(
        &self,
        oid: &str,
        body: &UpdateAssetFile,
    ) -> AmsResult<AmsResponse> {
        self.update("update_asset_file", paths::FILES, oid, body).await
    }

    pub async fn delete_asset_file(&self, oid: &str) -> AmsResult<AmsResponse> {
        self.delete("delete_asset_file", paths::FILES, oid).await
    }

    // =========================================================================
    // Access policies
    // =========================================================================

    pub async fn create_access_policy(&self, body: &CreateAccessPolicy) -> AmsResult<AmsResponse> {
        self.create("create_access_policy", paths::ACCESS_POLICIES, body)
            .await
    }

    pub async fn list_access_policies(&self, oid: Option<&str>) -> AmsResult<AmsResponse> {
        self.list("list_access_policies", paths::ACCESS_POLICIES, oid)
            .await
    }

    pub async fn delete_access_policy(&self, oid: &str) -> AmsResult<AmsResponse> {
        self.delete("delete_access_policy", paths::ACCESS_POLICIES, oid)
            .await
    }

    // =========================================================================
    // Locators
    // =========================================================================

    pub async fn create_locator(&self, body: &CreateLocator) -> AmsResult<AmsResponse> {
        self.create("create_locator", paths::LOCATORS, body).await
    }

    pub async fn list_locators(&self, oid: Option<&str>) -> AmsResult<AmsResponse> {
        self.list("list_locators", paths::LOCATORS, oid).await
    }

    pub async fn delete_locator(&self, oid: &str) -> AmsResult<AmsResponse> {
        self.delete("delete_locator", paths::LOCATORS, oid).await
    }

    // =========================================================================
    // Jobs and processors
    // =========================================================================

    pub async fn create_job(&self, body: &CreateJob) -> AmsResult<AmsResponse> {
        self.create("create_job", paths::JOBS, body).await
    }

    pub async fn list_jobs(&self, oid: Option<&str>) -> AmsResult<AmsResponse> {
        self.list("list_jobs", paths::JOBS, oid).await
    }

    pub async fn list_media_processors(&self, oid: Option<&str>) -> AmsResult<AmsResponse> {
        self.list("list_media_processors", paths::MEDIA_PROCESSORS, oid)
            .await
    }

    /// Find a processor id by name.
    ///
    /// When several versions share the name, the last one listed wins.
    pub async fn find_media_processor(&self, name: &str) -> AmsResult<Option<MediaProcessor>> {
        let response = self.list_media_processors(None).await?;
        let processors: Vec<MediaProcessor> =
            response.collection(StatusCode::OK, "list_media_processors")?;

        Ok(processors.into_iter().rev().find(|p| p.name == name))
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    async fn send(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> AmsResult<AmsResponse> {
        let url = join_url(self.endpoint.active(), path);

        self.execute_request(operation, async {
            let token = self.access_token().await?;
            let response = self
                .executor
                .execute(method.clone(), &url, path, body, &token, self.format)
                .await?;

            if response.status != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            // Token revoked or expired server-side: fetch a fresh one and retry once.
            debug!(operation = %operation, "Got 401, refreshing access token");
            self.token_cache.invalidate().await;
            let token = self.access_token().await?;
            self.executor
                .execute(method.clone(), &url, path, body, &token, self.format)
                .await
        })
        .await
        .inspect(|response| {
            if response.redirected {
                record_redirect(operation);
            }
        })
    }

    async fn execute_request<T, F>(&self, operation: &str, fut: F) -> AmsResult<T>
    where
        F: std::future::Future<Output = AmsResult<T>>,
        T: ResponseStatus,
    {
        let span = info_span!("ams_request", operation = %operation);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(value) => value.status_code(),
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(operation, status, latency_ms);

        result
    }
}

/// Status reported to request metrics.
trait ResponseStatus {
    fn status_code(&self) -> u16;
}

impl ResponseStatus for AmsResponse {
    fn status_code(&self) -> u16 {
        self.status.as_u16()
    }
}

impl ResponseStatus for String {
    fn status_code(&self) -> u16 {
        200
    }
}
