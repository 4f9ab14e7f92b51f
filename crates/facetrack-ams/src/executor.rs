//! Redirect-aware request executor.
//!
//! The REST API answers the first call of a session with a permanent
//! redirect to the cluster that owns the account. Automatic redirects are
//! disabled on the HTTP client so the executor can replay the request
//! (verb, headers and body) against `location + path`, once.

use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use facetrack_models::{ODataCollection, ODataEntity};

use crate::envelope::{Envelope, RequestFormat};
use crate::error::{AmsError, AmsResult};

/// Final response of an executed request.
///
/// Non-success statuses are carried here rather than raised, so callers
/// decide what a given status means for their step.
#[derive(Debug, Clone)]
pub struct AmsResponse {
    pub status: StatusCode,
    /// URL that produced this response
    pub url: String,
    /// `location` header, if any
    pub location: Option<String>,
    pub body: String,
    /// True when this response came from the redirect follow-up
    pub redirected: bool,
}

impl AmsResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Fail with an `UnexpectedStatus` error unless the status matches.
    pub fn expect_status(&self, expected: StatusCode, operation: &str) -> AmsResult<&Self> {
        if self.status == expected {
            Ok(self)
        } else {
            Err(AmsError::unexpected_status(
                operation,
                self.status.as_u16(),
                &self.body,
            ))
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> AmsResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            AmsError::invalid_response(format!("{} from {}: {}", e, self.url, truncate(&self.body)))
        })
    }

    /// Check the status and decode a `{"d": T}` entity.
    pub fn entity<T: DeserializeOwned>(&self, expected: StatusCode, operation: &str) -> AmsResult<T> {
        self.expect_status(expected, operation)?;
        Ok(self.json::<ODataEntity<T>>()?.into_inner())
    }

    /// Check the status and decode a `{"d": {"results": [T]}}` collection.
    pub fn collection<T: DeserializeOwned>(
        &self,
        expected: StatusCode,
        operation: &str,
    ) -> AmsResult<Vec<T>> {
        self.expect_status(expected, operation)?;
        Ok(self.json::<ODataCollection<T>>()?.into_results())
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(256) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// True for permanent redirect statuses (301, 308).
pub fn is_permanent_redirect(status: StatusCode) -> bool {
    status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::PERMANENT_REDIRECT
}

/// Join a base URL and a path that starts with `/`.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Issues REST calls with the envelope headers and single-hop redirect handling.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: Client,
    api_version: String,
}

impl RequestExecutor {
    /// Create an executor with its own HTTP client.
    pub fn new(
        timeout: Duration,
        connect_timeout: Duration,
        api_version: impl Into<String>,
    ) -> AmsResult<Self> {
        let http = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("facetrack-ams/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AmsError::Network)?;

        Ok(Self {
            http,
            api_version: api_version.into(),
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Execute a request against `url`, built from the relative `path`.
    ///
    /// On a permanent redirect the identical request is reissued against
    /// `location + path`. The follow-up response is returned as-is, even if
    /// it redirects again.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        path: &str,
        body: Option<&str>,
        token: &str,
        format: RequestFormat,
    ) -> AmsResult<AmsResponse> {
        if path.is_empty() {
            return Err(AmsError::invalid_argument("resource path is empty"));
        }

        let first = self.send(method.clone(), url, body, token, format).await?;
        if !is_permanent_redirect(first.status) {
            return Ok(first);
        }

        let location = first
            .location
            .as_deref()
            .ok_or_else(|| AmsError::MissingRedirectLocation(url.to_string()))?;
        let redirected_url = join_url(location, path);

        debug!(from = %url, to = %redirected_url, "Following redirect");

        let mut response = self
            .send(method, &redirected_url, body, token, format)
            .await?;
        response.redirected = true;

        if is_permanent_redirect(response.status) {
            warn!(url = %redirected_url, "Redirect target redirected again, not following");
        }

        Ok(response)
    }

    /// GET an absolute URI, e.g. a `__deferred` link.
    ///
    /// With `follow_redirect`, a permanent redirect is followed to the
    /// `location` target itself (no path is appended).
    pub async fn get_uri(
        &self,
        uri: &str,
        token: &str,
        follow_redirect: bool,
    ) -> AmsResult<AmsResponse> {
        let first = self
            .send(Method::GET, uri, None, token, RequestFormat::Json)
            .await?;
        if !follow_redirect || !is_permanent_redirect(first.status) {
            return Ok(first);
        }

        let location = first
            .location
            .ok_or_else(|| AmsError::MissingRedirectLocation(uri.to_string()))?;

        let mut response = self
            .send(Method::GET, &location, None, token, RequestFormat::Json)
            .await?;
        response.redirected = true;
        Ok(response)
    }

    /// Discover the redirected endpoint for a session.
    ///
    /// Returns the URL that finally answered 200.
    pub async fn discover_endpoint(&self, base: &str, token: &str) -> AmsResult<String> {
        let response = self.get_uri(base, token, true).await?;

        if response.status != StatusCode::OK {
            return Err(AmsError::unexpected_status(
                "discover_endpoint",
                response.status.as_u16(),
                &response.body,
            ));
        }

        Ok(response.url)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        token: &str,
        format: RequestFormat,
    ) -> AmsResult<AmsResponse> {
        let headers = Envelope::new(format, token, &self.api_version).headers(&method)?;

        let mut request = self.http.request(method.clone(), url).headers(headers);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        debug!(method = %method, url = %final_url, status = status.as_u16(), "AMS response");

        Ok(AmsResponse {
            status,
            url: final_url,
            location,
            body,
            redirected: false,
        })
    }
}
