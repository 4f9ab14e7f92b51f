//! Access token acquisition.
//!
//! The REST API accepts Azure AD bearer tokens obtained with the
//! client-credentials grant of a service principal.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use facetrack_models::utils::seconds_from_string_or_number;

use crate::error::{AmsError, AmsResult};

/// Default authority for client-credential grants.
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://login.microsoftonline.com/";

/// Resource identifier of the Media Services REST API.
pub const DEFAULT_RESOURCE: &str = "https://rest.media.azure.net";

/// An opaque bearer credential with an optional expiry.
#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: expires_in.map(|ttl| Instant::now() + ttl),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.secret
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of access tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> AmsResult<AccessToken>;
}

/// Service principal credentials.
#[derive(Clone)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "seconds_from_string_or_number")]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Azure AD client-credentials token provider.
pub struct AadTokenProvider {
    http: Client,
    token_url: String,
    credentials: ClientCredentials,
    resource: String,
}

impl AadTokenProvider {
    /// Create a provider for `<auth_endpoint><tenant_id>/oauth2/token`.
    pub fn new(
        http: Client,
        auth_endpoint: &str,
        credentials: ClientCredentials,
        resource: impl Into<String>,
    ) -> AmsResult<Self> {
        if credentials.tenant_id.is_empty() || credentials.client_id.is_empty() {
            return Err(AmsError::config_error(
                "tenant_id and application_id must not be empty",
            ));
        }

        let token_url = format!(
            "{}/{}/oauth2/token",
            auth_endpoint.trim_end_matches('/'),
            credentials.tenant_id
        );

        Ok(Self {
            http,
            token_url,
            credentials,
            resource: resource.into(),
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenProvider for AadTokenProvider {
    async fn fetch_token(&self) -> AmsResult<AccessToken> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("resource", self.resource.as_str()),
        ];

        let response = self.http.post(&self.token_url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                })
                .unwrap_or(body);
            return Err(AmsError::auth_error(format!(
                "token request returned {}: {}",
                status.as_u16(),
                reason
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AmsError::auth_error(format!("invalid token response: {}", e)))?;

        if token.access_token.is_empty() {
            return Err(AmsError::auth_error("token response carried an empty access_token"));
        }

        debug!(expires_in = ?token.expires_in, "Acquired access token");
        Ok(AccessToken::new(
            token.access_token,
            token.expires_in.map(Duration::from_secs),
        ))
    }
}

/// Provider that always returns the same token.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn fetch_token(&self) -> AmsResult<AccessToken> {
        if self.token.is_empty() {
            return Err(AmsError::auth_error("static token is empty"));
        }
        Ok(AccessToken::new(self.token.clone(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            tenant_id: "tenant-1".to_string(),
            client_id: "app-1".to_string(),
            client_secret: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_token_url() {
        let provider = AadTokenProvider::new(
            Client::new(),
            DEFAULT_AUTH_ENDPOINT,
            credentials(),
            DEFAULT_RESOURCE,
        )
        .unwrap();
        assert_eq!(
            provider.token_url(),
            "https://login.microsoftonline.com/tenant-1/oauth2/token"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?} {:?}", credentials(), AccessToken::new("abc", None));
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("\"abc\""));
    }

    #[tokio::test]
    async fn test_client_credentials_grant() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=app-1"))
            .and(body_string_contains("client_secret=s3cret"))
            .and(body_string_contains("resource=https%3A%2F%2Frest.media.azure.net"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"token_type":"Bearer","expires_in":"3599","access_token":"eyJ0eXAi"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            AadTokenProvider::new(Client::new(), &server.uri(), credentials(), DEFAULT_RESOURCE)
                .unwrap();
        let token = provider.fetch_token().await.unwrap();

        assert_eq!(token.as_str(), "eyJ0eXAi");
        assert!(token.expires_at().is_some());
    }

    #[tokio::test]
    async fn test_rejected_grant_is_auth_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret"}"#,
            ))
            .mount(&server)
            .await;

        let provider =
            AadTokenProvider::new(Client::new(), &server.uri(), credentials(), DEFAULT_RESOURCE)
                .unwrap();
        let err = provider.fetch_token().await.unwrap_err();

        assert!(matches!(err, AmsError::AuthError(_)));
        assert!(err.to_string().contains("invalid_client"));
    }

    #[test]
    fn test_empty_tenant_rejected() {
        let mut creds = credentials();
        creds.tenant_id.clear();
        assert!(AadTokenProvider::new(Client::new(), DEFAULT_AUTH_ENDPOINT, creds, DEFAULT_RESOURCE).is_err());
    }
}
