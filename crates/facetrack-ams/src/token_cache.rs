//! Bearer token cache for the Media Services client.
//!
//! Tokens are refetched a minute before they expire. A failed refresh keeps
//! serving the previous token until it actually expires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{AmsError, AmsResult};
use crate::token::TokenProvider;

/// Refresh the token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Conservative token TTL when the provider reports no expiry (50 minutes).
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    /// The token, if it outlives `margin` from now.
    fn valid_for(&self, margin: Duration) -> Option<String> {
        (Instant::now() + margin < self.expires_at).then(|| self.access_token.clone())
    }
}

fn fresh(cache: &Option<CachedToken>) -> Option<String> {
    cache.as_ref().and_then(|c| c.valid_for(TOKEN_REFRESH_MARGIN))
}

/// Token cache in front of a [`TokenProvider`].
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Current bearer token, fetched from the provider when missing or about to expire.
    pub async fn get_token(&self) -> AmsResult<String> {
        if let Some(token) = fresh(&*self.cache.read().await) {
            return Ok(token);
        }

        let mut cache = self.cache.write().await;
        // Refreshed by another caller while waiting for the write lock.
        if let Some(token) = fresh(&cache) {
            return Ok(token);
        }

        let token = match self.provider.fetch_token().await {
            Ok(token) => token,
            Err(e) => {
                let fallback = cache.as_ref().and_then(|c| c.valid_for(Duration::ZERO));
                return match fallback {
                    Some(token) => {
                        warn!("AAD token refresh failed, reusing current token: {}", e);
                        Ok(token)
                    }
                    None => Err(e),
                };
            }
        };

        if token.as_str().is_empty() {
            return Err(AmsError::auth_error("provider returned an empty token"));
        }

        let expires_at = token
            .expires_at()
            .unwrap_or_else(|| Instant::now() + TOKEN_DEFAULT_TTL);
        *cache = Some(CachedToken {
            access_token: token.as_str().to_string(),
            expires_at,
        });

        debug!("Refreshed AAD access token");
        Ok(token.as_str().to_string())
    }
}
