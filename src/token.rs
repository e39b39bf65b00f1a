//! Access token caching with expiry margin and single-flight renewal

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Tokens are treated as expired this long before the server-reported TTL
/// so an in-flight request never races the real expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);

/// A cached access/refresh token pair with its computed local expiry
#[derive(Debug, Clone)]
pub struct TokenRecord {
    access_token: String,
    refresh_token: String,
    expires_at: Instant,
}

impl TokenRecord {
    /// Build a record from a server response, applying the expiry margin
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: Instant::now() + ttl.saturating_sub(EXPIRY_MARGIN),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Source of fresh tokens; the production implementation is the Tuya client
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait TokenSource: Send + Sync {
    /// Acquire a brand-new token pair using the configured credentials
    async fn acquire(&self) -> crate::Result<TokenRecord>;

    /// Exchange a refresh token for a new token pair
    async fn refresh(&self, refresh_token: &str) -> crate::Result<TokenRecord>;
}

/// Read-mostly token cache.
///
/// The fast path checks validity under a read lock. On a miss the write lock
/// re-checks before touching the network, so concurrent callers that lose the
/// race reuse the winner's record instead of issuing duplicate calls.
#[derive(Debug, Default)]
pub struct TokenCache {
    current: RwLock<Option<TokenRecord>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a valid access token, refreshing or re-acquiring as needed
    pub async fn access_token(&self, source: &dyn TokenSource) -> crate::Result<String> {
        {
            let guard = self.current.read().await;
            if let Some(record) = guard.as_ref() {
                if record.is_valid() {
                    return Ok(record.access_token.clone());
                }
            }
        }

        let mut guard = self.current.write().await;

        // Another caller may have renewed while we waited for the lock
        if let Some(record) = guard.as_ref() {
            if record.is_valid() {
                return Ok(record.access_token.clone());
            }
        }

        if let Some(record) = guard.as_ref() {
            if !record.refresh_token.is_empty() {
                match source.refresh(&record.refresh_token).await {
                    Ok(renewed) => {
                        let token = renewed.access_token.clone();
                        *guard = Some(renewed);
                        return Ok(token);
                    }
                    Err(e) => {
                        tracing::warn!("Token refresh failed, acquiring a new token: {}", e);
                    }
                }
            }
        }

        // No refresh token or refresh failed: full acquisition. On failure
        // nothing is cached, so the next caller retries from scratch.
        let acquired = source.acquire().await?;
        let token = acquired.access_token.clone();
        *guard = Some(acquired);
        Ok(token)
    }
}
