use std::sync::Arc;
use tokio::sync::RwLock;

use super::grant::TokenFetcher;
use super::types::AccessToken;

/// Token store
/// Holds the current access token under a shared-read / exclusive-write lock
pub struct TokenStore {
    /// Current access token, replaced wholesale on refresh
    current: RwLock<Arc<AccessToken>>,

    /// Where fresh tokens come from
    fetcher: Arc<dyn TokenFetcher>,
}

impl TokenStore {
    /// Create a store holding the empty token
    pub fn new(fetcher: Arc<dyn TokenFetcher>) -> Self {
        Self::with_token(fetcher, AccessToken::empty())
    }

    /// Create a store seeded with a known token
    pub fn with_token(fetcher: Arc<dyn TokenFetcher>, token: AccessToken) -> Self {
        Self {
            current: RwLock::new(Arc::new(token)),
            fetcher,
        }
    }

    /// Get the current token
    /// Concurrent readers never block each other; they wait only for a refresh in flight
    pub async fn read(&self) -> Arc<AccessToken> {
        self.current.read().await.clone()
    }

    /// Fetch a new token and make it current
    ///
    /// Holds the write lock for the whole fetch. On failure the previous token
    /// stays in place and is returned; the error is only logged.
    pub async fn refresh(&self) -> Arc<AccessToken> {
        tracing::debug!("Refreshing access token...");

        let mut current = self.current.write().await;

        match self.fetcher.fetch().await {
            Ok(token) => {
                *current = Arc::new(token);
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {}", e);
                tracing::warn!("Keeping previous access token");
            }
        }

        current.clone()
    }
}
