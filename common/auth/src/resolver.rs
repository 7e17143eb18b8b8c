use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::SigningKeyCache;
use crate::config::ProviderConfig;
use crate::jwks::{JwksError, JwksFetcher};
use crate::rate_limit::FetchRateLimiter;

/// Resolves the public key a token was signed with.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    /// `kid` is the token header's key id, absent when the header has none.
    async fn resolve(&self, kid: Option<&str>) -> Result<DecodingKey, JwksError>;
}

// Cache slot for the key served to tokens without a `kid`.
const SOLE_KEY_SLOT: &str = "\u{0}sole-signing-key";

/// Key resolver backed by the provider's JWKS endpoint.
///
/// Resolved keys are cached per `kid`; cache misses go to the network,
/// bounded by a per-minute request budget. Misses are fetched one at a
/// time, so concurrent requests for the same new `kid` share one download.
#[derive(Clone)]
pub struct JwksKeyResolver {
    fetcher: JwksFetcher,
    cache: SigningKeyCache,
    limiter: FetchRateLimiter,
    fetch_lock: Arc<Mutex<()>>,
}

impl JwksKeyResolver {
    pub fn new(fetcher: JwksFetcher, cache: SigningKeyCache, limiter: FetchRateLimiter) -> Self {
        Self {
            fetcher,
            cache,
            limiter,
            fetch_lock: Arc::default(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            JwksFetcher::new(config.jwks_uri()),
            SigningKeyCache::new(config.cache_max_entries, config.cache_max_age),
            FetchRateLimiter::per_minute(config.jwks_requests_per_minute),
        )
    }

    pub fn fetcher(&self) -> &JwksFetcher {
        &self.fetcher
    }

    pub fn cache(&self) -> &SigningKeyCache {
        &self.cache
    }
}

#[async_trait]
impl KeyResolver for JwksKeyResolver {
    async fn resolve(&self, kid: Option<&str>) -> Result<DecodingKey, JwksError> {
        let slot = kid.unwrap_or(SOLE_KEY_SLOT);
        if let Some(key) = self.cache.get(slot) {
            return Ok(key);
        }

        let _fetching = self.fetch_lock.lock().await;
        if let Some(key) = self.cache.get(slot) {
            return Ok(key);
        }

        if !self.limiter.try_acquire() {
            warn!(url = %self.fetcher.url(), "JWKS request budget exhausted");
            return Err(JwksError::RateLimited);
        }

        let keys = self.fetcher.fetch().await?;
        let found = match kid {
            Some(kid) => keys
                .into_iter()
                .find(|candidate| candidate.kid.as_deref() == Some(kid)),
            None if keys.len() == 1 => keys.into_iter().next(),
            None => None,
        };

        let Some(signing_key) = found else {
            return Err(JwksError::SigningKeyNotFound(
                kid.unwrap_or_default().to_string(),
            ));
        };

        self.cache.insert(slot, signing_key.key.clone());
        debug!(kid = ?signing_key.kid, "cached JWKS signing key");
        Ok(signing_key.key)
    }
}
