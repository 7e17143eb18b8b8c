use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::ClaimSet;
use crate::config::ProviderConfig;
use crate::error::{AuthError, AuthResult};
use crate::resolver::{JwksKeyResolver, KeyResolver};

/// Verifies provider-issued RS256 bearer tokens.
///
/// Cloning is cheap and clones share the key resolver, so one verifier can
/// serve any number of concurrent requests.
#[derive(Clone)]
pub struct TokenVerifier {
    config: ProviderConfig,
    resolver: Arc<dyn KeyResolver>,
}

impl TokenVerifier {
    /// Verifier fetching keys from the provider's JWKS endpoint.
    pub fn new(config: ProviderConfig) -> Self {
        let resolver = JwksKeyResolver::from_config(&config);
        Self::with_resolver(config, resolver)
    }

    pub fn with_resolver(config: ProviderConfig, resolver: impl KeyResolver + 'static) -> Self {
        Self {
            config,
            resolver: Arc::new(resolver),
        }
    }

    pub fn from_env() -> AuthResult<Self> {
        ProviderConfig::from_env().map(Self::new)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.issuer()]);
        validation.set_audience(self.config.audience());
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = self.config.leeway_seconds.into();
        validation
    }

    /// Check signature and standard claims; the `Bearer ` prefix must already be stripped.
    pub async fn verify(&self, token: &str) -> AuthResult<ClaimSet> {
        let header =
            decode_header(token).map_err(|err| AuthError::InvalidHeader(err.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::Verification(ErrorKind::InvalidAlgorithm.into()));
        }

        let key = self.resolver.resolve(header.kid.as_deref()).await?;
        let token_data = decode::<Value>(token, &key, &self.validation())?;
        let claims = ClaimSet::try_from(token_data.claims)?;
        debug!(kid = ?header.kid, sub = %claims.subject, "verified bearer token");
        Ok(claims)
    }
}

/// Build a verifier for `config` and check a single token.
pub async fn verify_token(config: &ProviderConfig, token: &str) -> AuthResult<ClaimSet> {
    TokenVerifier::new(config.clone()).verify(token).await
}

/// [`verify_token`] with configuration read from `AUTH0_DOMAIN` / `AUTH0_AUDIENCE`.
///
/// Fails with [`AuthError::Configuration`] before any request is made when
/// the domain is unset.
pub async fn verify_token_from_env(token: &str) -> AuthResult<ClaimSet> {
    let config = ProviderConfig::from_env()?;
    verify_token(&config, token).await
}
