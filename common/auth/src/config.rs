use std::env;
use std::time::Duration;

use crate::error::{AuthError, AuthResult};

pub const DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const AUDIENCE_ENV: &str = "AUTH0_AUDIENCE";

const DEFAULT_CACHE_MAX_ENTRIES: usize = 5;
const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(600);
const DEFAULT_JWKS_REQUESTS_PER_MINUTE: u32 = 10;

/// Identity provider settings used to verify bearer tokens.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    domain: String,
    audience: Vec<String>,
    /// Allowable clock skew in seconds when validating exp/nbf.
    pub leeway_seconds: u32,
    /// Maximum number of signing keys held by the resolver cache.
    pub cache_max_entries: usize,
    /// How long a resolved signing key stays valid in the cache.
    pub cache_max_age: Duration,
    /// JWKS requests allowed per rolling minute; 0 disables the limit.
    pub jwks_requests_per_minute: u32,
    jwks_uri: Option<String>,
}

impl ProviderConfig {
    /// Build a config for `domain` expecting tokens addressed to `audience`.
    ///
    /// The domain may be given with or without a scheme and trailing slash.
    pub fn new<I, A>(domain: impl AsRef<str>, audience: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let domain = normalize_domain(domain.as_ref())
            .ok_or_else(|| AuthError::Configuration(format!("`{DOMAIN_ENV}` is not set")))?;

        let audience: Vec<String> = audience
            .into_iter()
            .map(Into::<String>::into)
            .filter_map(|value| normalize_optional(&value))
            .collect();
        if audience.is_empty() {
            return Err(AuthError::Configuration(format!(
                "`{AUDIENCE_ENV}` is not set"
            )));
        }

        Ok(Self {
            domain,
            audience,
            leeway_seconds: 0,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            jwks_requests_per_minute: DEFAULT_JWKS_REQUESTS_PER_MINUTE,
            jwks_uri: None,
        })
    }

    /// Load `AUTH0_DOMAIN` and `AUTH0_AUDIENCE` from the process environment.
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `AUTH0_AUDIENCE` may hold several audiences separated by commas.
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let domain = lookup(DOMAIN_ENV)
            .and_then(|value| normalize_optional(&value))
            .ok_or_else(|| AuthError::Configuration(format!("`{DOMAIN_ENV}` is not set")))?;
        let audience = lookup(AUDIENCE_ENV)
            .map(|value| parse_audience(&value))
            .unwrap_or_default();

        Self::new(domain, audience)
    }

    pub fn with_leeway(mut self, seconds: u32) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_cache(mut self, max_entries: usize, max_age: Duration) -> Self {
        self.cache_max_entries = max_entries;
        self.cache_max_age = max_age;
        self
    }

    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Self {
        self.jwks_requests_per_minute = requests_per_minute;
        self
    }

    /// Fetch keys from `uri` instead of the provider's well-known location.
    pub fn with_jwks_uri(mut self, uri: impl Into<String>) -> Self {
        self.jwks_uri = Some(uri.into());
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    /// Expected `iss` claim.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn jwks_uri(&self) -> String {
        match &self.jwks_uri {
            Some(uri) => uri.clone(),
            None => format!("https://{}/.well-known/jwks.json", self.domain),
        }
    }
}

fn normalize_domain(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    normalize_optional(without_scheme.trim_end_matches('/'))
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_audience(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(normalize_optional)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| values.get(key).cloned()
    }

    #[test]
    fn derives_issuer_and_jwks_uri_from_domain() {
        let config = ProviderConfig::new("tenant.eu.auth0.com", ["api.billable"]).expect("config");
        assert_eq!(config.issuer(), "https://tenant.eu.auth0.com/");
        assert_eq!(
            config.jwks_uri(),
            "https://tenant.eu.auth0.com/.well-known/jwks.json"
        );
        assert_eq!(config.audience(), ["api.billable".to_string()]);
        assert_eq!(config.leeway_seconds, 0);
    }

    #[test]
    fn domain_is_normalised() {
        let config =
            ProviderConfig::new(" https://tenant.auth0.com/ ", ["aud"]).expect("config");
        assert_eq!(config.domain(), "tenant.auth0.com");
    }

    #[test]
    fn missing_domain_is_configuration_error() {
        let err = ProviderConfig::from_lookup(lookup_from(&[(AUDIENCE_ENV, "aud")]))
            .expect_err("domain required");
        assert!(matches!(err, AuthError::Configuration(message) if message.contains(DOMAIN_ENV)));

        let err = ProviderConfig::new("  ", ["aud"]).expect_err("blank domain rejected");
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn missing_audience_is_configuration_error() {
        let err = ProviderConfig::from_lookup(lookup_from(&[(DOMAIN_ENV, "tenant.auth0.com")]))
            .expect_err("audience required");
        assert!(matches!(err, AuthError::Configuration(message) if message.contains(AUDIENCE_ENV)));
    }

    #[test]
    fn audience_list_is_split_on_commas() {
        let config = ProviderConfig::from_lookup(lookup_from(&[
            (DOMAIN_ENV, "tenant.auth0.com"),
            (AUDIENCE_ENV, "api.billable, https://tenant.auth0.com/userinfo,,"),
        ]))
        .expect("config");
        assert_eq!(
            config.audience(),
            [
                "api.billable".to_string(),
                "https://tenant.auth0.com/userinfo".to_string()
            ]
        );
    }

    #[test]
    fn jwks_uri_override_keeps_issuer() {
        let config = ProviderConfig::new("tenant.auth0.com", ["aud"])
            .expect("config")
            .with_jwks_uri("http://127.0.0.1:9999/jwks");
        assert_eq!(config.jwks_uri(), "http://127.0.0.1:9999/jwks");
        assert_eq!(config.issuer(), "https://tenant.auth0.com/");
    }
}
