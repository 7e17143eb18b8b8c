use jsonwebtoken::DecodingKey;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),
    #[error("failed to parse JWKS response: {0}")]
    Decode(String),
    #[error("JWKS does not contain any usable signing keys")]
    NoSigningKeys,
    #[error("unable to find a signing key that matches '{0}'")]
    SigningKeyNotFound(String),
    #[error("too many JWKS requests; try again later")]
    RateLimited,
}

/// RSA signing key published by the provider.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: Option<String>,
    pub key: DecodingKey,
}

#[derive(Clone)]
pub struct JwksFetcher {
    client: Client,
    url: String,
}

impl JwksFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the key set and keep the entries usable for RS256 signatures.
    pub async fn fetch(&self) -> Result<Vec<SigningKey>, JwksError> {
        debug!(url = %self.url, "fetching JWKS");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| JwksError::Fetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!(
                "HTTP {} from {}",
                response.status(),
                self.url
            )));
        }

        let body: JwksResponse = response
            .json()
            .await
            .map_err(|err| JwksError::Decode(err.to_string()))?;

        let keys = signing_keys(body)?;
        debug!(url = %self.url, count = keys.len(), "loaded JWKS signing keys");
        Ok(keys)
    }
}

fn signing_keys(body: JwksResponse) -> Result<Vec<SigningKey>, JwksError> {
    let mut keys = Vec::new();
    for entry in body.keys.into_iter() {
        if !entry.is_rsa_signing_key() {
            debug!(kid = ?entry.kid, kty = ?entry.kty, "skipping non RS256 signing key");
            continue;
        }

        let (Some(modulus), Some(exponent)) = (entry.n.as_deref(), entry.e.as_deref()) else {
            debug!(kid = ?entry.kid, "skipping JWK without RSA components");
            continue;
        };

        let key = match DecodingKey::from_rsa_components(modulus, exponent) {
            Ok(key) => key,
            Err(err) => {
                debug!(kid = ?entry.kid, error = %err, "skipping JWK with malformed RSA components");
                continue;
            }
        };
        keys.push(SigningKey {
            kid: entry.kid,
            key,
        });
    }

    if keys.is_empty() {
        return Err(JwksError::NoSigningKeys);
    }
    Ok(keys)
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Deserialize)]
struct JwkEntry {
    kid: Option<String>,
    kty: Option<String>,
    alg: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

impl JwkEntry {
    fn is_rsa_signing_key(&self) -> bool {
        let signing = matches!(self.key_use.as_deref(), None | Some("sig"));
        let rsa = self.kty.as_deref() == Some("RSA");
        let rs256 = matches!(self.alg.as_deref(), None | Some("RS256"));
        signing && rsa && rs256
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    // 512-bit test modulus; only parsed, never used to verify.
    const MODULUS: &str = "wzfRmEp7meuVuy3ePgdYYdRsbQ1jV1Y5uXbavuCkCMrW7XA5MjSSSUoHd-_gep8_Zd5QunxFws33lVnQ3fccsA";
    const EXPONENT: &str = "AQAB";

    fn fetch_from(body: serde_json::Value) -> Result<Vec<SigningKey>, JwksError> {
        signing_keys(serde_json::from_value(body).expect("jwks body"))
    }

    #[test]
    fn keeps_only_rsa_signing_keys() {
        let keys = fetch_from(json!({
            "keys": [
                { "kid": "sig", "kty": "RSA", "alg": "RS256", "use": "sig", "n": MODULUS, "e": EXPONENT },
                { "kid": "enc", "kty": "RSA", "use": "enc", "n": MODULUS, "e": EXPONENT },
                { "kid": "ec", "kty": "EC", "crv": "P-256", "x": "abc", "y": "def" },
                { "kid": "ps", "kty": "RSA", "alg": "PS256", "n": MODULUS, "e": EXPONENT },
                { "kid": "bare", "kty": "RSA" }
            ]
        }))
        .expect("keys");

        let kids: Vec<_> = keys.iter().filter_map(|key| key.kid.as_deref()).collect();
        assert_eq!(kids, vec!["sig"]);
    }

    #[test]
    fn malformed_entry_does_not_hide_valid_keys() {
        let keys = fetch_from(json!({
            "keys": [
                { "kid": "bad", "kty": "RSA", "alg": "RS256", "n": "!!!not base64!!!", "e": EXPONENT },
                { "kid": "good", "kty": "RSA", "alg": "RS256", "n": MODULUS, "e": EXPONENT }
            ]
        }))
        .expect("keys");

        let kids: Vec<_> = keys.iter().filter_map(|key| key.kid.as_deref()).collect();
        assert_eq!(kids, vec!["good"]);
    }

    #[test]
    fn set_of_only_malformed_keys_is_rejected() {
        let err = fetch_from(json!({
            "keys": [{ "kid": "bad", "kty": "RSA", "n": "!!!", "e": EXPONENT }]
        }))
        .err()
        .expect("no usable keys");
        assert!(matches!(err, JwksError::NoSigningKeys));
    }

    #[test]
    fn empty_set_is_rejected() {
        let err = fetch_from(json!({ "keys": [] })).err().expect("no keys");
        assert!(matches!(err, JwksError::NoSigningKeys));
    }

    #[tokio::test]
    async fn fetch_reports_http_failures() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(502);
        });

        let fetcher = JwksFetcher::new(server.url("/.well-known/jwks.json"));
        let err = fetcher.fetch().await.err().expect("fetch should fail");
        assert!(matches!(err, JwksError::Fetch(message) if message.contains("502")));
    }

    #[tokio::test]
    async fn fetch_reports_malformed_body() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200)
                .header("content-type", "application/json")
                .body("not json");
        });

        let fetcher = JwksFetcher::new(server.url("/.well-known/jwks.json"));
        let err = fetcher.fetch().await.err().expect("fetch should fail");
        assert!(matches!(err, JwksError::Decode(_)));
    }
}
