use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Verified claims of an identity provider access token.
///
/// Standard claims are lifted into typed fields; everything the token
/// carried, custom claims included, stays available through [`ClaimSet::get`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimSet {
    pub issuer: String,
    pub subject: String,
    pub audience: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub authorized_party: Option<String>,
    pub scope: Option<String>,
    pub raw: serde_json::Value,
}

impl ClaimSet {
    /// Space-separated `scope` claim split into individual scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|value| value == scope)
    }

    /// Look up any claim by name, including custom namespaced claims.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.raw.get(name)
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    iss: String,
    sub: String,
    #[serde(default)]
    aud: Option<AudienceRepr>,
    #[serde(default)]
    iat: Option<i64>,
    exp: i64,
    #[serde(default)]
    azp: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceRepr {
    Single(String),
    Many(Vec<String>),
}

fn timestamp(claim: &'static str, value: i64) -> AuthResult<DateTime<Utc>> {
    Utc.timestamp_opt(value, 0)
        .single()
        .ok_or_else(|| AuthError::InvalidClaim(claim, value.to_string()))
}

impl TryFrom<ClaimsRepr> for ClaimSet {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let expires_at = timestamp("exp", value.exp)?;
        let issued_at = value.iat.map(|iat| timestamp("iat", iat)).transpose()?;

        let audience = match value.aud {
            Some(AudienceRepr::Single(item)) => vec![item],
            Some(AudienceRepr::Many(items)) => items,
            None => Vec::new(),
        };

        Ok(Self {
            issuer: value.iss,
            subject: value.sub,
            audience,
            issued_at,
            expires_at,
            authorized_party: value.azp,
            scope: value.scope,
            raw: serde_json::Value::Null,
        })
    }
}

impl TryFrom<serde_json::Value> for ClaimSet {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value.clone())
            .map_err(|err| AuthError::InvalidJson(err.to_string()))?;
        let mut claims = ClaimSet::try_from(repr)?;
        claims.raw = value;
        Ok(claims)
    }
}
