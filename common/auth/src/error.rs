use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::errors::ErrorKind;
use serde::Serialize;
use thiserror::Error;

use crate::jwks::JwksError;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider misconfigured: {0}")]
    Configuration(String),
    #[error("failed to decode token header: {0}")]
    InvalidHeader(String),
    #[error("signing key resolution failed: {0}")]
    KeyResolution(#[from] JwksError),
    #[error("token verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),
    #[error("invalid claim '{0}' with value '{1}'")]
    InvalidClaim(&'static str, String),
    #[error("malformed claim payload: {0}")]
    InvalidJson(String),
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
}

impl AuthError {
    /// The `jsonwebtoken` failure kind behind a verification rejection.
    pub fn verification_kind(&self) -> Option<&ErrorKind> {
        match self {
            AuthError::Verification(err) => Some(err.kind()),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::Verification(value)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::MissingAuthorization | AuthError::InvalidAuthorization => {
                (StatusCode::UNAUTHORIZED, "AUTH_HEADER")
            }
            AuthError::InvalidHeader(_) | AuthError::Verification(_) => {
                (StatusCode::UNAUTHORIZED, "AUTH_TOKEN")
            }
            AuthError::InvalidClaim(_, _) | AuthError::InvalidJson(_) => {
                (StatusCode::UNAUTHORIZED, "AUTH_CLAIMS")
            }
            AuthError::KeyResolution(JwksError::SigningKeyNotFound(_)) => {
                (StatusCode::UNAUTHORIZED, "AUTH_KEY")
            }
            AuthError::KeyResolution(_) => (StatusCode::SERVICE_UNAVAILABLE, "AUTH_JWKS"),
            AuthError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_CONFIG"),
        };

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
