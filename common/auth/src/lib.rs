pub mod cache;
pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod jwks;
pub mod rate_limit;
pub mod resolver;
pub mod verifier;

pub use cache::SigningKeyCache;
pub use claims::ClaimSet;
pub use config::ProviderConfig;
pub use error::{AuthError, AuthResult};
pub use extractors::AuthContext;
pub use guards::{ensure_scope, GuardError};
pub use jwks::{JwksError, JwksFetcher, SigningKey};
pub use rate_limit::FetchRateLimiter;
pub use resolver::{JwksKeyResolver, KeyResolver};
pub use verifier::{verify_token, verify_token_from_env, TokenVerifier};
