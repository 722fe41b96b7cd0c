//! Session token issuance and verification
//!
//! Tokens are standard three-segment JWTs (header, payload, signature; each
//! base64url-encoded) signed with HMAC-SHA256 over a shared secret.
//!
//! Verification does not look at `exp` unless [`JwtConfig::enforce_expiry`]
//! is set: tokens stay valid past their expiry by default.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use merchio_core::AuthConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signing algorithms accepted on verification
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - user ID
    pub user_id: i64,
    /// Issued at timestamp (Unix epoch); absent in `{user_id, exp}` tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl SessionClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// Token issuance and verification errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Malformed token")]
    Malformed,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token lifetime of {0} seconds is out of range")]
    LifetimeOutOfRange(i64),
}

/// Token configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token lifetime in seconds (default: 86400 = 24 hours)
    pub expiration_secs: i64,
    /// Reject tokens past `exp` on verification
    pub enforce_expiry: bool,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_secs: 24 * 60 * 60,
            enforce_expiry: false,
        }
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiration_secs: config.token_expiration_secs,
            enforce_expiry: config.enforce_expiry,
        }
    }
}

/// Issue a signed session token for `user_id`
///
/// The token expires `config.expiration_secs` after `now`.
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use merchio_api::auth::jwt::{issue_token, verify_token, JwtConfig};
///
/// let config = JwtConfig::new("change-me");
/// let now = Utc::now();
/// let token = issue_token(&config, 1, now).expect("Failed to issue token");
/// let claims = verify_token(&config, &token, now).expect("Invalid token");
/// assert_eq!(claims.user_id, 1);
/// ```
pub fn issue_token(config: &JwtConfig, user_id: i64, now: DateTime<Utc>) -> Result<String, JwtError> {
    let issued_at = now.timestamp();
    let expires_at = issued_at
        .checked_add(config.expiration_secs)
        .ok_or(JwtError::LifetimeOutOfRange(config.expiration_secs))?;
    let claims = SessionClaims {
        user_id,
        iat: Some(issued_at),
        exp: expires_at,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify a session token and extract its claims
///
/// # Errors
///
/// * `Malformed` - wrong segment count, bad base64 or JSON
/// * `UnsupportedAlgorithm` - header declares anything but HS256/HS384/HS512
/// * `InvalidSignature` - signature does not match the secret
/// * `Expired` - only when `enforce_expiry` is set
pub fn verify_token(
    config: &JwtConfig,
    token: &str,
    now: DateTime<Utc>,
) -> Result<SessionClaims, JwtError> {
    let alg = declared_algorithm(token)?;
    match alg.parse::<Algorithm>() {
        Ok(parsed) if HMAC_ALGORITHMS.contains(&parsed) => {}
        _ => return Err(JwtError::UnsupportedAlgorithm(alg)),
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = HMAC_ALGORITHMS.to_vec();
    // Expiry is checked below against the caller's clock
    validation.validate_exp = false;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            JwtError::UnsupportedAlgorithm(alg.clone())
        }
        _ => JwtError::Malformed,
    })?;

    let claims = token_data.claims;
    if config.enforce_expiry && claims.is_expired(now) {
        return Err(JwtError::Expired);
    }

    Ok(claims)
}

/// Read the `alg` header field without trusting the rest of the token
fn declared_algorithm(token: &str) -> Result<String, JwtError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, _, _] = segments.as_slice() else {
        return Err(JwtError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| JwtError::Malformed)?;
    let header: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|_| JwtError::Malformed)?;

    header
        .get("alg")
        .and_then(|alg| alg.as_str())
        .map(str::to_string)
        .ok_or(JwtError::Malformed)
}
