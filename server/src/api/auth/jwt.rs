//! Session tokens (HS256 JWT)

use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::constants::DEFAULT_SESSION_TTL_DAYS;

/// Session token validation error
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("Session token has expired")]
    Expired,

    #[error("Invalid session token signature")]
    InvalidSignature,

    #[error("Invalid session token: {0}")]
    Invalid(String),
}

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl SessionClaims {
    pub fn new(user_id: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Default lifetime of a session token
pub fn default_session_ttl() -> Duration {
    Duration::days(DEFAULT_SESSION_TTL_DAYS as i64)
}

/// Sign a session token for `user_id`
pub fn create_session_token(signing_key: &[u8], user_id: &str, ttl: Duration) -> Result<String> {
    let claims = SessionClaims::new(user_id, ttl);
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| anyhow!("Failed to create session token: {}", e))
}

/// Validate a session token and return its claims
pub fn validate_session_token(token: &str, signing_key: &[u8]) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;

    let data = decode::<SessionClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            _ => JwtError::Invalid(e.to_string()),
        })?;

    if data.claims.sub.is_empty() {
        return Err(JwtError::Invalid("empty subject".to_string()));
    }

    Ok(data.claims)
}
