//! Authentication context injected by the auth middleware

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::types::ApiError;

/// Identity of the caller for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// User authenticated with a session token
    Session { user_id: String },
    /// Local default user (--no-auth mode)
    LocalDefault { user_id: String },
}

impl AuthContext {
    pub fn user_id(&self) -> &str {
        match self {
            Self::Session { user_id } | Self::LocalDefault { user_id } => user_id,
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::internal("Auth context not available"))
    }
}
