//! Authentication middleware

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::context::AuthContext;
use super::jwt::{JwtError, validate_session_token};
use crate::api::middleware::AllowedOrigins;
use crate::core::constants::{LOCAL_DEFAULT_USER_ID, SESSION_COOKIE_NAME};

/// Authentication error response
#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl AuthError {
    pub fn required() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "AUTH_REQUIRED",
            message: "Authentication required".to_string(),
        }
    }

    pub fn expired() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "TOKEN_EXPIRED",
            message: "Session has expired".to_string(),
        }
    }

    pub fn invalid() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "TOKEN_INVALID",
            message: "Invalid session token".to_string(),
        }
    }

    pub fn origin_not_allowed() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "ORIGIN_NOT_ALLOWED",
            message: "Request origin not allowed".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": "unauthorized",
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Shared auth state for the middleware
#[derive(Clone)]
pub struct AuthState {
    pub enabled: bool,
    pub signing_key: Arc<[u8]>,
    pub allowed_origins: AllowedOrigins,
}

impl AuthState {
    pub fn new(
        enabled: bool,
        session_secret: Option<&str>,
        allowed_origins: AllowedOrigins,
    ) -> Self {
        if enabled {
            tracing::debug!("Authentication enabled");
        } else {
            tracing::warn!("Authentication DISABLED");
        }
        Self {
            enabled,
            signing_key: Arc::from(session_secret.unwrap_or_default().as_bytes()),
            allowed_origins,
        }
    }
}

/// Bearer token from the Authorization header, if any
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
///
/// With auth disabled every request runs as the local default user.
/// Otherwise a session token is read from the `Authorization: Bearer` header,
/// falling back to the session cookie. Cookie-authenticated requests from a
/// browser must come from an allowed origin. Injects `AuthContext` into
/// request extensions.
pub async fn require_auth(
    State(state): State<AuthState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !state.enabled {
        request.extensions_mut().insert(AuthContext::LocalDefault {
            user_id: LOCAL_DEFAULT_USER_ID.to_string(),
        });
        return Ok(next.run(request).await);
    }

    let token = match bearer_token(&request) {
        Some(token) => token.to_string(),
        None => {
            if let Some(origin) = request
                .headers()
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok())
                && !state.allowed_origins.is_allowed(origin)
            {
                tracing::warn!(origin, "Rejected request from disallowed origin");
                return Err(AuthError::origin_not_allowed());
            }
            jar.get(SESSION_COOKIE_NAME)
                .map(|c| c.value().to_string())
                .ok_or_else(AuthError::required)?
        }
    };

    let claims = validate_session_token(&token, &state.signing_key).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        match e {
            JwtError::Expired => AuthError::expired(),
            _ => AuthError::invalid(),
        }
    })?;

    request.extensions_mut().insert(AuthContext::Session {
        user_id: claims.sub,
    });

    Ok(next.run(request).await)
}
