//! Authentication module

mod context;
pub mod jwt;
pub mod middleware;

pub use context::AuthContext;
pub use jwt::{SessionClaims, create_session_token, default_session_ttl};
pub use middleware::{AuthError, AuthState, require_auth};
