//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::TaskRepository;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// Build health routes
pub fn routes(repository: Arc<dyn TaskRepository>) -> Router<()> {
    Router::new()
        .route("/health", get(health))
        .with_state(repository)
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health(
    State(repository): State<Arc<dyn TaskRepository>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (status, health, database) = match repository.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
        }
    };

    (
        status,
        Json(HealthResponse {
            status: health,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;

    use crate::api::routes::test_support::{MemoryRepository, send};

    #[tokio::test]
    async fn test_healthy() {
        let repo = Arc::new(MemoryRepository::default());
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(routes(repo), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], "ok");
    }

    #[tokio::test]
    async fn test_database_unreachable() {
        let repo = Arc::new(MemoryRepository {
            unavailable: true,
            ..Default::default()
        });
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(routes(repo), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["database"], "unavailable");
    }
}
