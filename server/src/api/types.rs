//! Shared API types
//!
//! Common types used across all API endpoints including error handling
//! and pagination.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationError;

use crate::core::constants::{DEFAULT_TASK_PAGE_LIMIT, MAX_TASK_PAGE_LIMIT};
use crate::data::DataError;
use crate::data::filters::FilterError;

/// Maximum page number to prevent expensive OFFSET queries
pub const MAX_PAGE: u32 = 1000;
/// Default page number
pub const DEFAULT_PAGE: u32 = 1;

/// Validator function for page parameter
pub fn validate_page(page: u32) -> Result<(), ValidationError> {
    if page < 1 {
        return Err(ValidationError::new("page_min").with_message("Page must be >= 1".into()));
    }
    if page > MAX_PAGE {
        return Err(ValidationError::new("page_max").with_message(
            format!("Page must be <= {} to prevent expensive queries", MAX_PAGE).into(),
        ));
    }
    Ok(())
}

/// Validator function for limit parameter
pub fn validate_limit(limit: u32) -> Result<(), ValidationError> {
    if limit == 0 || limit > MAX_TASK_PAGE_LIMIT {
        return Err(ValidationError::new("limit_range")
            .with_message(format!("Limit must be between 1 and {}", MAX_TASK_PAGE_LIMIT).into()));
    }
    Ok(())
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Unauthorized { code: String, message: String },
    Forbidden { code: String, message: String },
    Conflict { code: String, message: String },
    ServiceUnavailable { message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn unauthorized(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn from_data(e: DataError) -> Self {
        if let DataError::Conflict(message) = e {
            return Self::conflict("CONFLICT", message);
        }
        if e.is_transient() {
            tracing::warn!(error = %e, backend = e.backend(), "Transient data error");
            return Self::service_unavailable("Database temporarily unavailable");
        }
        tracing::error!(error = %e, "Data error");
        Self::Internal {
            message: "Database operation failed".to_string(),
        }
    }

    /// Filter definitions could not be loaded; never fall back to an unfiltered listing
    pub fn from_filter(e: FilterError) -> Self {
        tracing::error!(error = %e, "Filter compilation failed");
        Self::Internal {
            message: "Failed to load task filters".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, "unauthorized", code, message)
            }
            Self::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, "forbidden", code, message)
            }
            Self::Conflict { code, message } => (StatusCode::CONFLICT, "conflict", code, message),
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                "SERVICE_UNAVAILABLE".to_string(),
                message,
            ),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

pub fn default_page() -> u32 {
    DEFAULT_PAGE
}

pub fn default_limit() -> u32 {
    DEFAULT_TASK_PAGE_LIMIT
}

/// Pagination metadata in response
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u32, limit: u32, total_items: u64) -> Self {
        Self {
            page,
            limit,
            total_items,
            total_pages: total_items.div_ceil(limit.max(1) as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let response = ApiError::bad_request("INVALID_FILTER", "bad").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_request");
        assert_eq!(body["code"], "INVALID_FILTER");
        assert_eq!(body["message"], "bad");
    }

    #[tokio::test]
    async fn test_filter_error_is_internal() {
        let err = FilterError::Storage(DataError::Config("down".into()));
        let response = ApiError::from_filter(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["code"], "INTERNAL");
    }

    #[test]
    fn test_transient_data_error_is_unavailable() {
        let err = ApiError::from_data(DataError::backend_unavailable("postgres", "connection refused"));
        assert!(matches!(err, ApiError::ServiceUnavailable { .. }));
    }

    #[test]
    fn test_conflict_data_error() {
        let err = ApiError::from_data(DataError::Conflict("duplicate".into()));
        assert!(matches!(err, ApiError::Conflict { .. }));
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(2, 50, 101);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(PaginationMeta::new(1, 50, 0).total_pages, 0);
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(50).is_ok());
        assert!(validate_limit(MAX_TASK_PAGE_LIMIT + 1).is_err());
    }

    #[test]
    fn test_validate_page() {
        assert!(validate_page(0).is_err());
        assert!(validate_page(1).is_ok());
        assert!(validate_page(MAX_PAGE + 1).is_err());
    }
}
