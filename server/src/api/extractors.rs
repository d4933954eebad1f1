//! Path and validation extractors for API routes

use std::ops::Deref;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Validate workspace_id: 1-64 chars, alphanumeric + dash/underscore
pub fn is_valid_workspace_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Raw path extractor for workspace-scoped routes (internal use)
#[derive(Debug, Deserialize)]
struct WorkspacePathRaw {
    workspace_id: String,
}

/// Validated workspace path extractor.
///
/// Returns a 400 Bad Request if `workspace_id` is malformed.
#[derive(Debug)]
pub struct WorkspacePath {
    pub workspace_id: String,
}

impl<S> FromRequestParts<S> for WorkspacePath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<WorkspacePathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_workspace_id(&raw.workspace_id) {
            return Err(ValidationRejection::InvalidWorkspaceId);
        }

        Ok(Self {
            workspace_id: raw.workspace_id,
        })
    }
}

/// Raw path extractor for filter routes (internal use)
#[derive(Debug, Deserialize)]
struct FilterPathRaw {
    workspace_id: String,
    filter_id: String,
}

/// Validated filter path extractor
#[derive(Debug)]
pub struct FilterPath {
    pub workspace_id: String,
    pub filter_id: i64,
}

impl<S> FromRequestParts<S> for FilterPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<FilterPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_workspace_id(&raw.workspace_id) {
            return Err(ValidationRejection::InvalidWorkspaceId);
        }
        let filter_id = raw
            .filter_id
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(ValidationRejection::InvalidFilterId)?;

        Ok(Self {
            workspace_id: raw.workspace_id,
            filter_id,
        })
    }
}

/// Validation rejection with structured error response
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Invalid workspace_id format
    InvalidWorkspaceId,
    /// Invalid filter_id format
    InvalidFilterId,
    /// Failed to parse query string
    Query(QueryRejection),
    /// Failed to parse JSON body
    Json(JsonRejection),
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            Self::Path(rejection) => ("PATH_PARSE_ERROR", rejection.body_text()),
            Self::InvalidWorkspaceId => (
                "INVALID_WORKSPACE_ID",
                "Invalid workspace_id: must be 1-64 alphanumeric chars, dashes, or underscores"
                    .to_string(),
            ),
            Self::InvalidFilterId => (
                "INVALID_FILTER_ID",
                "Invalid filter_id: must be a positive integer".to_string(),
            ),
            Self::Query(rejection) => ("QUERY_PARSE_ERROR", rejection.body_text()),
            Self::Json(rejection) => ("JSON_PARSE_ERROR", rejection.body_text()),
            Self::Validation(errors) => ("VALIDATION_ERROR", format_validation_errors(&errors)),
        };
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "bad_request",
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field))
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

/// Query extractor with automatic validation.
///
/// Deserializes query parameters and validates them using the `validator` crate.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T> Deref for ValidatedQuery<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Query)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}

/// JSON body extractor with automatic validation.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T> Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Json)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}
