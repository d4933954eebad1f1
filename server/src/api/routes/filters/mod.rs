//! Saved filter API endpoints
//!
//! Filter definitions are private to a user within a workspace. Every
//! mutation drops all cached definitions so the next task listing sees it.

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use types::{FilterDto, FilterRequest, ListFiltersResponse};

use super::require_workspace_member;
use crate::api::auth::AuthContext;
use crate::api::extractors::{FilterPath, ValidatedJson, WorkspacePath};
use crate::api::types::ApiError;
use crate::data::TaskRepository;
use crate::data::filters::FilterQueryCompiler;

/// Shared state for Filter API endpoints
#[derive(Clone)]
pub struct FiltersApiState {
    pub repository: Arc<dyn TaskRepository>,
    pub compiler: FilterQueryCompiler,
}

impl FiltersApiState {
    fn invalidate_cache(&self) {
        self.compiler.cache().invalidate_all();
    }
}

/// Build Filter API routes
pub fn routes(repository: Arc<dyn TaskRepository>, compiler: FilterQueryCompiler) -> Router<()> {
    let state = FiltersApiState {
        repository,
        compiler,
    };

    Router::new()
        .route(
            "/workspaces/{workspace_id}/filters",
            get(list_filters).post(create_filter),
        )
        .route(
            "/workspaces/{workspace_id}/filters/{filter_id}",
            get(get_filter).put(update_filter).delete(delete_filter),
        )
        .with_state(state)
}

fn filter_not_found(filter_id: i64) -> ApiError {
    ApiError::not_found(
        "FILTER_NOT_FOUND",
        format!("Filter not found: {}", filter_id),
    )
}

/// List the caller's saved filters in a workspace
#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{workspace_id}/filters",
    tag = "filters",
    params(("workspace_id" = String, Path, description = "Workspace ID")),
    responses(
        (status = 200, description = "Saved filters", body = ListFiltersResponse),
        (status = 403, description = "Not a member of the workspace")
    )
)]
pub async fn list_filters(
    State(state): State<FiltersApiState>,
    auth: AuthContext,
    path: WorkspacePath,
) -> Result<Json<ListFiltersResponse>, ApiError> {
    require_workspace_member(state.repository.as_ref(), &path.workspace_id, auth.user_id())
        .await?;

    let rows = state
        .repository
        .list_filters(&path.workspace_id, auth.user_id())
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(ListFiltersResponse {
        data: rows.into_iter().map(FilterDto::from).collect(),
    }))
}

/// Get one saved filter
#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{workspace_id}/filters/{filter_id}",
    tag = "filters",
    params(
        ("workspace_id" = String, Path, description = "Workspace ID"),
        ("filter_id" = i64, Path, description = "Filter ID")
    ),
    responses(
        (status = 200, description = "Saved filter", body = FilterDto),
        (status = 404, description = "Filter not found")
    )
)]
pub async fn get_filter(
    State(state): State<FiltersApiState>,
    auth: AuthContext,
    path: FilterPath,
) -> Result<Json<FilterDto>, ApiError> {
    require_workspace_member(state.repository.as_ref(), &path.workspace_id, auth.user_id())
        .await?;

    let row = state
        .repository
        .get_filter(&path.workspace_id, auth.user_id(), path.filter_id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| filter_not_found(path.filter_id))?;

    Ok(Json(row.into()))
}

/// Create a saved filter
#[utoipa::path(
    post,
    path = "/api/v1/workspaces/{workspace_id}/filters",
    tag = "filters",
    params(("workspace_id" = String, Path, description = "Workspace ID")),
    request_body = FilterRequest,
    responses(
        (status = 201, description = "Filter created", body = FilterDto),
        (status = 400, description = "Unknown kind, field, operator or unit")
    )
)]
pub async fn create_filter(
    State(state): State<FiltersApiState>,
    auth: AuthContext,
    path: WorkspacePath,
    ValidatedJson(request): ValidatedJson<FilterRequest>,
) -> Result<(StatusCode, Json<FilterDto>), ApiError> {
    let input = request.into_input()?;
    require_workspace_member(state.repository.as_ref(), &path.workspace_id, auth.user_id())
        .await?;

    let row = state
        .repository
        .create_filter(&path.workspace_id, auth.user_id(), &input)
        .await
        .map_err(ApiError::from_data)?;
    state.invalidate_cache();

    tracing::debug!(filter_id = row.id, workspace_id = %path.workspace_id, "Filter created");
    Ok((StatusCode::CREATED, Json(row.into())))
}

/// Replace a saved filter and its conditions
#[utoipa::path(
    put,
    path = "/api/v1/workspaces/{workspace_id}/filters/{filter_id}",
    tag = "filters",
    params(
        ("workspace_id" = String, Path, description = "Workspace ID"),
        ("filter_id" = i64, Path, description = "Filter ID")
    ),
    request_body = FilterRequest,
    responses(
        (status = 200, description = "Filter updated", body = FilterDto),
        (status = 404, description = "Filter not found")
    )
)]
pub async fn update_filter(
    State(state): State<FiltersApiState>,
    auth: AuthContext,
    path: FilterPath,
    ValidatedJson(request): ValidatedJson<FilterRequest>,
) -> Result<Json<FilterDto>, ApiError> {
    let input = request.into_input()?;
    require_workspace_member(state.repository.as_ref(), &path.workspace_id, auth.user_id())
        .await?;

    let row = state
        .repository
        .update_filter(&path.workspace_id, auth.user_id(), path.filter_id, &input)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(|| filter_not_found(path.filter_id))?;
    state.invalidate_cache();

    Ok(Json(row.into()))
}

/// Delete a saved filter
#[utoipa::path(
    delete,
    path = "/api/v1/workspaces/{workspace_id}/filters/{filter_id}",
    tag = "filters",
    params(
        ("workspace_id" = String, Path, description = "Workspace ID"),
        ("filter_id" = i64, Path, description = "Filter ID")
    ),
    responses(
        (status = 204, description = "Filter deleted"),
        (status = 404, description = "Filter not found")
    )
)]
pub async fn delete_filter(
    State(state): State<FiltersApiState>,
    auth: AuthContext,
    path: FilterPath,
) -> Result<StatusCode, ApiError> {
    require_workspace_member(state.repository.as_ref(), &path.workspace_id, auth.user_id())
        .await?;

    let deleted = state
        .repository
        .delete_filter(&path.workspace_id, auth.user_id(), path.filter_id)
        .await
        .map_err(ApiError::from_data)?;
    if !deleted {
        return Err(filter_not_found(path.filter_id));
    }
    state.invalidate_cache();

    Ok(StatusCode::NO_CONTENT)
}
