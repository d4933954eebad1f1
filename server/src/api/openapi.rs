//! OpenAPI specification

use axum::http::header;
use axum::response::{IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{filters, health, tasks};
use crate::api::types::PaginationMeta;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taskdeck API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Task tracking with saved filters"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "tasks", description = "Filtered task listing"),
        (name = "filters", description = "Saved filter definitions")
    ),
    paths(
        health::health,
        tasks::list_tasks,
        filters::list_filters,
        filters::get_filter,
        filters::create_filter,
        filters::update_filter,
        filters::delete_filter,
    ),
    components(schemas(
        PaginationMeta,
        health::HealthResponse,
        tasks::types::TaskDto,
        tasks::types::ListTasksResponse,
        filters::types::FilterDto,
        filters::types::ConditionDto,
        filters::types::ListFiltersResponse,
        filters::types::FilterRequest,
        filters::types::ConditionRequest,
    ))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}
