//! Task API endpoints

pub mod types;

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use types::{ListTasksQuery, ListTasksResponse, TaskDto};

use super::require_workspace_member;
use crate::api::auth::AuthContext;
use crate::api::extractors::{ValidatedQuery, WorkspacePath};
use crate::api::types::{ApiError, PaginationMeta};
use crate::data::TaskRepository;
use crate::data::filters::{FilterQuery, FilterQueryCompiler};
use crate::data::postgres::repositories::TASK_FILTER_START_INDEX;
use crate::data::types::ListTasksParams;

/// Shared state for Task API endpoints
#[derive(Clone)]
pub struct TasksApiState {
    pub repository: Arc<dyn TaskRepository>,
    pub compiler: FilterQueryCompiler,
}

/// Build Task API routes
pub fn routes(repository: Arc<dyn TaskRepository>, compiler: FilterQueryCompiler) -> Router<()> {
    let state = TasksApiState {
        repository,
        compiler,
    };

    Router::new()
        .route("/workspaces/{workspace_id}/tasks", get(list_tasks))
        .with_state(state)
}

/// List tasks narrowed by saved and ad hoc filters
#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{workspace_id}/tasks",
    tag = "tasks",
    params(
        ("workspace_id" = String, Path, description = "Workspace ID"),
        ListTasksQuery
    ),
    responses(
        (status = 200, description = "Paginated tasks", body = ListTasksResponse),
        (status = 400, description = "Invalid filter parameters"),
        (status = 403, description = "Not a member of the workspace"),
        (status = 404, description = "A saved filter is not owned by the caller"),
        (status = 500, description = "Filter definitions could not be loaded")
    )
)]
pub async fn list_tasks(
    State(state): State<TasksApiState>,
    auth: AuthContext,
    path: WorkspacePath,
    ValidatedQuery(query): ValidatedQuery<ListTasksQuery>,
) -> Result<Json<ListTasksResponse>, ApiError> {
    let filter_ids = query.parse_filter_ids()?;
    let custom_filters = query.parse_custom_filters()?;
    let threshold_overrides = query.parse_thresholds()?;

    require_workspace_member(state.repository.as_ref(), &path.workspace_id, auth.user_id())
        .await?;
    require_owned_filters(
        state.repository.as_ref(),
        &path.workspace_id,
        auth.user_id(),
        &filter_ids,
    )
    .await?;

    let compiled = state
        .compiler
        .compile(&FilterQuery {
            filter_ids,
            custom_filters,
            user_id: auth.user_id().to_string(),
            threshold_overrides,
            start_index: TASK_FILTER_START_INDEX,
        })
        .await
        .map_err(ApiError::from_filter)?;

    let params = ListTasksParams {
        workspace_id: path.workspace_id,
        page: query.page,
        limit: query.limit,
    };
    let (rows, total) = state
        .repository
        .list_tasks(&params, &compiled)
        .await
        .map_err(ApiError::from_data)?;

    Ok(Json(ListTasksResponse {
        data: rows.into_iter().map(TaskDto::from).collect(),
        meta: PaginationMeta::new(query.page, query.limit, total),
    }))
}

/// Saved filters may only be applied by the user who owns them
async fn require_owned_filters(
    repository: &dyn TaskRepository,
    workspace_id: &str,
    user_id: &str,
    filter_ids: &[i64],
) -> Result<(), ApiError> {
    if filter_ids.is_empty() {
        return Ok(());
    }
    let owned = repository
        .owned_filter_ids(workspace_id, user_id, filter_ids)
        .await
        .map_err(ApiError::from_data)?;
    let missing: Vec<i64> = filter_ids
        .iter()
        .copied()
        .filter(|id| !owned.contains(id))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    tracing::debug!(workspace_id, user_id, ?missing, "Rejected filters not owned by user");
    Err(ApiError::not_found(
        "FILTER_NOT_FOUND",
        format!("Filters not found: {:?}", missing),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn_with_state;

    use crate::api::auth::{AuthState, require_auth};
    use crate::api::middleware::AllowedOrigins;
    use crate::api::routes::test_support::{MemoryRepository, compiler_for, send};
    use crate::data::filters::SqlValue;
    use crate::data::types::{ConditionInput, FilterInput};

    fn app(repo: Arc<MemoryRepository>) -> Router {
        let compiler = compiler_for(&repo);
        routes(repo, compiler).layer(from_fn_with_state(
            AuthState::new(false, None, AllowedOrigins::new("127.0.0.1", 5390)),
            require_auth,
        ))
    }

    fn request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn seed_filter(repo: &MemoryRepository, name: &str, conditions: Vec<ConditionInput>) -> i64 {
        let input = FilterInput {
            name: name.to_string(),
            view_mode: None,
            operator: "AND".to_string(),
            is_default: false,
            conditions,
        };
        repo.create_filter("default", "local", &input).await.unwrap().id
    }

    fn status_condition(value: &str) -> ConditionInput {
        ConditionInput {
            kind: "list".to_string(),
            field: Some("status".to_string()),
            date_from: None,
            date_to: None,
            operator: "=".to_string(),
            values: vec![serde_json::json!(value)],
            unit: None,
        }
    }

    #[tokio::test]
    async fn test_list_without_filters() {
        let mut repo = MemoryRepository::with_member("default", "local");
        repo.tasks = vec![
            MemoryRepository::task(1, "default", "Write docs"),
            MemoryRepository::task(2, "default", "Ship release"),
        ];
        let repo = Arc::new(repo);

        let (status, body) = send(app(repo.clone()), request("/workspaces/default/tasks")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["meta"]["total_items"], 2);
        assert_eq!(body["meta"]["page"], 1);

        let filter = repo.last_filter.lock().clone().unwrap();
        assert!(filter.predicate.is_none());
        assert_eq!(filter.next_index, TASK_FILTER_START_INDEX);
        assert_eq!(repo.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_saved_filter_compiled_after_workspace_placeholder() {
        let repo = Arc::new(MemoryRepository::with_member("default", "local"));
        let id = seed_filter(&repo, "Open", vec![status_condition("open")]).await;

        let uri = format!("/workspaces/default/tasks?filter_ids={}", id);
        let (status, _) = send(app(repo.clone()), request(&uri)).await;
        assert_eq!(status, StatusCode::OK);

        let filter = repo.last_filter.lock().clone().unwrap();
        assert_eq!(filter.predicate.as_deref(), Some("(t.status = $2)"));
        assert_eq!(filter.values, vec![SqlValue::Text("open".into())]);
        assert_eq!(filter.next_index, 3);
    }

    #[tokio::test]
    async fn test_custom_filter_binds_current_user() {
        let repo = Arc::new(MemoryRepository::with_member("default", "local"));
        let custom = r#"[{"name":"Mine","conditions":[{"kind":"list","field":"assignee","operator":"IN","values":["current_user_id"]}]}]"#;
        let uri = format!(
            "/workspaces/default/tasks?custom_filters={}",
            urlencode(custom)
        );

        let (status, _) = send(app(repo.clone()), request(&uri)).await;
        assert_eq!(status, StatusCode::OK);

        let filter = repo.last_filter.lock().clone().unwrap();
        let predicate = filter.predicate.unwrap();
        assert!(predicate.contains("EXISTS"), "{}", predicate);
        assert_eq!(
            filter.values,
            vec![SqlValue::TextArray(vec!["local".to_string()])]
        );
        assert_eq!(repo.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_non_member_is_forbidden() {
        let repo = Arc::new(MemoryRepository::with_member("other", "local"));
        let (status, body) = send(app(repo.clone()), request("/workspaces/default/tasks")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "ACCESS_DENIED");
        assert!(repo.last_filter.lock().is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_is_500_not_unfiltered() {
        let repo = Arc::new(MemoryRepository {
            unavailable: true,
            ..MemoryRepository::with_member("default", "local")
        });
        let id = seed_filter(&repo, "Open", vec![status_condition("open")]).await;
        let uri = format!("/workspaces/default/tasks?filter_ids={}", id);
        let (status, body) = send(app(repo.clone()), request(&uri)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL");
        assert!(repo.last_filter.lock().is_none());
    }

    #[tokio::test]
    async fn test_other_users_filter_is_not_applied() {
        let mut repo = MemoryRepository::with_member("default", "local");
        repo.members.push(("default".to_string(), "bob".to_string()));
        let repo = Arc::new(repo);
        let input = FilterInput {
            name: "Bob's".to_string(),
            view_mode: None,
            operator: "AND".to_string(),
            is_default: false,
            conditions: vec![status_condition("done")],
        };
        let foreign = repo.create_filter("default", "bob", &input).await.unwrap().id;
        let own = seed_filter(&repo, "Open", vec![status_condition("open")]).await;

        let uri = format!("/workspaces/default/tasks?filter_ids={},{}", own, foreign);
        let (status, body) = send(app(repo.clone()), request(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "FILTER_NOT_FOUND");
        assert!(repo.last_filter.lock().is_none());
        assert_eq!(repo.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_filter_ids() {
        let repo = Arc::new(MemoryRepository::with_member("default", "local"));
        let (status, body) = send(app(repo), request("/workspaces/default/tasks?filter_ids=1,x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_FILTER_IDS");
    }

    #[tokio::test]
    async fn test_invalid_limit() {
        let repo = Arc::new(MemoryRepository::with_member("default", "local"));
        let (status, body) = send(app(repo), request("/workspaces/default/tasks?limit=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_invalid_workspace_id() {
        let repo = Arc::new(MemoryRepository::with_member("default", "local"));
        let (status, body) = send(app(repo), request("/workspaces/bad%20id/tasks")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_WORKSPACE_ID");
    }

    fn urlencode(s: &str) -> String {
        s.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                _ => format!("%{:02X}", b),
            })
            .collect()
    }
}
