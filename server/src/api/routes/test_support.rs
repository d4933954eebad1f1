//! In-memory repository for handler tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tower::ServiceExt;

use crate::data::DataError;
use crate::data::cache::FilterCache;
use crate::data::filters::{CompiledFilter, FilterQueryCompiler, FilterRow};
use crate::data::traits::{FilterStore, TaskRepository};
use crate::data::types::{
    FilterConditionRow, FilterDefinitionRow, FilterInput, ListTasksParams, TaskRow,
};

#[derive(Default)]
pub struct MemoryRepository {
    pub members: Vec<(String, String)>,
    pub tasks: Vec<TaskRow>,
    pub filters: Mutex<Vec<FilterDefinitionRow>>,
    pub last_filter: Mutex<Option<CompiledFilter>>,
    pub fetches: AtomicUsize,
    pub unavailable: bool,
    pub next_id: AtomicUsize,
}

impl MemoryRepository {
    pub fn with_member(workspace_id: &str, user_id: &str) -> Self {
        Self {
            members: vec![(workspace_id.to_string(), user_id.to_string())],
            next_id: AtomicUsize::new(1),
            ..Default::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn task(id: i64, workspace_id: &str, title: &str) -> TaskRow {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        TaskRow {
            id,
            workspace_id: workspace_id.to_string(),
            title: title.to_string(),
            description: None,
            status: "open".to_string(),
            priority: None,
            view: None,
            category_id: None,
            tag_id: None,
            start_date: None,
            due_date: None,
            completed_at: None,
            created_at: ts,
            updated_at: ts,
            assignees: Vec::new(),
        }
    }

    fn definition(
        &self,
        workspace_id: &str,
        user_id: &str,
        id: i64,
        input: &FilterInput,
    ) -> FilterDefinitionRow {
        FilterDefinitionRow {
            id,
            user_id: user_id.to_string(),
            workspace_id: workspace_id.to_string(),
            name: input.name.clone(),
            view_mode: input.view_mode.clone(),
            operator: input.operator.clone(),
            is_default: input.is_default,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            conditions: input
                .conditions
                .iter()
                .enumerate()
                .map(|(i, c)| FilterConditionRow {
                    id: id * 100 + i as i64,
                    kind: c.kind.clone(),
                    field: c.field.clone(),
                    date_from: c.date_from.clone(),
                    date_to: c.date_to.clone(),
                    operator: c.operator.clone(),
                    values: c.values.clone(),
                    unit: c.unit.clone(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl FilterStore for MemoryRepository {
    async fn fetch_filter_rows(&self, filter_ids: &[i64]) -> Result<Vec<FilterRow>, DataError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(DataError::backend_unavailable("postgres", "connection refused"));
        }

        let filters = self.filters.lock();
        let mut rows = Vec::new();
        for def in filters.iter().filter(|f| filter_ids.contains(&f.id)) {
            if def.conditions.is_empty() {
                rows.push(FilterRow {
                    filter_id: def.id,
                    name: def.name.clone(),
                    operator: def.operator.clone(),
                    condition_id: None,
                    kind: None,
                    field: None,
                    date_from: None,
                    date_to: None,
                    condition_operator: None,
                    values: None,
                    unit: None,
                });
            }
            for c in &def.conditions {
                rows.push(FilterRow {
                    filter_id: def.id,
                    name: def.name.clone(),
                    operator: def.operator.clone(),
                    condition_id: Some(c.id),
                    kind: Some(c.kind.clone()),
                    field: c.field.clone(),
                    date_from: c.date_from.clone(),
                    date_to: c.date_to.clone(),
                    condition_operator: Some(c.operator.clone()),
                    values: Some(c.values.clone()),
                    unit: c.unit.clone(),
                });
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository {
    async fn ping(&self) -> Result<(), DataError> {
        if self.unavailable {
            return Err(DataError::backend_unavailable("postgres", "connection refused"));
        }
        Ok(())
    }

    async fn is_workspace_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<bool, DataError> {
        Ok(self
            .members
            .iter()
            .any(|(ws, user)| ws == workspace_id && user == user_id))
    }

    async fn list_tasks(
        &self,
        params: &ListTasksParams,
        filter: &CompiledFilter,
    ) -> Result<(Vec<TaskRow>, u64), DataError> {
        *self.last_filter.lock() = Some(filter.clone());
        let matching: Vec<TaskRow> = self
            .tasks
            .iter()
            .filter(|t| t.workspace_id == params.workspace_id)
            .cloned()
            .collect();
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_filters(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Vec<FilterDefinitionRow>, DataError> {
        Ok(self
            .filters
            .lock()
            .iter()
            .filter(|f| f.workspace_id == workspace_id && f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn owned_filter_ids(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_ids: &[i64],
    ) -> Result<Vec<i64>, DataError> {
        Ok(self
            .filters
            .lock()
            .iter()
            .filter(|f| {
                filter_ids.contains(&f.id) && f.workspace_id == workspace_id && f.user_id == user_id
            })
            .map(|f| f.id)
            .collect())
    }

    async fn get_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
    ) -> Result<Option<FilterDefinitionRow>, DataError> {
        Ok(self
            .filters
            .lock()
            .iter()
            .find(|f| f.id == filter_id && f.workspace_id == workspace_id && f.user_id == user_id)
            .cloned())
    }

    async fn create_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        input: &FilterInput,
    ) -> Result<FilterDefinitionRow, DataError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64;
        let def = self.definition(workspace_id, user_id, id, input);
        self.filters.lock().push(def.clone());
        Ok(def)
    }

    async fn update_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
        input: &FilterInput,
    ) -> Result<Option<FilterDefinitionRow>, DataError> {
        let updated = self.definition(workspace_id, user_id, filter_id, input);
        let mut filters = self.filters.lock();
        match filters.iter_mut().find(|f| {
            f.id == filter_id && f.workspace_id == workspace_id && f.user_id == user_id
        }) {
            Some(existing) => {
                *existing = updated.clone();
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    async fn delete_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
    ) -> Result<bool, DataError> {
        let mut filters = self.filters.lock();
        let before = filters.len();
        filters.retain(|f| {
            !(f.id == filter_id && f.workspace_id == workspace_id && f.user_id == user_id)
        });
        Ok(filters.len() != before)
    }
}

/// Compiler backed by `repo` with a long TTL
pub fn compiler_for(repo: &Arc<MemoryRepository>) -> FilterQueryCompiler {
    let cache = Arc::new(FilterCache::new(
        Duration::from_secs(300),
        Duration::from_secs(600),
    ));
    FilterQueryCompiler::new(repo.clone(), cache)
}

/// Send a request and decode the JSON body
pub async fn send(
    app: Router,
    request: Request<Body>,
) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
