//! Repository trait implementations for PostgreSQL
//!
//! Thin async wrappers that map `PostgresError` into the unified `DataError`.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::filters::{CompiledFilter, FilterRow};
use crate::data::traits::{FilterStore, TaskRepository};
use crate::data::types::{FilterDefinitionRow, FilterInput, ListTasksParams, TaskRow};

use super::PostgresService;
use super::repositories::{filter, task};

#[async_trait]
impl FilterStore for PostgresService {
    async fn fetch_filter_rows(&self, filter_ids: &[i64]) -> Result<Vec<FilterRow>, DataError> {
        filter::fetch_filter_rows(self.pool(), filter_ids)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl TaskRepository for PostgresService {
    async fn ping(&self) -> Result<(), DataError> {
        PostgresService::ping(self).await.map_err(Into::into)
    }

    // ==================== Workspace Operations ====================

    async fn is_workspace_member(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<bool, DataError> {
        task::is_workspace_member(self.pool(), workspace_id, user_id)
            .await
            .map_err(Into::into)
    }

    // ==================== Task Operations ====================

    async fn list_tasks(
        &self,
        params: &ListTasksParams,
        filter: &CompiledFilter,
    ) -> Result<(Vec<TaskRow>, u64), DataError> {
        task::list_tasks(self.pool(), params, filter)
            .await
            .map_err(Into::into)
    }

    // ==================== Filter Operations ====================

    async fn list_filters(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Vec<FilterDefinitionRow>, DataError> {
        filter::list_filters(self.pool(), workspace_id, user_id)
            .await
            .map_err(Into::into)
    }

    async fn owned_filter_ids(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_ids: &[i64],
    ) -> Result<Vec<i64>, DataError> {
        filter::owned_filter_ids(self.pool(), workspace_id, user_id, filter_ids)
            .await
            .map_err(Into::into)
    }

    async fn get_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
    ) -> Result<Option<FilterDefinitionRow>, DataError> {
        filter::get_filter(self.pool(), workspace_id, user_id, filter_id)
            .await
            .map_err(Into::into)
    }

    async fn create_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        input: &FilterInput,
    ) -> Result<FilterDefinitionRow, DataError> {
        filter::create_filter(self.pool(), workspace_id, user_id, input)
            .await
            .map_err(Into::into)
    }

    async fn update_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
        input: &FilterInput,
    ) -> Result<Option<FilterDefinitionRow>, DataError> {
        filter::update_filter(self.pool(), workspace_id, user_id, filter_id, input)
            .await
            .map_err(Into::into)
    }

    async fn delete_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
    ) -> Result<bool, DataError> {
        filter::delete_filter(self.pool(), workspace_id, user_id, filter_id)
            .await
            .map_err(Into::into)
    }
}
