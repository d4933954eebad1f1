//! Repository traits
//!
//! The filter compiler and the API layer depend on these traits rather than
//! on a concrete database service, so both can be exercised with in-memory
//! implementations.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::filters::{CompiledFilter, FilterRow};
use crate::data::types::{FilterDefinitionRow, FilterInput, ListTasksParams, TaskRow};

/// Bulk read of filter definitions for the compiler
#[async_trait]
pub trait FilterStore: Send + Sync {
    /// Fetch every definition in `filter_ids` left-joined with its conditions.
    ///
    /// A definition without conditions is returned once with all condition
    /// columns empty. Unknown ids are simply absent from the result.
    async fn fetch_filter_rows(&self, filter_ids: &[i64]) -> Result<Vec<FilterRow>, DataError>;
}

/// Task and filter persistence used by the HTTP handlers
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Check the backing store is reachable
    async fn ping(&self) -> Result<(), DataError>;

    // ==================== Workspace Operations ====================

    /// Check whether a user belongs to a workspace
    async fn is_workspace_member(&self, workspace_id: &str, user_id: &str)
    -> Result<bool, DataError>;

    // ==================== Task Operations ====================

    /// List tasks of a workspace narrowed by a compiled filter.
    ///
    /// The filter must have been compiled with
    /// `start_index = TASK_FILTER_START_INDEX`.
    async fn list_tasks(
        &self,
        params: &ListTasksParams,
        filter: &CompiledFilter,
    ) -> Result<(Vec<TaskRow>, u64), DataError>;

    // ==================== Filter Operations ====================

    /// List a user's filter definitions in a workspace
    async fn list_filters(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Vec<FilterDefinitionRow>, DataError>;

    /// Which of `filter_ids` belong to the user in the workspace
    async fn owned_filter_ids(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_ids: &[i64],
    ) -> Result<Vec<i64>, DataError>;

    /// Get one filter definition owned by the user
    async fn get_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
    ) -> Result<Option<FilterDefinitionRow>, DataError>;

    /// Create a filter definition with its conditions
    async fn create_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        input: &FilterInput,
    ) -> Result<FilterDefinitionRow, DataError>;

    /// Replace a filter definition and its conditions
    async fn update_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
        input: &FilterInput,
    ) -> Result<Option<FilterDefinitionRow>, DataError>;

    /// Delete a filter definition (conditions cascade)
    async fn delete_filter(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter_id: i64,
    ) -> Result<bool, DataError>;
}
