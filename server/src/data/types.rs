//! Shared data types for repositories

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Task as returned by the listing query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub workspace_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: Option<String>,
    pub view: Option<String>,
    pub category_id: Option<i64>,
    pub tag_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assignees: Vec<String>,
}

/// Parameters for task listing
#[derive(Debug, Clone)]
pub struct ListTasksParams {
    pub workspace_id: String,
    pub page: u32,
    pub limit: u32,
}

impl ListTasksParams {
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }
}

/// Persisted filter definition with its conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterDefinitionRow {
    pub id: i64,
    pub user_id: String,
    pub workspace_id: String,
    pub name: String,
    pub view_mode: Option<String>,
    pub operator: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub conditions: Vec<FilterConditionRow>,
}

/// Persisted condition of a filter definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterConditionRow {
    pub id: i64,
    pub kind: String,
    pub field: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub operator: String,
    pub values: Vec<serde_json::Value>,
    pub unit: Option<String>,
}

/// Fields for creating or replacing a filter definition
#[derive(Debug, Clone, Deserialize)]
pub struct FilterInput {
    pub name: String,
    pub view_mode: Option<String>,
    pub operator: String,
    pub is_default: bool,
    pub conditions: Vec<ConditionInput>,
}

/// Fields of one condition in a `FilterInput`
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionInput {
    pub kind: String,
    pub field: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub operator: String,
    pub values: Vec<serde_json::Value>,
    pub unit: Option<String>,
}
