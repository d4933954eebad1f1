//! Task API types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::types::{
    ApiError, PaginationMeta, default_limit, default_page, validate_limit, validate_page,
};
use crate::core::constants::{MAX_CONDITIONS_PER_FILTER, MAX_FILTER_IDS_PER_REQUEST};
use crate::data::filters::{CustomFilter, ThresholdOverrides};
use crate::data::types::TaskRow;

/// Task DTO for API responses
#[derive(Debug, Serialize, ToSchema)]
pub struct TaskDto {
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

impl From<TaskRow> for TaskDto {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            view: row.view,
            category_id: row.category_id,
            tag_id: row.tag_id,
            start_date: row.start_date,
            due_date: row.due_date,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            assignees: row.assignees,
        }
    }
}

/// Paginated task listing
#[derive(Debug, Serialize, ToSchema)]
pub struct ListTasksResponse {
    pub data: Vec<TaskDto>,
    pub meta: PaginationMeta,
}

/// Query params for listing tasks
#[derive(Debug, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListTasksQuery {
    #[serde(default = "default_page")]
    #[validate(custom(function = "validate_page"))]
    pub page: u32,

    #[serde(default = "default_limit")]
    #[validate(custom(function = "validate_limit"))]
    pub limit: u32,

    /// Comma-separated ids of saved filters to apply
    pub filter_ids: Option<String>,

    /// JSON array of ad hoc filters: `[{"name", "logic", "conditions": [...]}]`
    pub custom_filters: Option<String>,

    /// JSON object of date_diff threshold overrides keyed by normalized filter name
    pub thresholds: Option<String>,
}

impl ListTasksQuery {
    /// Parse `filter_ids` into a list of positive ids
    pub fn parse_filter_ids(&self) -> Result<Vec<i64>, ApiError> {
        let Some(raw) = self.filter_ids.as_deref() else {
            return Ok(Vec::new());
        };

        let ids = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>().ok().filter(|id| *id > 0).ok_or_else(|| {
                    ApiError::bad_request(
                        "INVALID_FILTER_IDS",
                        format!("Invalid filter id: {}", s),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if ids.len() > MAX_FILTER_IDS_PER_REQUEST {
            return Err(ApiError::bad_request(
                "TOO_MANY_FILTERS",
                format!(
                    "At most {} filters may be applied at once",
                    MAX_FILTER_IDS_PER_REQUEST
                ),
            ));
        }

        Ok(ids)
    }

    /// Parse `custom_filters` JSON
    pub fn parse_custom_filters(&self) -> Result<Vec<CustomFilter>, ApiError> {
        let Some(raw) = self.custom_filters.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(Vec::new());
        };

        let filters: Vec<CustomFilter> = serde_json::from_str(raw).map_err(|e| {
            ApiError::bad_request(
                "INVALID_CUSTOM_FILTERS",
                format!("custom_filters must be a JSON array of filters: {}", e),
            )
        })?;

        if filters.len() > MAX_FILTER_IDS_PER_REQUEST {
            return Err(ApiError::bad_request(
                "TOO_MANY_FILTERS",
                format!(
                    "At most {} custom filters may be applied at once",
                    MAX_FILTER_IDS_PER_REQUEST
                ),
            ));
        }
        if filters
            .iter()
            .any(|f| f.conditions.len() > MAX_CONDITIONS_PER_FILTER)
        {
            return Err(ApiError::bad_request(
                "TOO_MANY_CONDITIONS",
                format!(
                    "A filter may have at most {} conditions",
                    MAX_CONDITIONS_PER_FILTER
                ),
            ));
        }

        Ok(filters)
    }

    /// Parse `thresholds` JSON
    pub fn parse_thresholds(&self) -> Result<ThresholdOverrides, ApiError> {
        let Some(raw) = self.thresholds.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(ThresholdOverrides::new());
        };

        let map: std::collections::HashMap<String, i64> =
            serde_json::from_str(raw).map_err(|e| {
                ApiError::bad_request(
                    "INVALID_THRESHOLDS",
                    format!("thresholds must be a JSON object of day counts: {}", e),
                )
            })?;

        if let Some((key, _)) = map.iter().find(|(_, days)| **days < 0) {
            return Err(ApiError::bad_request(
                "INVALID_THRESHOLDS",
                format!("Threshold for '{}' must not be negative", key),
            ));
        }

        Ok(map.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::data::filters::{CombiningOperator, Field};

    fn query() -> ListTasksQuery {
        ListTasksQuery {
            page: 1,
            limit: 50,
            filter_ids: None,
            custom_filters: None,
            thresholds: None,
        }
    }

    #[test]
    fn test_parse_filter_ids() {
        let mut q = query();
        assert!(q.parse_filter_ids().unwrap().is_empty());

        q.filter_ids = Some("3, 1,,7".into());
        assert_eq!(q.parse_filter_ids().unwrap(), vec![3, 1, 7]);

        q.filter_ids = Some("1,abc".into());
        assert!(q.parse_filter_ids().is_err());

        q.filter_ids = Some("-4".into());
        assert!(q.parse_filter_ids().is_err());
    }

    #[test]
    fn test_too_many_filter_ids() {
        let mut q = query();
        let ids: Vec<String> = (1..=(MAX_FILTER_IDS_PER_REQUEST as i64 + 1))
            .map(|i| i.to_string())
            .collect();
        q.filter_ids = Some(ids.join(","));
        assert!(matches!(
            q.parse_filter_ids(),
            Err(ApiError::BadRequest { code, .. }) if code == "TOO_MANY_FILTERS"
        ));
    }

    #[test]
    fn test_parse_custom_filters() {
        let mut q = query();
        q.custom_filters = Some(
            r#"[{"name":"Mine","logic":"OR","conditions":[
                {"kind":"list","field":"assignee","operator":"IN","values":["current_user_id"]},
                {"kind":"list","field":"status","operator":"=","values":["open"]}
            ]}]"#
                .into(),
        );
        let filters = q.parse_custom_filters().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].logic, CombiningOperator::Or);
        assert_eq!(filters[0].conditions[0].field, Field::Assignee);
    }

    #[test]
    fn test_malformed_custom_filters() {
        let mut q = query();
        q.custom_filters = Some("{not json".into());
        assert!(matches!(
            q.parse_custom_filters(),
            Err(ApiError::BadRequest { code, .. }) if code == "INVALID_CUSTOM_FILTERS"
        ));
    }

    #[test]
    fn test_parse_thresholds() {
        let mut q = query();
        assert!(q.parse_thresholds().unwrap().is_empty());

        q.thresholds = Some(r#"{"unchanged_in_past_14_days": 3}"#.into());
        let overrides = q.parse_thresholds().unwrap();
        assert_eq!(overrides.lookup("Unchanged in past 14 days"), Some(3));

        q.thresholds = Some(r#"{"stale": -1}"#.into());
        assert!(q.parse_thresholds().is_err());

        q.thresholds = Some(r#"["stale"]"#.into());
        assert!(q.parse_thresholds().is_err());
    }

    #[test]
    fn test_limit_validation() {
        let mut q = query();
        assert!(q.validate().is_ok());
        q.limit = 0;
        assert!(q.validate().is_err());
    }
}
