//! Filter compiler types
//!
//! Defines the flat storage row shape, the grouped definition/condition
//! structures the compiler works on, and the compile request/result.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fields::{CombiningOperator, ConditionKind, Field, Operator};
use super::params::SqlValue;
use crate::data::error::DataError;

/// One row of the bulk definition fetch.
///
/// Definitions are left-joined with their conditions, so a definition
/// without conditions appears once with every condition column empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRow {
    pub filter_id: i64,
    pub name: String,
    pub operator: String,
    pub condition_id: Option<i64>,
    pub kind: Option<String>,
    pub field: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub condition_operator: Option<String>,
    pub values: Option<Vec<serde_json::Value>>,
    pub unit: Option<String>,
}

/// One atomic test inside a filter
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterCondition {
    #[serde(rename = "type", alias = "kind", default)]
    pub kind: ConditionKind,
    #[serde(default)]
    pub field: Field,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
    #[serde(default)]
    pub date_from: Option<Field>,
    #[serde(default)]
    pub date_to: Option<Field>,
    #[serde(default)]
    pub unit: Option<String>,
}

impl FilterCondition {
    /// Build a condition from a fetched row; `None` for condition-less rows
    pub fn from_row(row: &FilterRow) -> Option<Self> {
        row.condition_id?;
        Some(Self {
            kind: row
                .kind
                .as_deref()
                .map(ConditionKind::parse)
                .unwrap_or_default(),
            field: row.field.as_deref().map(Field::parse).unwrap_or_default(),
            operator: row
                .condition_operator
                .as_deref()
                .map(Operator::parse)
                .unwrap_or_default(),
            values: row.values.clone().unwrap_or_default(),
            date_from: row.date_from.as_deref().map(Field::parse),
            date_to: row.date_to.as_deref().map(Field::parse),
            unit: row.unit.clone(),
        })
    }
}

/// A persisted filter regrouped from its flat rows
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    pub id: i64,
    pub name: String,
    pub operator: CombiningOperator,
    pub conditions: Vec<FilterCondition>,
}

/// Regroup flat rows into definitions, keeping first-appearance order
pub fn group_rows(rows: &[FilterRow]) -> Vec<FilterGroup> {
    let mut groups: Vec<FilterGroup> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let idx = *positions.entry(row.filter_id).or_insert_with(|| {
            groups.push(FilterGroup {
                id: row.filter_id,
                name: row.name.clone(),
                operator: CombiningOperator::parse(&row.operator),
                conditions: Vec::new(),
            });
            groups.len() - 1
        });

        if let Some(condition) = FilterCondition::from_row(row) {
            groups[idx].conditions.push(condition);
        }
    }

    groups
}

/// Ad hoc filter supplied inline with a request; never persisted or cached
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomFilter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logic: CombiningOperator,
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
}

/// Normalize a filter name into a threshold override key.
///
/// Lower-cases and collapses whitespace runs into single underscores:
/// `"Unchanged in Past 14 Days"` becomes `"unchanged_in_past_14_days"`.
pub fn normalize_filter_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Per-filter day-count overrides for date_diff thresholds, keyed by
/// normalized filter name
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "HashMap<String, i64>")]
pub struct ThresholdOverrides(HashMap<String, i64>);

impl ThresholdOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, days: i64) {
        self.0.insert(normalize_filter_name(key), days);
    }

    /// Override for the filter with this display name, if any
    pub fn lookup(&self, filter_name: &str) -> Option<i64> {
        if self.0.is_empty() {
            return None;
        }
        self.0.get(&normalize_filter_name(filter_name)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for ThresholdOverrides {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        let mut overrides = Self::new();
        for (key, days) in iter {
            overrides.insert(&key, days);
        }
        overrides
    }
}

impl From<HashMap<String, i64>> for ThresholdOverrides {
    fn from(map: HashMap<String, i64>) -> Self {
        map.into_iter().collect()
    }
}

/// Input of one compile call
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    /// Enabled persisted filter ids
    pub filter_ids: Vec<i64>,
    pub custom_filters: Vec<CustomFilter>,
    /// Authenticated user, substituted for `current_user_id`
    pub user_id: String,
    pub threshold_overrides: ThresholdOverrides,
    /// First placeholder index available to the compiler
    pub start_index: usize,
}

/// Output of one compile call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter {
    /// Predicate text, or `None` when no filter contributed anything
    pub predicate: Option<String>,
    /// Values for placeholders `$start_index..$next_index`
    pub values: Vec<SqlValue>,
    /// Next free placeholder index after this predicate
    pub next_index: usize,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.predicate.is_none()
    }
}

/// Filter compiler errors
///
/// Malformed conditions never surface here; they are dropped during
/// compilation. Only failures that would widen the result set do.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Failed to load filter definitions: {0}")]
    Storage(#[from] DataError),
}
