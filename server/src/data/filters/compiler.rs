//! Filter query compiler
//!
//! Turns the enabled persisted filters and inline custom filters of one
//! request into a single predicate over the task alias plus its bound values.
//! Persisted definitions are read through the `FilterCache`; a storage
//! failure aborts the compile instead of producing an unfiltered result.

use std::sync::Arc;

use super::condition::{CompileContext, compile_condition};
use super::fields::CombiningOperator;
use super::params::ParameterBuilder;
use super::types::{
    CompiledFilter, FilterCondition, FilterError, FilterQuery, FilterRow, group_rows,
};
use crate::data::cache::FilterCache;
use crate::data::traits::FilterStore;

/// Compiles filter queries against a definition store
#[derive(Clone)]
pub struct FilterQueryCompiler {
    store: Arc<dyn FilterStore>,
    cache: Arc<FilterCache>,
}

impl FilterQueryCompiler {
    pub fn new(store: Arc<dyn FilterStore>, cache: Arc<FilterCache>) -> Self {
        Self { store, cache }
    }

    /// Cache shared with the filter CRUD handlers for invalidation
    pub fn cache(&self) -> &Arc<FilterCache> {
        &self.cache
    }

    /// Compile persisted and custom filters into one predicate.
    ///
    /// Every filter that contributes a fragment is AND-ed with the others.
    /// Placeholders start at `query.start_index` and are gapless.
    pub async fn compile(&self, query: &FilterQuery) -> Result<CompiledFilter, FilterError> {
        let mut params = ParameterBuilder::new(query.start_index);

        if query.filter_ids.is_empty() && query.custom_filters.is_empty() {
            return Ok(CompiledFilter {
                predicate: None,
                values: Vec::new(),
                next_index: params.next_index(),
            });
        }

        let rows = self.load_rows(&query.filter_ids).await?;
        let mut fragments = Vec::new();

        for group in group_rows(&rows) {
            let ctx = CompileContext {
                user_id: &query.user_id,
                filter_name: &group.name,
                overrides: &query.threshold_overrides,
            };
            if let Some(fragment) =
                compile_group(&group.conditions, group.operator, &ctx, &mut params)
            {
                fragments.push(fragment);
            } else {
                tracing::debug!(filter_id = group.id, name = %group.name, "Filter contributed no conditions");
            }
        }

        for custom in &query.custom_filters {
            let ctx = CompileContext {
                user_id: &query.user_id,
                filter_name: custom.name.as_deref().unwrap_or(""),
                overrides: &query.threshold_overrides,
            };
            if let Some(fragment) =
                compile_group(&custom.conditions, custom.logic, &ctx, &mut params)
            {
                fragments.push(fragment);
            }
        }

        let next_index = params.next_index();
        tracing::trace!(
            fragments = fragments.len(),
            bound = params.values().len(),
            next_index,
            "Compiled task filter"
        );
        let predicate = if fragments.is_empty() {
            None
        } else {
            Some(fragments.join(" AND "))
        };

        Ok(CompiledFilter {
            predicate,
            values: params.into_values(),
            next_index,
        })
    }

    /// Flat definition rows for an id set, from cache or one bulk fetch
    async fn load_rows(&self, filter_ids: &[i64]) -> Result<Arc<Vec<FilterRow>>, FilterError> {
        if filter_ids.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        if let Some(rows) = self.cache.get(filter_ids) {
            tracing::trace!(key = %FilterCache::key(filter_ids), "Filter cache hit");
            return Ok(rows);
        }

        let mut ids = filter_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let rows = match self.store.fetch_filter_rows(&ids).await {
            Ok(rows) => Arc::new(rows),
            Err(e) => {
                tracing::error!(error = %e, filter_ids = ?ids, "Failed to fetch filter definitions");
                return Err(FilterError::Storage(e));
            }
        };
        self.cache.set(&ids, Arc::clone(&rows));
        Ok(rows)
    }
}

/// Compile one filter's conditions joined by its own operator, parenthesized
fn compile_group(
    conditions: &[FilterCondition],
    operator: CombiningOperator,
    ctx: &CompileContext<'_>,
    params: &mut ParameterBuilder,
) -> Option<String> {
    let parts: Vec<String> = conditions
        .iter()
        .filter_map(|condition| compile_condition(condition, ctx, params))
        .collect();

    if parts.is_empty() {
        return None;
    }
    Some(format!("({})", parts.join(operator.joiner())))
}

impl std::fmt::Debug for FilterQueryCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterQueryCompiler")
            .field("cache_entries", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::data::cache::clock::ManualClock;
    use crate::data::error::DataError;
    use crate::data::filters::{CustomFilter, Field, Operator, SqlValue};
    use crate::data::filters::fields::ConditionKind;

    const TTL: Duration = Duration::from_secs(300);

    struct MockStore {
        rows: Vec<FilterRow>,
        fetches: AtomicUsize,
    }

    impl MockStore {
        fn new(rows: Vec<FilterRow>) -> Arc<Self> {
            Arc::new(Self {
                rows,
                fetches: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FilterStore for MockStore {
        async fn fetch_filter_rows(&self, filter_ids: &[i64]) -> Result<Vec<FilterRow>, DataError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .rows
                .iter()
                .filter(|row| filter_ids.contains(&row.filter_id))
                .cloned()
                .collect())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl FilterStore for FailingStore {
        async fn fetch_filter_rows(&self, _filter_ids: &[i64]) -> Result<Vec<FilterRow>, DataError> {
            Err(DataError::from_postgres(sqlx::Error::PoolTimedOut))
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn row(
        filter_id: i64,
        name: &str,
        operator: &str,
        condition_id: i64,
        kind: &str,
        field: Option<&str>,
        condition_operator: &str,
        values: Vec<serde_json::Value>,
    ) -> FilterRow {
        FilterRow {
            filter_id,
            name: name.to_string(),
            operator: operator.to_string(),
            condition_id: Some(condition_id),
            kind: Some(kind.to_string()),
            field: field.map(String::from),
            date_from: None,
            date_to: None,
            condition_operator: Some(condition_operator.to_string()),
            values: Some(values),
            unit: None,
        }
    }

    fn date_diff_row(filter_id: i64, name: &str, from: &str, to: &str, op: &str, days: i64) -> FilterRow {
        FilterRow {
            date_from: Some(from.to_string()),
            date_to: Some(to.to_string()),
            unit: Some("days".to_string()),
            ..row(filter_id, name, "AND", filter_id * 10, "date_diff", None, op, vec![json!(days)])
        }
    }

    fn fixture_rows() -> Vec<FilterRow> {
        vec![
            row(1, "Not done", "AND", 10, "list", Some("status"), "!=", vec![json!("done")]),
            row(
                2,
                "Hot",
                "AND",
                20,
                "list",
                Some("priority"),
                "IN",
                vec![json!("high"), json!("urgent")],
            ),
            row(3, "Either", "OR", 30, "list", Some("status"), "=", vec![json!("todo")]),
            row(3, "Either", "OR", 31, "list", Some("priority"), "=", vec![json!("high")]),
        ]
    }

    fn compiler(store: Arc<dyn FilterStore>) -> (FilterQueryCompiler, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(FilterCache::with_clock(TTL, TTL * 2, clock.clone()));
        (FilterQueryCompiler::new(store, cache), clock)
    }

    fn query(filter_ids: Vec<i64>, start_index: usize) -> FilterQuery {
        FilterQuery {
            filter_ids,
            user_id: "user-1".to_string(),
            start_index,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_input_compiles_to_nothing() {
        let store = MockStore::new(fixture_rows());
        let (compiler, _clock) = compiler(store.clone());

        let compiled = compiler.compile(&query(vec![], 7)).await.unwrap();

        assert!(compiled.is_empty());
        assert!(compiled.values.is_empty());
        assert_eq!(compiled.next_index, 7);
        assert_eq!(store.fetches(), 0);
    }

    #[tokio::test]
    async fn filters_are_and_combined() {
        let (compiler, _clock) = compiler(MockStore::new(fixture_rows()));

        let compiled = compiler.compile(&query(vec![1, 2], 1)).await.unwrap();

        assert_eq!(
            compiled.predicate.as_deref(),
            Some("(t.status != $1) AND (t.priority = ANY($2))")
        );
        assert_eq!(
            compiled.values,
            vec![
                SqlValue::Text("done".to_string()),
                SqlValue::TextArray(vec!["high".to_string(), "urgent".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn conditions_within_filter_use_its_operator() {
        let (compiler, _clock) = compiler(MockStore::new(fixture_rows()));

        let compiled = compiler.compile(&query(vec![3], 1)).await.unwrap();

        assert_eq!(
            compiled.predicate.as_deref(),
            Some("(t.status = $1 OR t.priority = $2)")
        );
    }

    #[tokio::test]
    async fn placeholders_are_gapless_from_start_index() {
        let (compiler, _clock) = compiler(MockStore::new(fixture_rows()));

        let compiled = compiler.compile(&query(vec![1, 2, 3], 5)).await.unwrap();
        let predicate = compiled.predicate.unwrap();

        assert!(!predicate.contains("$4"));
        for idx in 5..compiled.next_index {
            assert!(predicate.contains(&format!("${}", idx)));
        }
        assert_eq!(compiled.values.len(), compiled.next_index - 5);
        assert_eq!(compiled.next_index, 9);
    }

    #[tokio::test]
    async fn cached_rows_are_reused_within_ttl() {
        let store = MockStore::new(fixture_rows());
        let (compiler, clock) = compiler(store.clone());

        compiler.compile(&query(vec![2, 1], 1)).await.unwrap();
        clock.advance(TTL - Duration::from_secs(1));
        compiler.compile(&query(vec![1, 2, 2], 1)).await.unwrap();
        assert_eq!(store.fetches(), 1);

        clock.advance(Duration::from_secs(1));
        compiler.compile(&query(vec![1, 2], 1)).await.unwrap();
        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let store = MockStore::new(fixture_rows());
        let (compiler, _clock) = compiler(store.clone());

        compiler.compile(&query(vec![1], 1)).await.unwrap();
        compiler.cache().invalidate_all();
        compiler.compile(&query(vec![1], 1)).await.unwrap();

        assert_eq!(store.fetches(), 2);
    }

    #[tokio::test]
    async fn threshold_override_replaces_stored_value() {
        let rows = vec![date_diff_row(
            4,
            "Unchanged in Past 14 Days",
            "last_modified",
            "today",
            ">=",
            14,
        )];
        let (compiler, _clock) = compiler(MockStore::new(rows));

        let mut q = query(vec![4], 1);
        q.threshold_overrides.insert("unchanged_in_past_14_days", 3);
        let compiled = compiler.compile(&q).await.unwrap();

        assert_eq!(
            compiled.predicate.as_deref(),
            Some("((CURRENT_DATE - t.updated_at::date) >= $1)")
        );
        assert_eq!(compiled.values, vec![SqlValue::BigInt(3)]);

        let compiled = compiler.compile(&query(vec![4], 1)).await.unwrap();
        assert_eq!(compiled.values, vec![SqlValue::BigInt(14)]);
    }

    #[tokio::test]
    async fn unknown_field_is_dropped_without_error() {
        let rows = vec![
            row(5, "Mixed", "AND", 50, "list", Some("secret_column"), "=", vec![json!("x")]),
            row(5, "Mixed", "AND", 51, "list", Some("status"), "=", vec![json!("todo")]),
        ];
        let (compiler, _clock) = compiler(MockStore::new(rows));

        let compiled = compiler.compile(&query(vec![5], 1)).await.unwrap();

        assert_eq!(compiled.predicate.as_deref(), Some("(t.status = $1)"));
        assert!(!compiled.predicate.unwrap().contains("secret_column"));
        assert_eq!(compiled.values.len(), 1);
    }

    #[tokio::test]
    async fn filter_without_surviving_conditions_contributes_nothing() {
        let rows = vec![
            row(6, "Broken", "AND", 60, "list", Some("nope"), "=", vec![json!("x")]),
            FilterRow {
                condition_id: None,
                kind: None,
                field: None,
                condition_operator: None,
                values: None,
                ..row(7, "Empty", "AND", 0, "list", None, "=", vec![])
            },
        ];
        let (compiler, _clock) = compiler(MockStore::new(rows));

        let compiled = compiler.compile(&query(vec![6, 7], 3)).await.unwrap();

        assert!(compiled.is_empty());
        assert_eq!(compiled.next_index, 3);
    }

    #[tokio::test]
    async fn custom_filters_compile_after_persisted_ones() {
        let store = MockStore::new(fixture_rows());
        let (compiler, _clock) = compiler(store.clone());

        let mut q = query(vec![1], 1);
        q.custom_filters = vec![CustomFilter {
            name: None,
            logic: CombiningOperator::Or,
            conditions: vec![
                FilterCondition {
                    kind: ConditionKind::List,
                    field: Field::Assignee,
                    operator: Operator::Eq,
                    values: vec![json!("current_user_id")],
                    ..Default::default()
                },
                FilterCondition {
                    kind: ConditionKind::List,
                    field: Field::Assignee,
                    operator: Operator::IsNull,
                    ..Default::default()
                },
            ],
        }];
        let compiled = compiler.compile(&q).await.unwrap();

        assert_eq!(
            compiled.predicate.as_deref(),
            Some(
                "(t.status != $1) AND (EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = $2) \
                 OR NOT EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id))"
            )
        );
        assert_eq!(compiled.values[1], SqlValue::Text("user-1".to_string()));
    }

    #[tokio::test]
    async fn custom_filters_alone_skip_storage() {
        let store = MockStore::new(fixture_rows());
        let (compiler, _clock) = compiler(store.clone());

        let mut q = query(vec![], 1);
        q.custom_filters = vec![CustomFilter {
            conditions: vec![FilterCondition {
                kind: ConditionKind::List,
                field: Field::Status,
                operator: Operator::Eq,
                values: vec![json!("todo")],
                ..Default::default()
            }],
            ..Default::default()
        }];
        let compiled = compiler.compile(&q).await.unwrap();

        assert_eq!(compiled.predicate.as_deref(), Some("(t.status = $1)"));
        assert_eq!(store.fetches(), 0);
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let (compiler, _clock) = compiler(Arc::new(FailingStore));

        let err = compiler.compile(&query(vec![1], 1)).await.unwrap_err();

        assert!(matches!(err, FilterError::Storage(_)));
        assert!(compiler.cache().is_empty());
    }

}
