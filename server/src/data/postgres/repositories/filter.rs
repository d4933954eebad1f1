//! Filter definition repository for PostgreSQL operations
//!
//! Definitions live in `filters`, their conditions in `filter_conditions`
//! (ordered by `position`). Create and update write both tables in one
//! transaction. Callers are responsible for invalidating the filter cache
//! after any mutation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use crate::data::filters::FilterRow;
use crate::data::postgres::PostgresError;
use crate::data::types::{ConditionInput, FilterConditionRow, FilterDefinitionRow, FilterInput};

type DefinitionTuple = (i64, String, String, String, Option<String>, String, bool, DateTime<Utc>);

type ConditionTuple = (
    i64,
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    Value,
    Option<String>,
);

const DEFINITION_COLUMNS: &str =
    "id, user_id, workspace_id, name, view_mode, operator, is_default, created_at";

/// Bulk fetch of definitions left-joined with their conditions
pub async fn fetch_filter_rows(
    pool: &PgPool,
    filter_ids: &[i64],
) -> Result<Vec<FilterRow>, PostgresError> {
    if filter_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<
        _,
        (
            i64,
            String,
            String,
            Option<i64>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<Value>,
            Option<String>,
        ),
    >(
        r#"
        SELECT f.id, f.name, f.operator,
               c.id, c.kind, c.field, c.date_from, c.date_to, c.operator, c."values", c.unit
        FROM filters f
        LEFT JOIN filter_conditions c ON c.filter_id = f.id
        WHERE f.id = ANY($1)
        ORDER BY f.id, c.position, c.id
        "#,
    )
    .bind(filter_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(
                filter_id,
                name,
                operator,
                condition_id,
                kind,
                field,
                date_from,
                date_to,
                condition_operator,
                values,
                unit,
            )| FilterRow {
                filter_id,
                name,
                operator,
                condition_id,
                kind,
                field,
                date_from,
                date_to,
                condition_operator,
                values: values.map(json_values),
                unit,
            },
        )
        .collect())
}

/// List a user's definitions in a workspace (ordered by created_at)
pub async fn list_filters(
    pool: &PgPool,
    workspace_id: &str,
    user_id: &str,
) -> Result<Vec<FilterDefinitionRow>, PostgresError> {
    let rows = sqlx::query_as::<_, DefinitionTuple>(&format!(
        "SELECT {} FROM filters WHERE workspace_id = $1 AND user_id = $2 ORDER BY created_at, id",
        DEFINITION_COLUMNS
    ))
    .bind(workspace_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = rows.iter().map(|row| row.0).collect();
    let mut conditions = load_conditions(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let owned = conditions.remove(&row.0).unwrap_or_default();
            definition_from_tuple(row, owned)
        })
        .collect())
}

/// Subset of `filter_ids` owned by the user in the workspace
pub async fn owned_filter_ids(
    pool: &PgPool,
    workspace_id: &str,
    user_id: &str,
    filter_ids: &[i64],
) -> Result<Vec<i64>, PostgresError> {
    if filter_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM filters WHERE id = ANY($1) AND workspace_id = $2 AND user_id = $3",
    )
    .bind(filter_ids)
    .bind(workspace_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Get one definition owned by the user
pub async fn get_filter(
    pool: &PgPool,
    workspace_id: &str,
    user_id: &str,
    filter_id: i64,
) -> Result<Option<FilterDefinitionRow>, PostgresError> {
    let row = sqlx::query_as::<_, DefinitionTuple>(&format!(
        "SELECT {} FROM filters WHERE id = $1 AND workspace_id = $2 AND user_id = $3",
        DEFINITION_COLUMNS
    ))
    .bind(filter_id)
    .bind(workspace_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut conditions = load_conditions(pool, &[filter_id]).await?;
    let owned = conditions.remove(&filter_id).unwrap_or_default();
    Ok(Some(definition_from_tuple(row, owned)))
}

/// Create a definition with its conditions
pub async fn create_filter(
    pool: &PgPool,
    workspace_id: &str,
    user_id: &str,
    input: &FilterInput,
) -> Result<FilterDefinitionRow, PostgresError> {
    let mut tx = pool.begin().await?;

    if input.is_default {
        clear_default(&mut tx, workspace_id, user_id, None).await?;
    }

    let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
        r#"
        INSERT INTO filters (user_id, workspace_id, name, view_mode, operator, is_default)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, created_at
        "#,
    )
    .bind(user_id)
    .bind(workspace_id)
    .bind(&input.name)
    .bind(&input.view_mode)
    .bind(&input.operator)
    .bind(input.is_default)
    .fetch_one(&mut *tx)
    .await?;

    let conditions = insert_conditions(&mut tx, id, &input.conditions).await?;
    tx.commit().await?;

    tracing::debug!(filter_id = id, workspace_id, user_id, "Filter created");

    Ok(FilterDefinitionRow {
        id,
        user_id: user_id.to_string(),
        workspace_id: workspace_id.to_string(),
        name: input.name.clone(),
        view_mode: input.view_mode.clone(),
        operator: input.operator.clone(),
        is_default: input.is_default,
        created_at,
        conditions,
    })
}

/// Replace a definition and all of its conditions
pub async fn update_filter(
    pool: &PgPool,
    workspace_id: &str,
    user_id: &str,
    filter_id: i64,
    input: &FilterInput,
) -> Result<Option<FilterDefinitionRow>, PostgresError> {
    let mut tx = pool.begin().await?;

    if input.is_default {
        clear_default(&mut tx, workspace_id, user_id, Some(filter_id)).await?;
    }

    let created_at: Option<DateTime<Utc>> = sqlx::query_scalar(
        r#"
        UPDATE filters
        SET name = $1, view_mode = $2, operator = $3, is_default = $4
        WHERE id = $5 AND workspace_id = $6 AND user_id = $7
        RETURNING created_at
        "#,
    )
    .bind(&input.name)
    .bind(&input.view_mode)
    .bind(&input.operator)
    .bind(input.is_default)
    .bind(filter_id)
    .bind(workspace_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(created_at) = created_at else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query("DELETE FROM filter_conditions WHERE filter_id = $1")
        .bind(filter_id)
        .execute(&mut *tx)
        .await?;

    let conditions = insert_conditions(&mut tx, filter_id, &input.conditions).await?;
    tx.commit().await?;

    tracing::debug!(filter_id, workspace_id, user_id, "Filter updated");

    Ok(Some(FilterDefinitionRow {
        id: filter_id,
        user_id: user_id.to_string(),
        workspace_id: workspace_id.to_string(),
        name: input.name.clone(),
        view_mode: input.view_mode.clone(),
        operator: input.operator.clone(),
        is_default: input.is_default,
        created_at,
        conditions,
    }))
}

/// Delete a definition; conditions cascade
pub async fn delete_filter(
    pool: &PgPool,
    workspace_id: &str,
    user_id: &str,
    filter_id: i64,
) -> Result<bool, PostgresError> {
    let result =
        sqlx::query("DELETE FROM filters WHERE id = $1 AND workspace_id = $2 AND user_id = $3")
            .bind(filter_id)
            .bind(workspace_id)
            .bind(user_id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Conditions for a set of definitions, grouped by definition id
async fn load_conditions(
    pool: &PgPool,
    filter_ids: &[i64],
) -> Result<HashMap<i64, Vec<FilterConditionRow>>, PostgresError> {
    let mut grouped: HashMap<i64, Vec<FilterConditionRow>> = HashMap::new();
    if filter_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = sqlx::query_as::<_, ConditionTuple>(
        r#"
        SELECT filter_id, id, kind, field, date_from, date_to, operator, "values", unit
        FROM filter_conditions
        WHERE filter_id = ANY($1)
        ORDER BY filter_id, position, id
        "#,
    )
    .bind(filter_ids)
    .fetch_all(pool)
    .await?;

    for (filter_id, id, kind, field, date_from, date_to, operator, values, unit) in rows {
        grouped
            .entry(filter_id)
            .or_default()
            .push(FilterConditionRow {
                id,
                kind,
                field,
                date_from,
                date_to,
                operator,
                values: json_values(values),
                unit,
            });
    }
    Ok(grouped)
}

async fn insert_conditions(
    conn: &mut PgConnection,
    filter_id: i64,
    conditions: &[ConditionInput],
) -> Result<Vec<FilterConditionRow>, PostgresError> {
    let mut inserted = Vec::with_capacity(conditions.len());

    for (position, condition) in conditions.iter().enumerate() {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO filter_conditions
                (filter_id, position, kind, field, date_from, date_to, operator, "values", unit)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(filter_id)
        .bind(position as i32)
        .bind(&condition.kind)
        .bind(&condition.field)
        .bind(&condition.date_from)
        .bind(&condition.date_to)
        .bind(&condition.operator)
        .bind(Value::Array(condition.values.clone()))
        .bind(&condition.unit)
        .fetch_one(&mut *conn)
        .await?;

        inserted.push(FilterConditionRow {
            id,
            kind: condition.kind.clone(),
            field: condition.field.clone(),
            date_from: condition.date_from.clone(),
            date_to: condition.date_to.clone(),
            operator: condition.operator.clone(),
            values: condition.values.clone(),
            unit: condition.unit.clone(),
        });
    }

    Ok(inserted)
}

/// Only one default filter per (user, workspace)
async fn clear_default(
    conn: &mut PgConnection,
    workspace_id: &str,
    user_id: &str,
    except: Option<i64>,
) -> Result<(), PostgresError> {
    sqlx::query(
        r#"
        UPDATE filters SET is_default = FALSE
        WHERE workspace_id = $1 AND user_id = $2 AND is_default
          AND ($3::BIGINT IS NULL OR id <> $3)
        "#,
    )
    .bind(workspace_id)
    .bind(user_id)
    .bind(except)
    .execute(conn)
    .await?;
    Ok(())
}

fn definition_from_tuple(
    (id, user_id, workspace_id, name, view_mode, operator, is_default, created_at): DefinitionTuple,
    conditions: Vec<FilterConditionRow>,
) -> FilterDefinitionRow {
    FilterDefinitionRow {
        id,
        user_id,
        workspace_id,
        name,
        view_mode,
        operator,
        is_default,
        created_at,
        conditions,
    }
}

/// Stored condition values as a list; a scalar is treated as a single value
fn json_values(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_unwraps_arrays() {
        assert_eq!(json_values(json!([1, "a"])), vec![json!(1), json!("a")]);
    }

    #[test]
    fn json_values_handles_null_and_scalars() {
        assert!(json_values(Value::Null).is_empty());
        assert_eq!(json_values(json!(7)), vec![json!(7)]);
    }

    #[test]
    fn definition_from_tuple_keeps_conditions() {
        let created_at = Utc::now();
        let row = definition_from_tuple(
            (
                9,
                "user-1".to_string(),
                "ws".to_string(),
                "Due soon".to_string(),
                Some("list".to_string()),
                "OR".to_string(),
                true,
                created_at,
            ),
            vec![],
        );
        assert_eq!(row.id, 9);
        assert_eq!(row.operator, "OR");
        assert!(row.is_default);
        assert_eq!(row.created_at, created_at);
    }
}
