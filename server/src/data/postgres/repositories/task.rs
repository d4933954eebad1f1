//! Task repository for PostgreSQL operations
//!
//! Task listing executes a compiled filter predicate. The statement layout is
//! fixed: `$1` is the workspace id, the filter's values follow from
//! `TASK_FILTER_START_INDEX`, and LIMIT/OFFSET take the next two
//! placeholders. The count query reuses the predicate and values unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Arguments, PgPool, Row};

use crate::data::filters::{CompiledFilter, SqlValue};
use crate::data::postgres::PostgresError;
use crate::data::types::{ListTasksParams, TaskRow};

/// First placeholder available to the filter compiler in task listing
pub const TASK_FILTER_START_INDEX: usize = 2;

const TASK_COLUMNS: &str = r#"
    t.id, t.workspace_id, t.title, t.description, t.status, t.priority, t.view,
    t.category_id, t.tag_id, t.start_date, t.due_date, t.completed_at,
    t.created_at, t.updated_at,
    ARRAY(SELECT ta.user_id FROM task_assignees ta WHERE ta.task_id = t.id ORDER BY ta.user_id) AS assignees
"#;

/// Check whether a user belongs to a workspace
pub async fn is_workspace_member(
    pool: &PgPool,
    workspace_id: &str,
    user_id: &str,
) -> Result<bool, PostgresError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM workspace_members WHERE workspace_id = $1 AND user_id = $2)",
    )
    .bind(workspace_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// List tasks of a workspace matching a compiled filter, with the total count
pub async fn list_tasks(
    pool: &PgPool,
    params: &ListTasksParams,
    filter: &CompiledFilter,
) -> Result<(Vec<TaskRow>, u64), PostgresError> {
    let where_clause = where_clause(filter)?;

    let sql = format!(
        "SELECT {} FROM tasks t WHERE {} ORDER BY t.created_at DESC, t.id DESC LIMIT ${} OFFSET ${}",
        TASK_COLUMNS,
        where_clause,
        filter.next_index,
        filter.next_index + 1
    );
    let mut args = filter_arguments(&params.workspace_id, filter)?;
    args.add(params.limit as i64).map_err(sqlx::Error::Encode)?;
    args.add(params.offset()).map_err(sqlx::Error::Encode)?;

    let rows = sqlx::query_with(&sql, args).fetch_all(pool).await?;
    let tasks = rows
        .iter()
        .map(task_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    let count_sql = format!("SELECT COUNT(*) FROM tasks t WHERE {}", where_clause);
    let count_args = filter_arguments(&params.workspace_id, filter)?;
    let total: i64 = sqlx::query_scalar_with(&count_sql, count_args)
        .fetch_one(pool)
        .await?;

    Ok((tasks, total.max(0) as u64))
}

/// Workspace scope plus the compiled predicate, if any
fn where_clause(filter: &CompiledFilter) -> Result<String, PostgresError> {
    let expected_next = TASK_FILTER_START_INDEX + filter.values.len();
    if filter.next_index != expected_next {
        return Err(PostgresError::Config(format!(
            "Filter compiled for placeholder ${} but task listing binds from ${}",
            filter.next_index.saturating_sub(filter.values.len()),
            TASK_FILTER_START_INDEX
        )));
    }

    Ok(match &filter.predicate {
        Some(predicate) => format!("t.workspace_id = $1 AND ({})", predicate),
        None => "t.workspace_id = $1".to_string(),
    })
}

/// `$1` workspace followed by the filter's bound values
fn filter_arguments(
    workspace_id: &str,
    filter: &CompiledFilter,
) -> Result<PgArguments, PostgresError> {
    let mut args = PgArguments::default();
    args.add(workspace_id.to_string())
        .map_err(sqlx::Error::Encode)?;
    for value in &filter.values {
        bind_value(&mut args, value)?;
    }
    Ok(args)
}

fn bind_value(args: &mut PgArguments, value: &SqlValue) -> Result<(), PostgresError> {
    let result = match value {
        SqlValue::Text(text) => args.add(text.clone()),
        SqlValue::BigInt(n) => args.add(*n),
        SqlValue::TextArray(list) => args.add(list.clone()),
        SqlValue::BigIntArray(list) => args.add(list.clone()),
    };
    result.map_err(|e| PostgresError::Database(sqlx::Error::Encode(e)))
}

fn task_from_row(row: &PgRow) -> Result<TaskRow, PostgresError> {
    Ok(TaskRow {
        id: row.try_get("id")?,
        workspace_id: row.try_get("workspace_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        status: row.try_get("status")?,
        priority: row.try_get("priority")?,
        view: row.try_get("view")?,
        category_id: row.try_get("category_id")?,
        tag_id: row.try_get("tag_id")?,
        start_date: row.try_get::<Option<NaiveDate>, _>("start_date")?,
        due_date: row.try_get::<Option<NaiveDate>, _>("due_date")?,
        completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        assignees: row.try_get("assignees")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(predicate: Option<&str>, values: Vec<SqlValue>, start: usize) -> CompiledFilter {
        CompiledFilter {
            predicate: predicate.map(String::from),
            next_index: start + values.len(),
            values,
        }
    }

    #[test]
    fn where_clause_without_filter_scopes_workspace() {
        let filter = compiled(None, vec![], TASK_FILTER_START_INDEX);
        assert_eq!(where_clause(&filter).unwrap(), "t.workspace_id = $1");
    }

    #[test]
    fn where_clause_wraps_predicate() {
        let filter = compiled(
            Some("(t.status != $2) AND (t.priority = ANY($3))"),
            vec![
                SqlValue::Text("done".to_string()),
                SqlValue::TextArray(vec!["high".to_string()]),
            ],
            TASK_FILTER_START_INDEX,
        );
        assert_eq!(
            where_clause(&filter).unwrap(),
            "t.workspace_id = $1 AND ((t.status != $2) AND (t.priority = ANY($3)))"
        );
    }

    #[test]
    fn where_clause_rejects_misaligned_placeholders() {
        let filter = compiled(Some("(t.status = $1)"), vec![SqlValue::Text("x".into())], 1);
        assert!(matches!(
            where_clause(&filter),
            Err(PostgresError::Config(_))
        ));
    }

    #[test]
    fn filter_arguments_bind_every_value() {
        let filter = compiled(
            Some("(t.category_id = ANY($2) AND t.title = $3)"),
            vec![
                SqlValue::BigIntArray(vec![1, 2]),
                SqlValue::Text("Launch".to_string()),
            ],
            TASK_FILTER_START_INDEX,
        );
        let args = filter_arguments("ws", &filter).unwrap();
        assert_eq!(args.len(), 3);
    }
}
