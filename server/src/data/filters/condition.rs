//! Single-condition compilation
//!
//! Compiles one `FilterCondition` into a predicate fragment, binding literals
//! through the shared `ParameterBuilder`. A condition that cannot be compiled
//! (unknown field, operator or kind, wrong value count, unparseable literal)
//! yields `None` and binds nothing. Dropping it instead of failing the whole
//! filter is the intended policy.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use super::fields::{
    CURRENT_USER_TOKEN, ConditionKind, DateUnit, Field, FieldKind, Operator, TASK_ALIAS,
};
use super::params::{ParameterBuilder, SqlValue};
use super::types::{FilterCondition, ThresholdOverrides};

/// Per-filter information a condition may depend on
#[derive(Debug, Clone, Copy)]
pub struct CompileContext<'a> {
    /// Authenticated user
    pub user_id: &'a str,
    /// Display name of the owning filter (threshold override key source)
    pub filter_name: &'a str,
    pub overrides: &'a ThresholdOverrides,
}

/// Compile one condition; `None` when it does not map to anything compilable
pub fn compile_condition(
    condition: &FilterCondition,
    ctx: &CompileContext<'_>,
    params: &mut ParameterBuilder,
) -> Option<String> {
    let sql = match condition.kind {
        ConditionKind::List => compile_list(condition, ctx, params),
        ConditionKind::DateDiff => compile_date_diff(condition, ctx, params),
        ConditionKind::DateRange => compile_date_range(condition, params),
        ConditionKind::Unsupported => None,
    };

    if sql.is_none() {
        tracing::debug!(
            filter = %ctx.filter_name,
            kind = condition.kind.as_str(),
            field = %condition.field,
            operator = condition.operator.as_str(),
            values = condition.values.len(),
            "Dropping condition that does not compile"
        );
    }

    sql
}

fn compile_list(
    condition: &FilterCondition,
    ctx: &CompileContext<'_>,
    params: &mut ParameterBuilder,
) -> Option<String> {
    match condition.field.kind() {
        FieldKind::Relation => compile_assignee(condition, ctx, params),
        FieldKind::Unsupported => None,
        kind => compile_scalar(
            condition.field,
            kind,
            condition.operator,
            &condition.values,
            params,
        ),
    }
}

/// Comparison of a column (or `today`) against bound literals
fn compile_scalar(
    field: Field,
    kind: FieldKind,
    operator: Operator,
    values: &[Value],
    params: &mut ParameterBuilder,
) -> Option<String> {
    let expr = field.expression()?;

    match operator {
        Operator::IsNull | Operator::IsNotNull => {
            // CURRENT_DATE is never NULL
            if field == Field::Today || !values.is_empty() {
                return None;
            }
            let test = if operator == Operator::IsNull {
                "IS NULL"
            } else {
                "IS NOT NULL"
            };
            Some(format!("{} {}", expr, test))
        }
        Operator::In => {
            if values.is_empty() {
                return None;
            }
            match kind {
                FieldKind::Text => {
                    let list = values.iter().map(text_literal).collect::<Option<Vec<_>>>()?;
                    let token = params.add_array(SqlValue::TextArray(list));
                    Some(format!("{} = ANY({})", expr, token))
                }
                FieldKind::Id => {
                    let list = values.iter().map(id_literal).collect::<Option<Vec<_>>>()?;
                    let token = params.add_array(SqlValue::BigIntArray(list));
                    Some(format!("{} = ANY({})", expr, token))
                }
                FieldKind::Date => {
                    let list = values.iter().map(date_literal).collect::<Option<Vec<_>>>()?;
                    let token = params.add_array(SqlValue::TextArray(list));
                    Some(format!(
                        "{} = ANY({}::date[])",
                        field.date_expression()?,
                        token
                    ))
                }
                FieldKind::Relation | FieldKind::Unsupported => None,
            }
        }
        Operator::Between => {
            let [low, high] = values else {
                return None;
            };
            let (lhs, low, high) = match kind {
                FieldKind::Date => (
                    field.date_expression()?,
                    SqlValue::Text(date_literal(low)?),
                    SqlValue::Text(date_literal(high)?),
                ),
                FieldKind::Id => (
                    expr,
                    SqlValue::BigInt(id_literal(low)?),
                    SqlValue::BigInt(id_literal(high)?),
                ),
                FieldKind::Text => (
                    expr,
                    SqlValue::Text(text_literal(low)?),
                    SqlValue::Text(text_literal(high)?),
                ),
                FieldKind::Relation | FieldKind::Unsupported => return None,
            };
            let cast = if kind == FieldKind::Date { "::date" } else { "" };
            let low = params.add(low);
            let high = params.add(high);
            Some(format!(
                "{} BETWEEN {}{} AND {}{}",
                lhs, low, cast, high, cast
            ))
        }
        _ => {
            let symbol = operator.comparison()?;
            let [value] = values else {
                return None;
            };
            match kind {
                FieldKind::Text => {
                    let token = params.add(SqlValue::Text(text_literal(value)?));
                    Some(format!("{} {} {}", expr, symbol, token))
                }
                FieldKind::Id => {
                    let token = params.add(SqlValue::BigInt(id_literal(value)?));
                    Some(format!("{} {} {}", expr, symbol, token))
                }
                FieldKind::Date => {
                    let lhs = field.date_expression()?;
                    let token = params.add(SqlValue::Text(date_literal(value)?));
                    Some(format!("{} {} {}::date", lhs, symbol, token))
                }
                FieldKind::Relation | FieldKind::Unsupported => None,
            }
        }
    }
}

/// Assignee tests go through the `task_assignees` relation, never a column
fn compile_assignee(
    condition: &FilterCondition,
    ctx: &CompileContext<'_>,
    params: &mut ParameterBuilder,
) -> Option<String> {
    let relation = format!(
        "SELECT 1 FROM task_assignees ta WHERE ta.task_id = {}.id",
        TASK_ALIAS
    );

    match condition.operator {
        Operator::IsNull if condition.values.is_empty() => {
            Some(format!("NOT EXISTS ({})", relation))
        }
        Operator::IsNotNull if condition.values.is_empty() => {
            Some(format!("EXISTS ({})", relation))
        }
        Operator::Eq | Operator::Ne => {
            let [value] = condition.values.as_slice() else {
                return None;
            };
            let user = assignee_literal(value, ctx.user_id)?;
            let token = params.add(SqlValue::Text(user));
            let negate = if condition.operator == Operator::Ne {
                "NOT "
            } else {
                ""
            };
            Some(format!(
                "{}EXISTS ({} AND ta.user_id = {})",
                negate, relation, token
            ))
        }
        Operator::In => {
            if condition.values.is_empty() {
                return None;
            }
            let users = condition
                .values
                .iter()
                .map(|v| assignee_literal(v, ctx.user_id))
                .collect::<Option<Vec<_>>>()?;
            let token = params.add_array(SqlValue::TextArray(users));
            Some(format!("EXISTS ({} AND ta.user_id = ANY({}))", relation, token))
        }
        _ => None,
    }
}

/// Day difference `date_to - date_from` compared against a threshold
fn compile_date_diff(
    condition: &FilterCondition,
    ctx: &CompileContext<'_>,
    params: &mut ParameterBuilder,
) -> Option<String> {
    let from = condition.date_from?.date_expression()?;
    let to = condition.date_to?.date_expression()?;
    let unit = DateUnit::parse(condition.unit.as_deref())?;
    let diff = format!("({} - {})", to, from);

    if condition.operator == Operator::Between {
        let [low, high] = condition.values.as_slice() else {
            return None;
        };
        let low = threshold_literal(low)?.checked_mul(unit.days())?;
        let high = threshold_literal(high)?.checked_mul(unit.days())?;
        let low = params.add(SqlValue::BigInt(low));
        let high = params.add(SqlValue::BigInt(high));
        return Some(format!("{} BETWEEN {} AND {}", diff, low, high));
    }

    let symbol = condition.operator.comparison()?;
    let stored = match condition.values.as_slice() {
        [value] => threshold_literal(value),
        _ => None,
    };
    // Overrides are already expressed in days
    let days = match ctx.overrides.lookup(ctx.filter_name) {
        Some(days) => days,
        None => stored?.checked_mul(unit.days())?,
    };
    let token = params.add(SqlValue::BigInt(days));
    Some(format!("{} {} {}", diff, symbol, token))
}

/// Inclusive date window over one date field
fn compile_date_range(
    condition: &FilterCondition,
    params: &mut ParameterBuilder,
) -> Option<String> {
    if !matches!(condition.operator, Operator::Between | Operator::Unsupported) {
        return None;
    }
    let lhs = condition.field.date_expression()?;
    let [start, end] = condition.values.as_slice() else {
        return None;
    };
    let start = date_literal(start)?;
    let end = date_literal(end)?;
    let start = params.add(SqlValue::Text(start));
    let end = params.add(SqlValue::Text(end));
    Some(format!("{} BETWEEN {}::date AND {}::date", lhs, start, end))
}

// ============================================================================
// Literal conversion
// ============================================================================

fn text_literal(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn id_literal(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn threshold_literal(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Calendar date as `YYYY-MM-DD`; accepts plain dates and RFC 3339 timestamps
fn date_literal(value: &Value) -> Option<String> {
    let Value::String(s) = value else {
        return None;
    };
    let s = s.trim();
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn assignee_literal(value: &Value, user_id: &str) -> Option<String> {
    match value {
        Value::String(s) if s == CURRENT_USER_TOKEN => Some(user_id.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
