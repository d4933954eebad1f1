//! Filter definition API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::api::types::ApiError;
use crate::core::constants::MAX_CONDITIONS_PER_FILTER;
use crate::data::filters::{CombiningOperator, ConditionKind, DateUnit, Field, FieldKind, Operator};
use crate::data::types::{ConditionInput, FilterConditionRow, FilterDefinitionRow, FilterInput};

/// Filter condition DTO
#[derive(Debug, Serialize, ToSchema)]
pub struct ConditionDto {
    pub id: i64,
    pub kind: String,
    pub field: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub operator: String,
    #[schema(value_type = Vec<Object>)]
    pub values: Vec<serde_json::Value>,
    pub unit: Option<String>,
}

impl From<FilterConditionRow> for ConditionDto {
    fn from(row: FilterConditionRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            field: row.field,
            date_from: row.date_from,
            date_to: row.date_to,
            operator: row.operator,
            values: row.values,
            unit: row.unit,
        }
    }
}

/// Filter definition DTO
#[derive(Debug, Serialize, ToSchema)]
pub struct FilterDto {
    pub id: i64,
    pub workspace_id: String,
    pub name: String,
    pub view_mode: Option<String>,
    pub operator: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub conditions: Vec<ConditionDto>,
}

impl From<FilterDefinitionRow> for FilterDto {
    fn from(row: FilterDefinitionRow) -> Self {
        Self {
            id: row.id,
            workspace_id: row.workspace_id,
            name: row.name,
            view_mode: row.view_mode,
            operator: row.operator,
            is_default: row.is_default,
            created_at: row.created_at,
            conditions: row.conditions.into_iter().map(ConditionDto::from).collect(),
        }
    }
}

/// Response for listing filter definitions
#[derive(Debug, Serialize, ToSchema)]
pub struct ListFiltersResponse {
    pub data: Vec<FilterDto>,
}

/// One condition in a filter create/update request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConditionRequest {
    /// `list`, `date_diff` or `date_range`
    pub kind: String,
    pub field: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub values: Vec<serde_json::Value>,
    /// `days` (default) or `weeks`, date_diff only
    pub unit: Option<String>,
}

/// Request body for creating or replacing a filter definition
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FilterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 50, message = "View mode must be at most 50 characters"))]
    pub view_mode: Option<String>,

    /// `AND` (default) or `OR`
    pub operator: Option<String>,

    #[serde(default)]
    pub is_default: bool,

    #[serde(default)]
    #[validate(custom(function = "validate_condition_count"))]
    pub conditions: Vec<ConditionRequest>,
}

/// Validator function for the condition list of one filter
pub fn validate_condition_count<T: AsRef<[ConditionRequest]>>(
    conditions: T,
) -> Result<(), ValidationError> {
    if conditions.as_ref().len() > MAX_CONDITIONS_PER_FILTER {
        return Err(ValidationError::new("conditions_too_many").with_message(
            format!(
                "A filter may have at most {} conditions",
                MAX_CONDITIONS_PER_FILTER
            )
            .into(),
        ));
    }
    Ok(())
}

fn invalid(message: String) -> ApiError {
    ApiError::bad_request("INVALID_FILTER", message)
}

fn parse_field(name: Option<&str>, what: &str, position: usize) -> Result<Field, ApiError> {
    let name = name.ok_or_else(|| invalid(format!("Condition {}: {} is required", position, what)))?;
    match Field::parse(name) {
        Field::Unsupported => Err(invalid(format!(
            "Condition {}: unknown {} '{}'",
            position, what, name
        ))),
        field => Ok(field),
    }
}

fn parse_date_field(name: Option<&str>, what: &str, position: usize) -> Result<Field, ApiError> {
    let field = parse_field(name, what, position)?;
    if field.kind() != FieldKind::Date {
        return Err(invalid(format!(
            "Condition {}: {} '{}' is not a date field",
            position, what, field
        )));
    }
    Ok(field)
}

fn parse_operator(op: Option<&str>, position: usize) -> Result<Operator, ApiError> {
    let raw = op.unwrap_or_default();
    match Operator::parse(raw) {
        Operator::Unsupported => Err(invalid(format!(
            "Condition {}: unknown operator '{}'",
            position, raw
        ))),
        op => Ok(op),
    }
}

impl ConditionRequest {
    /// Check names against the known kinds, fields, operators and units and
    /// return the condition in canonical spelling
    fn into_input(self, position: usize) -> Result<ConditionInput, ApiError> {
        let kind = ConditionKind::parse(&self.kind);
        let (field, date_from, date_to, operator, unit) = match kind {
            ConditionKind::List => {
                let field = parse_field(self.field.as_deref(), "field", position)?;
                let op = parse_operator(self.operator.as_deref(), position)?;
                if op == Operator::Between {
                    return Err(invalid(format!(
                        "Condition {}: BETWEEN is only valid for date_range",
                        position
                    )));
                }
                (Some(field), None, None, op, None)
            }
            ConditionKind::DateDiff => {
                let from = parse_date_field(self.date_from.as_deref(), "date_from", position)?;
                let to = parse_date_field(self.date_to.as_deref(), "date_to", position)?;
                let op = parse_operator(self.operator.as_deref(), position)?;
                if op.comparison().is_none() {
                    return Err(invalid(format!(
                        "Condition {}: date_diff needs a comparison operator",
                        position
                    )));
                }
                let unit = DateUnit::parse(self.unit.as_deref()).ok_or_else(|| {
                    invalid(format!("Condition {}: unit must be days or weeks", position))
                })?;
                let unit = match unit {
                    DateUnit::Days => "days",
                    DateUnit::Weeks => "weeks",
                };
                (None, Some(from), Some(to), op, Some(unit.to_string()))
            }
            ConditionKind::DateRange => {
                let field = parse_date_field(self.field.as_deref(), "field", position)?;
                let op = match self.operator.as_deref().map(str::trim) {
                    None | Some("") => Operator::Between,
                    Some(raw) => parse_operator(Some(raw), position)?,
                };
                if op != Operator::Between {
                    return Err(invalid(format!(
                        "Condition {}: date_range only supports BETWEEN",
                        position
                    )));
                }
                (Some(field), None, None, op, None)
            }
            ConditionKind::Unsupported => {
                return Err(invalid(format!(
                    "Condition {}: unknown kind '{}'",
                    position, self.kind
                )));
            }
        };

        Ok(ConditionInput {
            kind: kind.as_str().to_string(),
            field: field.map(|f| f.as_str().to_string()),
            date_from: date_from.map(|f| f.as_str().to_string()),
            date_to: date_to.map(|f| f.as_str().to_string()),
            operator: operator.as_str().to_string(),
            values: self.values,
            unit,
        })
    }
}

impl FilterRequest {
    /// Validate condition names and convert into repository input
    pub fn into_input(self) -> Result<FilterInput, ApiError> {
        let operator = match self.operator.as_deref().map(str::trim) {
            None | Some("") => CombiningOperator::And,
            Some(raw) if raw.eq_ignore_ascii_case("and") => CombiningOperator::And,
            Some(raw) if raw.eq_ignore_ascii_case("or") => CombiningOperator::Or,
            Some(raw) => {
                return Err(invalid(format!(
                    "Unknown filter operator '{}': expected AND or OR",
                    raw
                )));
            }
        };

        let conditions = self
            .conditions
            .into_iter()
            .enumerate()
            .map(|(i, c)| c.into_input(i + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FilterInput {
            name: self.name.trim().to_string(),
            view_mode: self.view_mode,
            operator: operator.as_str().to_string(),
            is_default: self.is_default,
            conditions,
        })
    }
}
