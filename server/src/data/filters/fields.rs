//! Field and operator mapping
//!
//! Logical field names, operators and combining logic arrive as free-form
//! strings (from stored filter rows or request JSON). They are parsed into
//! closed enums here; unknown input becomes an explicit `Unsupported` variant,
//! so request text is never spliced into generated SQL.

use std::fmt;

use serde::Deserialize;

/// Alias of the task table in the listing query
pub const TASK_ALIAS: &str = "t";

/// Literal that stands for the authenticated user in assignee conditions
pub const CURRENT_USER_TOKEN: &str = "current_user_id";

/// Logical task field (or pseudo-field) a condition can reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Field {
    Status,
    Priority,
    Title,
    View,
    DueDate,
    CompletionDate,
    CreatedDate,
    LastModified,
    StartDate,
    /// Current date, evaluated by the database at execution time
    Today,
    Category,
    Tag,
    /// Many-to-many relation through `task_assignees`
    Assignee,
    #[default]
    Unsupported,
}

/// How a field is compared and how its literals are bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Id,
    Relation,
    Unsupported,
}

impl Field {
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "status" => Self::Status,
            "priority" => Self::Priority,
            "title" => Self::Title,
            "view" => Self::View,
            "due_date" => Self::DueDate,
            "completion_date" => Self::CompletionDate,
            "created_date" => Self::CreatedDate,
            "last_modified" => Self::LastModified,
            "start_date" => Self::StartDate,
            "today" => Self::Today,
            "category" => Self::Category,
            "tag" => Self::Tag,
            "assignee" => Self::Assignee,
            _ => Self::Unsupported,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Status | Self::Priority | Self::Title | Self::View => FieldKind::Text,
            Self::DueDate
            | Self::CompletionDate
            | Self::CreatedDate
            | Self::LastModified
            | Self::StartDate
            | Self::Today => FieldKind::Date,
            Self::Category | Self::Tag => FieldKind::Id,
            Self::Assignee => FieldKind::Relation,
            Self::Unsupported => FieldKind::Unsupported,
        }
    }

    /// Physical column of the task table backing this field
    pub fn column(self) -> Option<&'static str> {
        match self {
            Self::Status => Some("status"),
            Self::Priority => Some("priority"),
            Self::Title => Some("title"),
            Self::View => Some("view"),
            Self::DueDate => Some("due_date"),
            Self::CompletionDate => Some("completed_at"),
            Self::CreatedDate => Some("created_at"),
            Self::LastModified => Some("updated_at"),
            Self::StartDate => Some("start_date"),
            Self::Category => Some("category_id"),
            Self::Tag => Some("tag_id"),
            Self::Today | Self::Assignee | Self::Unsupported => None,
        }
    }

    /// Expression of the field as stored (qualified with the task alias)
    pub fn expression(self) -> Option<String> {
        if self == Self::Today {
            return Some("CURRENT_DATE".to_string());
        }
        self.column().map(|col| format!("{}.{}", TASK_ALIAS, col))
    }

    /// Expression truncated to a calendar date, for date fields only
    pub fn date_expression(self) -> Option<String> {
        match self {
            Self::Today => Some("CURRENT_DATE".to_string()),
            _ if self.kind() == FieldKind::Date => {
                self.expression().map(|expr| format!("{}::date", expr))
            }
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Title => "title",
            Self::View => "view",
            Self::DueDate => "due_date",
            Self::CompletionDate => "completion_date",
            Self::CreatedDate => "created_date",
            Self::LastModified => "last_modified",
            Self::StartDate => "start_date",
            Self::Today => "today",
            Self::Category => "category",
            Self::Tag => "tag",
            Self::Assignee => "assignee",
            Self::Unsupported => "unsupported",
        }
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Operator {
    Eq,
    Ne,
    In,
    IsNull,
    IsNotNull,
    Lt,
    Lte,
    Gt,
    Gte,
    Between,
    #[default]
    Unsupported,
}

impl Operator {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Self::Eq,
            "!=" | "<>" => Self::Ne,
            "IN" => Self::In,
            "IS_NULL" | "IS NULL" => Self::IsNull,
            "IS_NOT_NULL" | "IS NOT NULL" => Self::IsNotNull,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "BETWEEN" => Self::Between,
            _ => Self::Unsupported,
        }
    }

    /// SQL symbol for operators that compare against one bound scalar
    pub fn comparison(self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::Ne => Some("!="),
            Self::Lt => Some("<"),
            Self::Lte => Some("<="),
            Self::Gt => Some(">"),
            Self::Gte => Some(">="),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::In => "IN",
            Self::IsNull => "IS_NULL",
            Self::IsNotNull => "IS_NOT_NULL",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Between => "BETWEEN",
            Self::Unsupported => "UNSUPPORTED",
        }
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// Logic joining the conditions of one filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum CombiningOperator {
    #[default]
    And,
    Or,
}

impl CombiningOperator {
    /// Anything other than `OR` combines with `AND` (the narrower reading)
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }

    pub fn joiner(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl From<String> for CombiningOperator {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// Condition kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ConditionKind {
    List,
    DateDiff,
    DateRange,
    #[default]
    Unsupported,
}

impl ConditionKind {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "list" => Self::List,
            "date_diff" => Self::DateDiff,
            "date_range" => Self::DateRange,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::DateDiff => "date_diff",
            Self::DateRange => "date_range",
            Self::Unsupported => "unsupported",
        }
    }
}

impl From<String> for ConditionKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// Unit of a date_diff threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Days,
    Weeks,
}

impl DateUnit {
    /// Absent unit means days; unknown units yield `None`
    pub fn parse(unit: Option<&str>) -> Option<Self> {
        match unit.map(|u| u.trim().to_ascii_lowercase()) {
            None => Some(Self::Days),
            Some(u) if u.is_empty() || u == "day" || u == "days" => Some(Self::Days),
            Some(u) if u == "week" || u == "weeks" => Some(Self::Weeks),
            Some(_) => None,
        }
    }

    /// Number of days in one unit
    pub fn days(self) -> i64 {
        match self {
            Self::Days => 1,
            Self::Weeks => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_fields_map_to_task_timestamps() {
        assert_eq!(Field::parse("due_date").expression().unwrap(), "t.due_date");
        assert_eq!(
            Field::parse("completion_date").expression().unwrap(),
            "t.completed_at"
        );
        assert_eq!(
            Field::parse("created_date").expression().unwrap(),
            "t.created_at"
        );
        assert_eq!(
            Field::parse("last_modified").date_expression().unwrap(),
            "t.updated_at::date"
        );
    }

    #[test]
    fn today_is_evaluated_by_the_database() {
        assert_eq!(Field::Today.expression().unwrap(), "CURRENT_DATE");
        assert_eq!(Field::Today.date_expression().unwrap(), "CURRENT_DATE");
        assert_eq!(Field::Today.column(), None);
    }

    #[test]
    fn category_and_tag_map_to_foreign_keys() {
        assert_eq!(Field::parse("category").expression().unwrap(), "t.category_id");
        assert_eq!(Field::parse("tag").expression().unwrap(), "t.tag_id");
        assert_eq!(Field::Category.kind(), FieldKind::Id);
    }

    #[test]
    fn assignee_has_no_column() {
        assert_eq!(Field::Assignee.kind(), FieldKind::Relation);
        assert_eq!(Field::Assignee.expression(), None);
    }

    #[test]
    fn unknown_field_is_unsupported() {
        assert_eq!(Field::parse("t.id; DROP TABLE tasks"), Field::Unsupported);
        assert_eq!(Field::Unsupported.expression(), None);
        assert_eq!(Field::Status.date_expression(), None);
    }

    #[test]
    fn operators_parse_case_insensitively() {
        assert_eq!(Operator::parse("in"), Operator::In);
        assert_eq!(Operator::parse("is null"), Operator::IsNull);
        assert_eq!(Operator::parse("IS_NOT_NULL"), Operator::IsNotNull);
        assert_eq!(Operator::parse("<>"), Operator::Ne);
        assert_eq!(Operator::parse("LIKE"), Operator::Unsupported);
        assert_eq!(Operator::Lte.comparison(), Some("<="));
        assert_eq!(Operator::In.comparison(), None);
    }

    #[test]
    fn combining_operator_defaults_to_and() {
        assert_eq!(CombiningOperator::parse("or"), CombiningOperator::Or);
        assert_eq!(CombiningOperator::parse("AND"), CombiningOperator::And);
        assert_eq!(CombiningOperator::parse("xor"), CombiningOperator::And);
    }

    #[test]
    fn date_units() {
        assert_eq!(DateUnit::parse(None), Some(DateUnit::Days));
        assert_eq!(DateUnit::parse(Some("Weeks")), Some(DateUnit::Weeks));
        assert_eq!(DateUnit::parse(Some("fortnight")), None);
        assert_eq!(DateUnit::Weeks.days(), 7);
    }

    #[test]
    fn deserializes_from_strings() {
        let field: Field = serde_json::from_str(r#""priority""#).unwrap();
        let op: Operator = serde_json::from_str(r#""BETWEEN""#).unwrap();
        let kind: ConditionKind = serde_json::from_str(r#""date_diff""#).unwrap();
        assert_eq!(field, Field::Priority);
        assert_eq!(op, Operator::Between);
        assert_eq!(kind, ConditionKind::DateDiff);
    }
}
