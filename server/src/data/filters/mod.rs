//! Task filter compilation
//!
//! Persisted filter definitions and inline custom filters are compiled into a
//! parameterized SQL predicate over the task table alias `t`:
//!
//! - `params`: placeholder issuing and bound value collection
//! - `fields`: closed field, operator and kind enums with their SQL mapping
//! - `condition`: one condition to one predicate fragment
//! - `compiler`: cache lookup, grouping and cross-filter combination

mod compiler;
mod condition;
pub mod fields;
mod params;
mod types;

pub use compiler::FilterQueryCompiler;
pub use condition::{CompileContext, compile_condition};
pub use fields::{CombiningOperator, ConditionKind, DateUnit, Field, FieldKind, Operator};
pub use params::{ParameterBuilder, SqlValue};
pub use types::{
    CompiledFilter, CustomFilter, FilterCondition, FilterError, FilterGroup, FilterQuery,
    FilterRow, ThresholdOverrides, group_rows, normalize_filter_name,
};
