//! PostgreSQL repositories
//!
//! Free functions over `&PgPool`, wrapped by the trait implementations in
//! `repository_impl`.

pub mod filter;
pub mod task;

pub use task::TASK_FILTER_START_INDEX;
