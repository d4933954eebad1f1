//! Data storage layer
//!
//! - `postgres` - PostgreSQL service, schema and repositories
//! - `filters` - Compiles saved and custom task filters into SQL predicates
//! - `cache` - TTL cache for fetched filter definitions
//! - `types` - Shared row and input types
//! - `traits` - Repository traits consumed by the compiler and API layer
//! - `error` - Unified error type for the data layer

pub mod cache;
pub mod error;
pub mod filters;
pub mod postgres;
pub mod traits;
pub mod types;

pub use postgres::PostgresService;

// Re-export unified error type
pub use error::DataError;

// Re-export repository traits
pub use traits::{FilterStore, TaskRepository};
