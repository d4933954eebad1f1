//! Unified error type for data layer
//!
//! Wraps storage errors while keeping enough context to tell transient
//! failures (pool exhaustion, timeouts) from permanent ones.

use thiserror::Error;

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// PostgreSQL database error
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// Migration failed
    #[error("Migration {version} ({name}) failed on {backend}: {error}")]
    MigrationFailed {
        backend: &'static str,
        version: i32,
        name: String,
        error: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend not available
    #[error("Backend {backend} is not available: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },

    /// Conflict error (e.g., duplicate entry)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DataError {
    /// Create a PostgreSQL error with preserved context
    pub fn from_postgres(e: sqlx::Error) -> Self {
        Self::Postgres(e)
    }

    /// Create a migration failed error
    pub fn migration_failed(backend: &'static str, version: i32, name: &str, error: &str) -> Self {
        Self::MigrationFailed {
            backend,
            version,
            name: name.to_string(),
            error: error.to_string(),
        }
    }

    /// Create a backend unavailable error
    pub fn backend_unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::BackendUnavailable { .. } => true,
            Self::Postgres(e) => {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            }
            _ => false,
        }
    }

    /// Get the backend name that generated this error
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::MigrationFailed { backend, .. } => backend,
            Self::BackendUnavailable { backend, .. } => backend,
            Self::Config(_) | Self::Conflict(_) => "unknown",
        }
    }
}

/// Convert from the PostgreSQL backend error type
impl From<crate::data::postgres::PostgresError> for DataError {
    fn from(e: crate::data::postgres::PostgresError) -> Self {
        match e {
            crate::data::postgres::PostgresError::Database(sqlx::Error::PoolClosed) => {
                Self::backend_unavailable("postgres", "connection pool is closed")
            }
            crate::data::postgres::PostgresError::Database(e) => Self::Postgres(e),
            crate::data::postgres::PostgresError::MigrationFailed {
                version,
                name,
                error,
            } => Self::migration_failed("postgres", version, &name, &error),
            crate::data::postgres::PostgresError::Config(msg) => Self::Config(msg),
            crate::data::postgres::PostgresError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failed_error_display() {
        let err = DataError::migration_failed("postgres", 2, "add_filters_table", "syntax error");
        assert_eq!(
            err.to_string(),
            "Migration 2 (add_filters_table) failed on postgres: syntax error"
        );
    }

    #[test]
    fn test_backend_unavailable_error_display() {
        let err = DataError::backend_unavailable("postgres", "connection refused");
        assert_eq!(
            err.to_string(),
            "Backend postgres is not available: connection refused"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(DataError::backend_unavailable("postgres", "down").is_transient());
        assert!(DataError::from_postgres(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!DataError::Config("bad config".into()).is_transient());
        assert!(!DataError::from_postgres(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_from_postgres_error() {
        let err: DataError = crate::data::postgres::PostgresError::Conflict("dup".into()).into();
        assert!(matches!(err, DataError::Conflict(_)));
        assert_eq!(err.backend(), "unknown");
    }

    #[test]
    fn test_closed_pool_is_unavailable() {
        let err: DataError =
            crate::data::postgres::PostgresError::Database(sqlx::Error::PoolClosed).into();
        assert!(matches!(err, DataError::BackendUnavailable { .. }));
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_postgres_migration_failure() {
        let err: DataError = crate::data::postgres::PostgresError::MigrationFailed {
            version: 2,
            name: "add_filters_table".into(),
            error: "syntax error".into(),
        }
        .into();
        assert_eq!(err.backend(), "postgres");
        assert_eq!(
            err.to_string(),
            "Migration 2 (add_filters_table) failed on postgres: syntax error"
        );
    }
}
