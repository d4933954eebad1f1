//! PostgreSQL error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostgresError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    MigrationFailed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}
