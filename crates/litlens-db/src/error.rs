//! Database error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DbError {
    /// Maps constraint violations on a write to `Conflict`/`NotFound`.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return DbError::Conflict(format!("{} already exists", what));
            }
            if db_err.is_foreign_key_violation() {
                return DbError::NotFound(format!("{} references a missing row", what));
            }
        }
        DbError::Sqlx(err)
    }
}
