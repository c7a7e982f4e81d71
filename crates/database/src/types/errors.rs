//! Error types for the database layer

use lectern_learning::LearningError;
use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Stored document is corrupt: {0}")]
    CorruptDocument(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::CorruptDocument(err.to_string())
    }
}

impl From<DatabaseError> for LearningError {
    fn from(err: DatabaseError) -> Self {
        LearningError::Storage(err.to_string())
    }
}

/// Map a write failure, turning the email uniqueness constraint into a domain error.
pub(crate) fn map_write_error(err: sqlx::Error) -> LearningError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            if db.message().contains("email") {
                LearningError::EmailAlreadyExists
            } else {
                LearningError::Storage(db.message().to_string())
            }
        }
        _ => DatabaseError::from(err).into(),
    }
}
