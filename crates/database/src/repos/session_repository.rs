//! Session repository for database operations.

use chrono::{DateTime, Utc};
use lectern_learning::{AccountId, LearningResult, SessionRecord, SessionStore};
use sqlx::{Row, SqlitePool};

use crate::types::DatabaseError;

/// Repository for bearer session rows
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Drop sessions that expired before `at`. Returns the number removed.
    pub async fn purge_expired(&self, at: DateTime<Utc>) -> LearningResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(result.rows_affected())
    }
}

impl SessionStore for SqliteSessionRepository {
    async fn create(&self, session: SessionRecord) -> LearningResult<()> {
        sqlx::query(
            "INSERT INTO sessions (token, account_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.account_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn find(&self, token: &str) -> LearningResult<Option<SessionRecord>> {
        let row = sqlx::query(
            "SELECT token, account_id, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let session = SessionRecord {
            token: row.try_get("token").map_err(DatabaseError::from)?,
            account_id: row.try_get("account_id").map_err(DatabaseError::from)?,
            created_at: row.try_get("created_at").map_err(DatabaseError::from)?,
            expires_at: row.try_get("expires_at").map_err(DatabaseError::from)?,
        };
        Ok(Some(session))
    }

    async fn delete(&self, token: &str) -> LearningResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn delete_for_account(&self, account_id: AccountId) -> LearningResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(result.rows_affected())
    }
}
