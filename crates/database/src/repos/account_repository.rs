//! Account repository for database operations.
//!
//! The aggregate is stored as a JSON document next to the scalar columns
//! used for lookups. The password hash has its own column and never enters
//! the document.

use lectern_learning::{Account, AccountId, AccountStore, LearningError, LearningResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::types::errors::map_write_error;
use crate::types::{DatabaseError, DatabaseResult};

const SELECT_ACCOUNT: &str = "SELECT id, email, password_hash, document FROM accounts";

/// Repository for account database operations
#[derive(Clone)]
pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Replace the stored credential. Kept apart from `save` so aggregate
    /// writes never touch the hash.
    pub async fn update_password_hash(&self, id: AccountId, hash: &str) -> LearningResult<()> {
        let result = sqlx::query("UPDATE accounts SET password_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(LearningError::not_found(format!("Account {id}")));
        }
        Ok(())
    }
}

fn decode_optional(row: Option<SqliteRow>) -> LearningResult<Option<Account>> {
    match row {
        Some(row) => Ok(Some(decode_account(&row)?)),
        None => Ok(None),
    }
}

fn decode_account(row: &SqliteRow) -> DatabaseResult<Account> {
    let document: String = row.try_get("document")?;
    let mut account: Account = serde_json::from_str(&document)?;
    account.id = row.try_get("id")?;
    account.email = row.try_get("email")?;
    account.password_hash = row.try_get("password_hash")?;
    Ok(account)
}

fn encode_document(account: &Account) -> DatabaseResult<String> {
    Ok(serde_json::to_string(account)?)
}

impl AccountStore for SqliteAccountRepository {
    async fn create(&self, mut account: Account) -> LearningResult<Account> {
        let document = encode_document(&account)?;

        let result = sqlx::query(
            "INSERT INTO accounts (public_id, email, password_hash, role, is_active, subscription_active, subscription_end, document, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&account.public_id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(account.subscription.active)
        .bind(account.subscription.end_date)
        .bind(&document)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        account.id = result.last_insert_rowid();
        debug!(account_id = account.id, "account row inserted");
        Ok(account)
    }

    async fn find_by_id(&self, id: AccountId) -> LearningResult<Option<Account>> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        decode_optional(row)
    }

    async fn find_by_public_id(&self, public_id: &str) -> LearningResult<Option<Account>> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        decode_optional(row)
    }

    async fn find_by_email(&self, email: &str) -> LearningResult<Option<Account>> {
        let row = sqlx::query(&format!("{SELECT_ACCOUNT} WHERE email = ?"))
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        decode_optional(row)
    }

    async fn save(&self, account: &Account) -> LearningResult<()> {
        let document = encode_document(account)?;

        let result = sqlx::query(
            "UPDATE accounts
             SET role = ?, is_active = ?, subscription_active = ?, subscription_end = ?, document = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(account.subscription.active)
        .bind(account.subscription.end_date)
        .bind(&document)
        .bind(account.updated_at)
        .bind(account.id)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(LearningError::not_found(format!("Account {}", account.id)));
        }
        Ok(())
    }

    async fn list_subscribed(&self) -> LearningResult<Vec<Account>> {
        let sql = format!("{SELECT_ACCOUNT} WHERE subscription_active = TRUE ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        rows.iter()
            .map(|row| decode_account(row).map_err(LearningError::from))
            .collect()
    }
}
