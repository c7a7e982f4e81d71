//! Lectern Database Crate
//!
//! SQLite persistence for the learning engine: connection setup, migrations,
//! and the `AccountStore` / `SessionStore` implementations.

use lectern_config::DatabaseConfig;

pub mod connection;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};
pub use repos::{SqliteAccountRepository, SqliteSessionRepository};
pub use types::{DatabaseError, DatabaseResult};

pub use sqlx::SqlitePool;

/// Connect and bring the schema up to date
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}
