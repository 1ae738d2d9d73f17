//! Database module for SQLite persistence.
//!
//! SQLite plays the document store: every collection keeps its natural keys in
//! indexed columns and the payload as a JSON document.

mod catalog;
mod favorites;

pub use catalog::*;
pub use favorites::*;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::AppError;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path, timeout: Duration) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(timeout)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cached_groups (
            bsuir_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            data TEXT NOT NULL,
            last_update_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cached_employees (
            bsuir_id INTEGER NOT NULL UNIQUE,
            url_id TEXT NOT NULL UNIQUE,
            data TEXT NOT NULL,
            last_update_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // NULLs never collide under UNIQUE, so each key column only constrains
    // the documents that actually use it.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cached_schedules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_number TEXT UNIQUE,
            employee_url_id TEXT UNIQUE,
            data TEXT NOT NULL,
            last_update_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((group_number IS NULL) <> (employee_url_id IS NULL))
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorite_groups (
            id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            group_number TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, group_number)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_cached_groups_name ON cached_groups(name);
        CREATE INDEX IF NOT EXISTS idx_favorite_groups_user_id ON favorite_groups(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Run a store call under `limit`, surfacing a timeout as `StoreUnavailable`.
///
/// Dropping the returned future abandons the call, which is how callers cancel.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => {
            tracing::error!("Store call exceeded {:?}", limit);
            Err(AppError::StoreUnavailable(format!(
                "Store call timed out after {:?}",
                limit
            )))
        }
    }
}

/// Local write date in the `dd.mm.yyyy` form the upstream API uses.
pub fn last_update_stamp(now: DateTime<Utc>) -> String {
    now.format("%d.%m.%Y").to_string()
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Fresh database in a temp dir. Keep the `TempDir` alive for the test.
    pub async fn temp_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let pool = init_database(&temp_dir.path().join("test.sqlite"), TEST_TIMEOUT)
            .await
            .expect("Failed to init DB");
        (pool, temp_dir)
    }
}
