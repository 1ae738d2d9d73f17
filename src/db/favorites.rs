//! Document store for favorite groups.
//!
//! Rows may predate the current writer and carry an array-encoded `id`, so every
//! read goes through the normalizer instead of decoding columns directly.

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::time::Duration;

use super::bounded;
use crate::errors::AppError;
use crate::models::FavoriteGroup;
use crate::normalize::{decode_stored_value, reconcile_favorite};

const FAVORITE_COLUMNS: &str = "id, user_id, group_number, created_at, updated_at";

/// Store for the favorites collection, owned by the favorite index.
#[derive(Clone)]
pub struct FavoriteStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl FavoriteStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// List a user's favorites ordered by group number.
    pub async fn list(&self, user_id: &str) -> Result<Vec<FavoriteGroup>, AppError> {
        let sql = format!(
            "SELECT {} FROM favorite_groups WHERE user_id = ? ORDER BY group_number",
            FAVORITE_COLUMNS
        );
        let rows = bounded(
            self.timeout,
            sqlx::query(&sql).bind(user_id).fetch_all(&self.pool),
        )
        .await?;

        Ok(reconcile_rows(&rows))
    }

    /// List every favorite of every user.
    pub async fn list_every(&self) -> Result<Vec<FavoriteGroup>, AppError> {
        let sql = format!(
            "SELECT {} FROM favorite_groups ORDER BY user_id, group_number",
            FAVORITE_COLUMNS
        );
        let rows = bounded(self.timeout, sqlx::query(&sql).fetch_all(&self.pool)).await?;

        Ok(reconcile_rows(&rows))
    }

    /// Insert the pair or, if it already exists, advance its `updated_at`.
    /// `id` and `created_at` are only written on insert.
    pub async fn upsert(&self, favorite: &FavoriteGroup) -> Result<(), AppError> {
        let id = favorite.id.unwrap_or_else(uuid::Uuid::new_v4);

        bounded(
            self.timeout,
            sqlx::query(
                r#"INSERT INTO favorite_groups (id, user_id, group_number, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT(user_id, group_number) DO UPDATE SET
                       updated_at = excluded.updated_at"#,
            )
            .bind(id.to_string())
            .bind(&favorite.user_id)
            .bind(&favorite.group_number)
            .bind(favorite.created_at.to_rfc3339())
            .bind(favorite.updated_at.to_rfc3339())
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    /// Delete the pair. Returns whether anything was removed.
    pub async fn delete(&self, user_id: &str, group_number: &str) -> Result<bool, AppError> {
        let result = bounded(
            self.timeout,
            sqlx::query("DELETE FROM favorite_groups WHERE user_id = ? AND group_number = ?")
                .bind(user_id)
                .bind(group_number)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count documents for the pair (0 or 1 under the unique constraint).
    pub async fn count(&self, user_id: &str, group_number: &str) -> Result<i64, AppError> {
        bounded(
            self.timeout,
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM favorite_groups WHERE user_id = ? AND group_number = ?",
            )
            .bind(user_id)
            .bind(group_number)
            .fetch_one(&self.pool),
        )
        .await
    }

    /// Case-insensitive substring scan over one user's group numbers.
    pub async fn scan(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FavoriteGroup>, AppError> {
        let needle = query.to_lowercase();

        Ok(self
            .list(user_id)
            .await?
            .into_iter()
            .filter(|favorite| favorite.group_number.to_lowercase().contains(&needle))
            .take(limit)
            .collect())
    }
}

/// Turn raw rows into favorites, dropping rows without a usable key pair.
fn reconcile_rows(rows: &[SqliteRow]) -> Vec<FavoriteGroup> {
    rows.iter()
        .filter_map(|row| match raw_document(row) {
            Ok(raw) => {
                let favorite = reconcile_favorite(&raw);
                if favorite.is_none() {
                    tracing::warn!("Skipping favorite without user/group: {:?}", raw);
                }
                favorite
            }
            Err(e) => {
                tracing::warn!("Failed to decode favorite document (raw): {}", e);
                None
            }
        })
        .collect()
}

fn raw_document(row: &SqliteRow) -> Result<Map<String, Value>, sqlx::Error> {
    let mut raw = Map::new();
    let id: String = row.try_get("id")?;
    raw.insert("_id".to_string(), decode_stored_value(&id));
    for column in ["user_id", "group_number", "created_at", "updated_at"] {
        let value: Option<String> = row.try_get(column)?;
        raw.insert(
            column.to_string(),
            value.map(Value::String).unwrap_or(Value::Null),
        );
    }
    Ok(raw)
}
