//! Document store for the upstream catalog: groups, employees and schedules.
//!
//! Every write is a single `INSERT ... ON CONFLICT DO UPDATE` on the natural
//! key, so concurrent writers never need a read-modify-write. `created_at` is
//! only ever written on insert.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::time::Duration;

use super::{bounded, last_update_stamp, parse_timestamp};
use crate::errors::AppError;
use crate::models::{Cached, Employee, Group, Schedule, ScheduleRecord, ScheduleSubject};
use crate::normalize::{repair_identity_field, select_schedule_filter};

/// Store for the collections owned by the sync engine.
#[derive(Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    // ==================== GROUP OPERATIONS ====================

    /// List all cached groups, skipping documents that no longer decode.
    pub async fn list_groups(&self) -> Result<Vec<Cached<Group>>, AppError> {
        let rows = bounded(
            self.timeout,
            sqlx::query(
                "SELECT bsuir_id, data, last_update_date, created_at, updated_at FROM cached_groups ORDER BY name",
            )
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(decode_listed(&rows, "group"))
    }

    /// Get a cached group by its number.
    pub async fn group_by_name(&self, name: &str) -> Result<Option<Cached<Group>>, AppError> {
        let row = bounded(
            self.timeout,
            sqlx::query(
                "SELECT bsuir_id, data, last_update_date, created_at, updated_at FROM cached_groups WHERE name = ? LIMIT 1",
            )
            .bind(name)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(decode_keyed).transpose()
    }

    /// Get a cached group by its upstream id.
    pub async fn group_by_id(&self, id: i64) -> Result<Option<Cached<Group>>, AppError> {
        let row = bounded(
            self.timeout,
            sqlx::query(
                "SELECT bsuir_id, data, last_update_date, created_at, updated_at FROM cached_groups WHERE bsuir_id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(decode_keyed).transpose()
    }

    /// Insert or overwrite a group keyed by its upstream id.
    pub async fn upsert_group(&self, group: &Group) -> Result<(), AppError> {
        let now = Utc::now();
        let data = serde_json::to_string(group)?;

        bounded(
            self.timeout,
            sqlx::query(
                r#"INSERT INTO cached_groups (bsuir_id, name, data, last_update_date, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)
                   ON CONFLICT(bsuir_id) DO UPDATE SET
                       name = excluded.name,
                       data = excluded.data,
                       last_update_date = excluded.last_update_date,
                       updated_at = excluded.updated_at"#,
            )
            .bind(group.id)
            .bind(&group.name)
            .bind(&data)
            .bind(last_update_stamp(now))
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    // ==================== EMPLOYEE OPERATIONS ====================

    /// List all cached employees, skipping documents that no longer decode.
    pub async fn list_employees(&self) -> Result<Vec<Cached<Employee>>, AppError> {
        let rows = bounded(
            self.timeout,
            sqlx::query(
                "SELECT bsuir_id, data, last_update_date, created_at, updated_at FROM cached_employees ORDER BY url_id",
            )
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(decode_listed(&rows, "employee"))
    }

    /// Get a cached employee by url slug.
    pub async fn employee_by_url_id(
        &self,
        url_id: &str,
    ) -> Result<Option<Cached<Employee>>, AppError> {
        let row = bounded(
            self.timeout,
            sqlx::query(
                "SELECT bsuir_id, data, last_update_date, created_at, updated_at FROM cached_employees WHERE url_id = ?",
            )
            .bind(url_id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(decode_keyed).transpose()
    }

    /// Get a cached employee by upstream id.
    pub async fn employee_by_id(&self, id: i64) -> Result<Option<Cached<Employee>>, AppError> {
        let row = bounded(
            self.timeout,
            sqlx::query(
                "SELECT bsuir_id, data, last_update_date, created_at, updated_at FROM cached_employees WHERE bsuir_id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(decode_keyed).transpose()
    }

    /// Insert or overwrite an employee keyed by upstream id.
    ///
    /// The url slug moves with the document. A slug already held by a
    /// different employee fails with `Duplicate`.
    pub async fn upsert_employee(&self, employee: &Employee) -> Result<(), AppError> {
        let now = Utc::now();
        let data = serde_json::to_string(employee)?;

        bounded(
            self.timeout,
            sqlx::query(
                r#"INSERT INTO cached_employees (bsuir_id, url_id, data, last_update_date, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)
                   ON CONFLICT(bsuir_id) DO UPDATE SET
                       url_id = excluded.url_id,
                       data = excluded.data,
                       last_update_date = excluded.last_update_date,
                       updated_at = excluded.updated_at"#,
            )
            .bind(employee.id)
            .bind(&employee.url_id)
            .bind(&data)
            .bind(last_update_stamp(now))
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    // ==================== SCHEDULE OPERATIONS ====================

    /// Get the cached schedule for a group or an employee.
    pub async fn schedule_for(
        &self,
        subject: &ScheduleSubject,
    ) -> Result<Option<Cached<Schedule>>, AppError> {
        let sql = format!(
            "SELECT data, last_update_date, created_at, updated_at FROM cached_schedules WHERE {} = ?",
            subject.key_column()
        );
        let row = bounded(
            self.timeout,
            sqlx::query(&sql)
                .bind(subject.key())
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref()
            .map(|row| {
                let data: Schedule = serde_json::from_str(row.try_get("data")?)?;
                cached_from_row(row, data)
            })
            .transpose()
    }

    /// Insert or overwrite a schedule, matching only on whichever key the
    /// record fills. Returns the key that was used.
    pub async fn upsert_schedule(
        &self,
        record: &ScheduleRecord,
    ) -> Result<ScheduleSubject, AppError> {
        let subject = select_schedule_filter(record)?;
        let (group_number, employee_url_id) = match &subject {
            ScheduleSubject::ByGroup(number) => (Some(number.as_str()), None),
            ScheduleSubject::ByEmployee(url_id) => (None, Some(url_id.as_str())),
        };

        let now = Utc::now();
        let data = serde_json::to_string(&record.data)?;
        let sql = format!(
            r#"INSERT INTO cached_schedules (group_number, employee_url_id, data, last_update_date, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT({}) DO UPDATE SET
                   data = excluded.data,
                   last_update_date = excluded.last_update_date,
                   updated_at = excluded.updated_at"#,
            subject.key_column()
        );

        bounded(
            self.timeout,
            sqlx::query(&sql)
                .bind(group_number)
                .bind(employee_url_id)
                .bind(&data)
                .bind(last_update_stamp(now))
                .bind(now.to_rfc3339())
                .bind(now.to_rfc3339())
                .execute(&self.pool),
        )
        .await?;

        Ok(subject)
    }

    /// Delete a cached schedule. Returns whether a document was removed.
    pub async fn delete_schedule(&self, subject: &ScheduleSubject) -> Result<bool, AppError> {
        let sql = format!(
            "DELETE FROM cached_schedules WHERE {} = ?",
            subject.key_column()
        );
        let result = bounded(
            self.timeout,
            sqlx::query(&sql).bind(subject.key()).execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// Helper functions for row conversion

/// Decode a row whose payload carries the numeric `id` mirrored in `bsuir_id`.
/// The column is authoritative when the payload's copy is malformed.
fn decode_keyed<T: DeserializeOwned>(row: &SqliteRow) -> Result<Cached<T>, AppError> {
    let bsuir_id: i64 = row.try_get("bsuir_id")?;
    let mut doc: Value = serde_json::from_str(row.try_get("data")?)?;
    repair_identity_field::<i64>(&mut doc, "id", Some(bsuir_id));
    cached_from_row(row, serde_json::from_value(doc)?)
}

fn decode_listed<T: DeserializeOwned>(rows: &[SqliteRow], kind: &str) -> Vec<Cached<T>> {
    rows.iter()
        .filter_map(|row| match decode_keyed(row) {
            Ok(cached) => Some(cached),
            Err(e) => {
                tracing::warn!("Skipping undecodable cached {}: {}", kind, e);
                None
            }
        })
        .collect()
}

fn cached_from_row<T>(row: &SqliteRow, data: T) -> Result<Cached<T>, AppError> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(Cached {
        data,
        last_update_date: row.try_get("last_update_date")?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}
