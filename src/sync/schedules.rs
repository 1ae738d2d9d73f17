//! Schedule synchronization for groups and employees.

use std::sync::Arc;

use crate::db::CatalogStore;
use crate::errors::AppError;
use crate::models::{LastUpdate, Schedule, ScheduleRecord, ScheduleSubject};
use crate::upstream::ScheduleSource;

/// Cache-aside access to schedules, each keyed by its [`ScheduleSubject`].
#[derive(Clone)]
pub struct ScheduleSync {
    source: Arc<dyn ScheduleSource>,
    store: CatalogStore,
}

impl ScheduleSync {
    pub fn new(source: Arc<dyn ScheduleSource>, store: CatalogStore) -> Self {
        Self { source, store }
    }

    /// The schedule for `subject`, from the store when `use_cache` and present.
    pub async fn fetch(&self, subject: &ScheduleSubject, use_cache: bool) -> Result<Schedule, AppError> {
        if use_cache {
            match self.store.schedule_for(subject).await {
                Ok(Some(cached)) => {
                    tracing::debug!(
                        "Serving schedule for {} from cache, stored {}",
                        subject,
                        cached.last_update_date
                    );
                    return Ok(cached.data);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Failed to read cached schedule for {}: {}", subject, e),
            }
        }

        let schedule = self.fetch_upstream(subject).await?;
        let record = ScheduleRecord::new(subject, schedule.clone());
        if let Err(e) = self.store.upsert_schedule(&record).await {
            tracing::warn!("Failed to cache schedule for {}: {}", subject, e);
        }
        Ok(schedule)
    }

    /// Fetch from upstream and overwrite the stored schedule. A failed write
    /// is returned to the caller.
    pub async fn refresh(&self, subject: &ScheduleSubject) -> Result<Schedule, AppError> {
        let schedule = self.fetch_upstream(subject).await?;
        self.store
            .upsert_schedule(&ScheduleRecord::new(subject, schedule.clone()))
            .await?;
        tracing::info!("Refreshed schedule for {}", subject);
        Ok(schedule)
    }

    /// Upstream's own last-update date for the subject's schedule.
    pub async fn last_update(&self, subject: &ScheduleSubject) -> Result<LastUpdate, AppError> {
        match subject {
            ScheduleSubject::ByGroup(_) => self.source.group_last_update(subject.key()).await,
            ScheduleSubject::ByEmployee(_) => {
                self.source.employee_last_update(subject.key()).await
            }
        }
    }

    /// Drop the cached schedule. Returns whether one existed.
    pub async fn evict(&self, subject: &ScheduleSubject) -> Result<bool, AppError> {
        let removed = self.store.delete_schedule(subject).await?;
        if removed {
            tracing::info!("Evicted cached schedule for {}", subject);
        }
        Ok(removed)
    }

    async fn fetch_upstream(&self, subject: &ScheduleSubject) -> Result<Schedule, AppError> {
        match subject {
            ScheduleSubject::ByGroup(_) => self.source.fetch_group_schedule(subject.key()).await,
            ScheduleSubject::ByEmployee(_) => {
                self.source.fetch_employee_schedule(subject.key()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{temp_pool, TEST_TIMEOUT};
    use crate::sync::test_support::StubSource;

    fn by_group(number: &str) -> ScheduleSubject {
        ScheduleSubject::ByGroup(number.to_string())
    }

    fn by_employee(url_id: &str) -> ScheduleSubject {
        ScheduleSubject::ByEmployee(url_id.to_string())
    }

    #[tokio::test]
    async fn test_cached_schedule_is_served_until_refresh() {
        let (pool, _temp_dir) = temp_pool().await;
        let store = CatalogStore::new(pool, TEST_TIMEOUT);
        let source = StubSource::new(vec![], vec![]);
        let sync = ScheduleSync::new(source.clone(), store);
        let subject = by_group("BUS-1");

        let first = sync.fetch(&subject, true).await.unwrap();
        *source.schedule_start.lock().unwrap() = "02.02.2025".to_string();

        assert_eq!(sync.fetch(&subject, true).await.unwrap(), first);
        assert_eq!(source.calls(), 1);

        let refreshed = sync.refresh(&subject).await.unwrap();
        assert_eq!(refreshed.start_date.as_deref(), Some("02.02.2025"));
        assert_eq!(sync.fetch(&subject, true).await.unwrap(), refreshed);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_group_and_employee_schedules_are_separate() {
        let (pool, _temp_dir) = temp_pool().await;
        let store = CatalogStore::new(pool, TEST_TIMEOUT);
        let source = StubSource::new(vec![], vec![]);
        let sync = ScheduleSync::new(source.clone(), store.clone());

        sync.refresh(&by_group("BUS-1")).await.unwrap();
        sync.refresh(&by_employee("ivanov")).await.unwrap();

        let group_doc = store.schedule_for(&by_group("BUS-1")).await.unwrap().unwrap();
        let employee_doc = store
            .schedule_for(&by_employee("ivanov"))
            .await
            .unwrap()
            .unwrap();
        assert!(group_doc.data.student_group_dto.is_some());
        assert!(employee_doc.data.student_group_dto.is_none());
    }

    #[tokio::test]
    async fn test_refresh_surfaces_store_failure_but_fetch_does_not() {
        let (pool, _temp_dir) = temp_pool().await;
        let store = CatalogStore::new(pool.clone(), TEST_TIMEOUT);
        let source = StubSource::new(vec![], vec![]);
        let sync = ScheduleSync::new(source.clone(), store);
        pool.close().await;

        assert!(sync.fetch(&by_group("BUS-1"), true).await.is_ok());
        assert!(matches!(
            sync.refresh(&by_group("BUS-1")).await.unwrap_err(),
            AppError::StoreUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_evict_and_last_update() {
        let (pool, _temp_dir) = temp_pool().await;
        let store = CatalogStore::new(pool, TEST_TIMEOUT);
        let source = StubSource::new(vec![], vec![]);
        let sync = ScheduleSync::new(source.clone(), store);
        let subject = by_employee("ivanov");

        sync.fetch(&subject, false).await.unwrap();
        assert!(sync.evict(&subject).await.unwrap());
        assert!(!sync.evict(&subject).await.unwrap());

        let last = sync.last_update(&subject).await.unwrap();
        assert_eq!(last.last_update_date.as_deref(), Some("29.08.2024"));
    }

    #[tokio::test]
    async fn test_padded_key_reads_back_what_it_wrote() {
        let (pool, _temp_dir) = temp_pool().await;
        let store = CatalogStore::new(pool, TEST_TIMEOUT);
        let source = StubSource::new(vec![], vec![]);
        let sync = ScheduleSync::new(source.clone(), store.clone());
        let padded = by_group(" BUS-1 ");

        let first = sync.fetch(&padded, true).await.unwrap();
        assert_eq!(
            first.student_group_dto.and_then(|dto| dto.name).as_deref(),
            Some("BUS-1")
        );
        sync.fetch(&padded, true).await.unwrap();
        assert_eq!(source.calls(), 1);

        assert!(store.schedule_for(&by_group("BUS-1")).await.unwrap().is_some());
        assert!(sync.evict(&padded).await.unwrap());
        assert!(store.schedule_for(&by_group("BUS-1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        let (pool, _temp_dir) = temp_pool().await;
        let store = CatalogStore::new(pool, TEST_TIMEOUT);
        let source = StubSource::new(vec![], vec![]);
        source.set_failing(true);
        let sync = ScheduleSync::new(source.clone(), store);

        let err = sync.fetch(&by_group("BUS-1"), true).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }
}
