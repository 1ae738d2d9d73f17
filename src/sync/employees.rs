//! Employee synchronization.

use std::sync::Arc;

use crate::db::CatalogStore;
use crate::errors::AppError;
use crate::models::Employee;
use crate::upstream::ScheduleSource;

/// Cache-aside access to the employee collection.
///
/// Employees are stored once and resolve by either url slug or numeric id.
#[derive(Clone)]
pub struct EmployeeSync {
    source: Arc<dyn ScheduleSource>,
    store: CatalogStore,
}

impl EmployeeSync {
    pub fn new(source: Arc<dyn ScheduleSource>, store: CatalogStore) -> Self {
        Self { source, store }
    }

    pub async fn fetch_all(&self, use_cache: bool) -> Result<Vec<Employee>, AppError> {
        if use_cache {
            match self.store.list_employees().await {
                Ok(cached) if !cached.is_empty() => {
                    tracing::debug!("Serving {} employees from cache", cached.len());
                    return Ok(cached.into_iter().map(|c| c.data).collect());
                }
                Ok(_) => tracing::debug!("Employee cache is empty, fetching from upstream"),
                Err(e) => tracing::warn!("Failed to read cached employees: {}", e),
            }
        }

        let employees = self.source.fetch_employees().await?;
        self.write_through(&employees).await;
        Ok(employees)
    }

    pub async fn fetch_one(&self, url_id: &str) -> Result<Employee, AppError> {
        match self.store.employee_by_url_id(url_id).await {
            Ok(Some(cached)) => return Ok(cached.data),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read cached employee {}: {}", url_id, e),
        }

        self.fetch_all(false)
            .await?
            .into_iter()
            .find(|employee| employee.url_id == url_id)
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", url_id)))
    }

    pub async fn fetch_by_id(&self, id: i64) -> Result<Employee, AppError> {
        match self.store.employee_by_id(id).await {
            Ok(Some(cached)) => return Ok(cached.data),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read cached employee #{}: {}", id, e),
        }

        self.fetch_all(false)
            .await?
            .into_iter()
            .find(|employee| employee.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Employee with id {} not found", id)))
    }

    pub async fn refresh(&self, url_id: &str) -> Result<Employee, AppError> {
        let employee = self
            .source
            .fetch_employees()
            .await?
            .into_iter()
            .find(|employee| employee.url_id == url_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Employee {} not found upstream", url_id))
            })?;

        self.store.upsert_employee(&employee).await?;
        tracing::info!("Refreshed employee {}", url_id);
        Ok(employee)
    }

    pub async fn refresh_all(&self) -> Result<usize, AppError> {
        let employees = self.source.fetch_employees().await?;
        let stored = self.write_through(&employees).await;
        tracing::info!("Refreshed {} of {} employees", stored, employees.len());
        Ok(stored)
    }

    async fn write_through(&self, employees: &[Employee]) -> usize {
        let mut stored = 0;
        for employee in employees {
            match self.store.upsert_employee(employee).await {
                Ok(()) => stored += 1,
                Err(e) => tracing::warn!("Failed to cache employee {}: {}", employee.url_id, e),
            }
        }
        stored
    }
}
