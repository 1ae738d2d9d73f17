//! Student group synchronization.

use std::sync::Arc;

use crate::db::CatalogStore;
use crate::errors::AppError;
use crate::models::Group;
use crate::upstream::ScheduleSource;

/// Cache-aside access to the student group collection.
#[derive(Clone)]
pub struct GroupSync {
    source: Arc<dyn ScheduleSource>,
    store: CatalogStore,
}

impl GroupSync {
    pub fn new(source: Arc<dyn ScheduleSource>, store: CatalogStore) -> Self {
        Self { source, store }
    }

    /// All groups. With `use_cache`, a non-empty cache is returned without
    /// contacting upstream.
    pub async fn fetch_all(&self, use_cache: bool) -> Result<Vec<Group>, AppError> {
        if use_cache {
            match self.store.list_groups().await {
                Ok(cached) if !cached.is_empty() => {
                    tracing::debug!("Serving {} groups from cache", cached.len());
                    return Ok(cached.into_iter().map(|c| c.data).collect());
                }
                Ok(_) => tracing::debug!("Group cache is empty, fetching from upstream"),
                Err(e) => tracing::warn!("Failed to read cached groups: {}", e),
            }
        }

        let groups = self.source.fetch_groups().await?;
        self.write_through(&groups).await;
        Ok(groups)
    }

    /// A group by number: the store first, then a full upstream fetch.
    pub async fn fetch_one(&self, name: &str) -> Result<Group, AppError> {
        match self.store.group_by_name(name).await {
            Ok(Some(cached)) => return Ok(cached.data),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read cached group {}: {}", name, e),
        }

        self.fetch_all(false)
            .await?
            .into_iter()
            .find(|group| group.name == name)
            .ok_or_else(|| AppError::NotFound(format!("Group {} not found", name)))
    }

    /// A group by upstream id, with the same fallback as [`Self::fetch_one`].
    pub async fn fetch_by_id(&self, id: i64) -> Result<Group, AppError> {
        match self.store.group_by_id(id).await {
            Ok(Some(cached)) => return Ok(cached.data),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read cached group #{}: {}", id, e),
        }

        self.fetch_all(false)
            .await?
            .into_iter()
            .find(|group| group.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Group with id {} not found", id)))
    }

    /// Overwrite the stored group with the current upstream version.
    ///
    /// Upstream only serves the whole list, so it is fetched and the matching
    /// item written. A failed write is returned to the caller.
    pub async fn refresh(&self, name: &str) -> Result<Group, AppError> {
        let group = self
            .source
            .fetch_groups()
            .await?
            .into_iter()
            .find(|group| group.name == name)
            .ok_or_else(|| AppError::NotFound(format!("Group {} not found upstream", name)))?;

        self.store.upsert_group(&group).await?;
        tracing::info!("Refreshed group {}", name);
        Ok(group)
    }

    /// Rewrite every group from upstream. Returns how many were stored.
    pub async fn refresh_all(&self) -> Result<usize, AppError> {
        let groups = self.source.fetch_groups().await?;
        let stored = self.write_through(&groups).await;
        tracing::info!("Refreshed {} of {} groups", stored, groups.len());
        Ok(stored)
    }

    async fn write_through(&self, groups: &[Group]) -> usize {
        let mut stored = 0;
        for group in groups {
            match self.store.upsert_group(group).await {
                Ok(()) => stored += 1,
                Err(e) => tracing::warn!("Failed to cache group {}: {}", group.name, e),
            }
        }
        stored
    }
}
