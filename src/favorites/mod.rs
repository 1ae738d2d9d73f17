//! Favorite groups per user.
//!
//! The store is the source of truth. The search index is a secondary copy:
//! failing to update it only logs, and any search the index cannot answer is
//! served by a substring scan over the store instead. After a failed index
//! write every search scans until the index is rebuilt.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::db::FavoriteStore;
use crate::errors::AppError;
use crate::models::FavoriteGroup;
use crate::search::FavoriteSearchIndex;

/// Maximum results returned by a favorites search.
pub const SEARCH_LIMIT: usize = 100;

#[derive(Clone)]
pub struct FavoriteIndex {
    store: FavoriteStore,
    search: Option<Arc<FavoriteSearchIndex>>,
    /// Set when an index write failed; cleared by a successful rebuild
    index_stale: Arc<AtomicBool>,
}

impl FavoriteIndex {
    /// `search` is `None` when the index could not be opened.
    pub fn new(store: FavoriteStore, search: Option<Arc<FavoriteSearchIndex>>) -> Self {
        Self {
            store,
            search,
            index_stale: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reload the search index from the store. Returns the number indexed.
    pub async fn rebuild_search(&self) -> Result<usize, AppError> {
        let Some(search) = &self.search else {
            return Ok(0);
        };
        let favorites = self.store.list_every().await?;
        search.rebuild(&favorites).await?;
        self.index_stale.store(false, Ordering::SeqCst);
        Ok(favorites.len())
    }

    pub async fn list_all(&self, user_id: &str) -> Result<Vec<FavoriteGroup>, AppError> {
        self.store.list(user_id).await
    }

    pub async fn group_numbers(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .list_all(user_id)
            .await?
            .into_iter()
            .map(|favorite| favorite.group_number)
            .collect())
    }

    /// Mark a group as favorite. Re-adding only advances `updated_at`.
    pub async fn add(&self, user_id: &str, group_number: &str) -> Result<(), AppError> {
        if group_number.trim().is_empty() {
            return Err(AppError::InvalidRecord(
                "Group number is required".to_string(),
            ));
        }

        let now = Utc::now();
        let favorite = FavoriteGroup {
            id: None,
            group_number: group_number.to_string(),
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.upsert(&favorite).await?;

        if let Some(search) = &self.search {
            if let Err(e) = search.index_favorite(user_id, group_number).await {
                self.mark_index_stale(group_number, &e);
            }
        }

        Ok(())
    }

    /// Remove a favorite. Removing one that does not exist is not an error.
    pub async fn remove(&self, user_id: &str, group_number: &str) -> Result<(), AppError> {
        if !self.store.delete(user_id, group_number).await? {
            tracing::debug!("Favorite {} was not present for {}", group_number, user_id);
        }

        if let Some(search) = &self.search {
            if let Err(e) = search.remove_favorite(user_id, group_number).await {
                self.mark_index_stale(group_number, &e);
            }
        }

        Ok(())
    }

    pub async fn check(&self, user_id: &str, group_number: &str) -> Result<bool, AppError> {
        Ok(self.store.count(user_id, group_number).await? > 0)
    }

    /// Favorites of `user_id` whose group number contains `query`, ignoring case.
    pub async fn search(&self, user_id: &str, query: &str) -> Result<Vec<FavoriteGroup>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::BadRequest("Search query is required".to_string()));
        }

        match self.search_index(user_id, query).await {
            Ok(found) => Ok(found),
            Err(e) => {
                tracing::warn!("Index search unavailable, scanning favorites: {}", e);
                self.store.scan(user_id, query, SEARCH_LIMIT).await
            }
        }
    }

    async fn search_index(&self, user_id: &str, query: &str) -> Result<Vec<FavoriteGroup>, AppError> {
        let search = self
            .search
            .as_ref()
            .ok_or_else(|| AppError::Search("Favorites index is not open".to_string()))?;
        if self.index_stale.load(Ordering::SeqCst) {
            return Err(AppError::Search(
                "Favorites index is out of date".to_string(),
            ));
        }

        let hits: HashSet<String> = search.search(user_id, query)?.into_iter().collect();

        // Order and cap exactly like the scan so both paths agree
        Ok(self
            .store
            .list(user_id)
            .await?
            .into_iter()
            .filter(|favorite| hits.contains(&favorite.group_number))
            .take(SEARCH_LIMIT)
            .collect())
    }

    fn mark_index_stale(&self, group_number: &str, err: &AppError) {
        tracing::warn!(
            "Favorites index write failed for {}, searching the store until rebuild: {}",
            group_number,
            err
        );
        self.index_stale.store(true, Ordering::SeqCst);
    }
}
