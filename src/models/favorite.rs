//! Favorite group model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A group a user has marked as favorite.
///
/// `id` is absent when the stored identity could not be recovered; the entry
/// is still usable through its `(user_id, group_number)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteGroup {
    pub id: Option<Uuid>,
    pub group_number: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
