//! Student group API endpoints.

use axum::extract::{Path, Query, State};

use super::{success, ApiResult, CacheQuery, RefreshSummary};
use crate::models::Group;
use crate::AppState;

/// GET /api/v1/groups - List all groups.
pub async fn list_groups(
    State(state): State<AppState>,
    Query(params): Query<CacheQuery>,
) -> ApiResult<Vec<Group>> {
    success(state.groups.fetch_all(params.use_cache).await?)
}

/// GET /api/v1/groups/:name - Get a group by number.
pub async fn get_group(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<Group> {
    success(state.groups.fetch_one(&name).await?)
}

/// GET /api/v1/groups/by-id/:id - Get a group by upstream id.
pub async fn get_group_by_id(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Group> {
    success(state.groups.fetch_by_id(id).await?)
}

/// POST /api/v1/groups/refresh - Rewrite all groups from upstream.
pub async fn refresh_groups(State(state): State<AppState>) -> ApiResult<RefreshSummary> {
    let refreshed = state.groups.refresh_all().await?;
    success(RefreshSummary { refreshed })
}

/// POST /api/v1/groups/:name/refresh - Rewrite one group from upstream.
pub async fn refresh_group(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Group> {
    success(state.groups.refresh(&name).await?)
}
