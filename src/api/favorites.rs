//! Favorite group API endpoints.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::FavoriteGroup;
use crate::AppState;

/// Caller identity. There is no auth, so a missing id means the shared user.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct FavoriteSearchQuery {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub query: String,
}

fn default_user_id() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FavoriteStatus {
    pub group_number: String,
    pub is_favorite: bool,
}

/// GET /api/v1/favorites - List the user's favorites.
pub async fn list_favorites(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> ApiResult<Vec<FavoriteGroup>> {
    success(state.favorites.list_all(&params.user_id).await?)
}

/// GET /api/v1/favorites/numbers - Just the favorite group numbers.
pub async fn list_favorite_numbers(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> ApiResult<Vec<String>> {
    success(state.favorites.group_numbers(&params.user_id).await?)
}

/// GET /api/v1/favorites/search - Substring search over the user's favorites.
pub async fn search_favorites(
    State(state): State<AppState>,
    Query(params): Query<FavoriteSearchQuery>,
) -> ApiResult<Vec<FavoriteGroup>> {
    if params.query.trim().is_empty() {
        return Err(AppError::BadRequest("query is required".to_string()));
    }
    success(state.favorites.search(&params.user_id, &params.query).await?)
}

/// POST /api/v1/favorites/:number - Add a favorite.
pub async fn add_favorite(
    State(state): State<AppState>,
    Path(group_number): Path<String>,
    Query(params): Query<UserQuery>,
) -> ApiResult<FavoriteStatus> {
    state.favorites.add(&params.user_id, &group_number).await?;
    success(FavoriteStatus {
        group_number,
        is_favorite: true,
    })
}

/// DELETE /api/v1/favorites/:number - Remove a favorite.
pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(group_number): Path<String>,
    Query(params): Query<UserQuery>,
) -> ApiResult<FavoriteStatus> {
    state.favorites.remove(&params.user_id, &group_number).await?;
    success(FavoriteStatus {
        group_number,
        is_favorite: false,
    })
}

/// GET /api/v1/favorites/:number/check
pub async fn check_favorite(
    State(state): State<AppState>,
    Path(group_number): Path<String>,
    Query(params): Query<UserQuery>,
) -> ApiResult<FavoriteStatus> {
    let is_favorite = state.favorites.check(&params.user_id, &group_number).await?;
    success(FavoriteStatus {
        group_number,
        is_favorite,
    })
}
