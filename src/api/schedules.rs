//! Schedule API endpoints.
//!
//! Every handler exists once per subject kind; the path decides which key the
//! schedule is stored under.

use axum::extract::{Path, Query, State};
use serde::Serialize;

use super::{success, ApiResult, CacheQuery};
use crate::models::{LastUpdate, Schedule, ScheduleSubject};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct EvictResult {
    pub removed: bool,
}

async fn fetch(state: &AppState, subject: ScheduleSubject, use_cache: bool) -> ApiResult<Schedule> {
    success(state.schedules.fetch(&subject, use_cache).await?)
}

async fn refresh(state: &AppState, subject: ScheduleSubject) -> ApiResult<Schedule> {
    success(state.schedules.refresh(&subject).await?)
}

async fn last_update(state: &AppState, subject: ScheduleSubject) -> ApiResult<LastUpdate> {
    success(state.schedules.last_update(&subject).await?)
}

async fn evict(state: &AppState, subject: ScheduleSubject) -> ApiResult<EvictResult> {
    let removed = state.schedules.evict(&subject).await?;
    success(EvictResult { removed })
}

/// GET /api/v1/schedule/group/:number
pub async fn get_group_schedule(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Query(params): Query<CacheQuery>,
) -> ApiResult<Schedule> {
    fetch(&state, ScheduleSubject::ByGroup(number), params.use_cache).await
}

/// POST /api/v1/schedule/group/:number/refresh
pub async fn refresh_group_schedule(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<Schedule> {
    refresh(&state, ScheduleSubject::ByGroup(number)).await
}

/// GET /api/v1/schedule/group/:number/last-update
pub async fn get_group_last_update(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<LastUpdate> {
    last_update(&state, ScheduleSubject::ByGroup(number)).await
}

/// DELETE /api/v1/schedule/group/:number
pub async fn evict_group_schedule(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> ApiResult<EvictResult> {
    evict(&state, ScheduleSubject::ByGroup(number)).await
}

/// GET /api/v1/schedule/employee/:url_id
pub async fn get_employee_schedule(
    State(state): State<AppState>,
    Path(url_id): Path<String>,
    Query(params): Query<CacheQuery>,
) -> ApiResult<Schedule> {
    fetch(&state, ScheduleSubject::ByEmployee(url_id), params.use_cache).await
}

/// POST /api/v1/schedule/employee/:url_id/refresh
pub async fn refresh_employee_schedule(
    State(state): State<AppState>,
    Path(url_id): Path<String>,
) -> ApiResult<Schedule> {
    refresh(&state, ScheduleSubject::ByEmployee(url_id)).await
}

/// GET /api/v1/schedule/employee/:url_id/last-update
pub async fn get_employee_last_update(
    State(state): State<AppState>,
    Path(url_id): Path<String>,
) -> ApiResult<LastUpdate> {
    last_update(&state, ScheduleSubject::ByEmployee(url_id)).await
}

/// DELETE /api/v1/schedule/employee/:url_id
pub async fn evict_employee_schedule(
    State(state): State<AppState>,
    Path(url_id): Path<String>,
) -> ApiResult<EvictResult> {
    evict(&state, ScheduleSubject::ByEmployee(url_id)).await
}
