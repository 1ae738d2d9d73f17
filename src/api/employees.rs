//! Employee API endpoints.

use axum::extract::{Path, Query, State};

use super::{success, ApiResult, CacheQuery, RefreshSummary};
use crate::models::Employee;
use crate::AppState;

/// GET /api/v1/employees - List all employees.
pub async fn list_employees(
    State(state): State<AppState>,
    Query(params): Query<CacheQuery>,
) -> ApiResult<Vec<Employee>> {
    success(state.employees.fetch_all(params.use_cache).await?)
}

/// GET /api/v1/employees/:url_id - Get an employee by url slug.
pub async fn get_employee(
    State(state): State<AppState>,
    Path(url_id): Path<String>,
) -> ApiResult<Employee> {
    success(state.employees.fetch_one(&url_id).await?)
}

/// GET /api/v1/employees/by-id/:id - Get an employee by upstream id.
pub async fn get_employee_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Employee> {
    success(state.employees.fetch_by_id(id).await?)
}

/// POST /api/v1/employees/refresh
pub async fn refresh_employees(State(state): State<AppState>) -> ApiResult<RefreshSummary> {
    let refreshed = state.employees.refresh_all().await?;
    success(RefreshSummary { refreshed })
}

/// POST /api/v1/employees/:url_id/refresh
pub async fn refresh_employee(
    State(state): State<AppState>,
    Path(url_id): Path<String>,
) -> ApiResult<Employee> {
    success(state.employees.refresh(&url_id).await?)
}
