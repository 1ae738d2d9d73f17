//! Timetable Cache
//!
//! A cache-aside REST backend for the BSUIR schedule API, with SQLite as the
//! document store and a Tantivy index over favorite groups.

mod api;
mod config;
mod db;
mod errors;
mod favorites;
mod models;
mod normalize;
mod search;
mod sync;
mod upstream;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::{CatalogStore, FavoriteStore};
use favorites::FavoriteIndex;
use search::FavoriteSearchIndex;
use sync::{EmployeeSync, GroupSync, ScheduleSync};
use upstream::{BsuirClient, ScheduleSource};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub groups: GroupSync,
    pub employees: EmployeeSync,
    pub schedules: ScheduleSync,
    pub favorites: FavoriteIndex,
}

impl AppState {
    /// Wire every component over one upstream source and one store pool.
    pub fn new(
        config: &Config,
        source: Arc<dyn ScheduleSource>,
        pool: sqlx::SqlitePool,
        search: Option<Arc<FavoriteSearchIndex>>,
    ) -> Self {
        let catalog = CatalogStore::new(pool.clone(), config.store_timeout);
        let favorite_store = FavoriteStore::new(pool, config.store_timeout);

        Self {
            groups: GroupSync::new(source.clone(), catalog.clone()),
            employees: EmployeeSync::new(source.clone(), catalog.clone()),
            schedules: ScheduleSync::new(source, catalog),
            favorites: FavoriteIndex::new(favorite_store, search),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Timetable Cache");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Upstream: {}", config.upstream_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path, config.store_timeout).await?;

    // Upstream client
    let source = Arc::new(BsuirClient::new(
        config.upstream_url.clone(),
        config.upstream_timeout,
    )?);

    // Search is optional: favorites fall back to scanning the store
    let search = match FavoriteSearchIndex::open(&config.index_path) {
        Ok(index) => Some(Arc::new(index)),
        Err(e) => {
            tracing::warn!("Favorites index unavailable, search will scan the store: {}", e);
            None
        }
    };

    let state = AppState::new(&config, source, pool, search);

    // Build initial search index from database
    match state.favorites.rebuild_search().await {
        Ok(count) => tracing::info!("Favorites index built with {} entries", count),
        Err(e) => tracing::warn!("Failed to build favorites index: {}", e),
    }

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Groups
        .route("/groups", get(api::list_groups))
        .route("/groups/refresh", post(api::refresh_groups))
        .route("/groups/by-id/{id}", get(api::get_group_by_id))
        .route("/groups/{name}", get(api::get_group))
        .route("/groups/{name}/refresh", post(api::refresh_group))
        // Employees
        .route("/employees", get(api::list_employees))
        .route("/employees/refresh", post(api::refresh_employees))
        .route("/employees/by-id/{id}", get(api::get_employee_by_id))
        .route("/employees/{url_id}", get(api::get_employee))
        .route("/employees/{url_id}/refresh", post(api::refresh_employee))
        // Schedules
        .route(
            "/schedule/group/{number}",
            get(api::get_group_schedule).delete(api::evict_group_schedule),
        )
        .route(
            "/schedule/group/{number}/refresh",
            post(api::refresh_group_schedule),
        )
        .route(
            "/schedule/group/{number}/last-update",
            get(api::get_group_last_update),
        )
        .route(
            "/schedule/employee/{url_id}",
            get(api::get_employee_schedule).delete(api::evict_employee_schedule),
        )
        .route(
            "/schedule/employee/{url_id}/refresh",
            post(api::refresh_employee_schedule),
        )
        .route(
            "/schedule/employee/{url_id}/last-update",
            get(api::get_employee_last_update),
        )
        // Favorites
        .route("/favorites", get(api::list_favorites))
        .route("/favorites/search", get(api::search_favorites))
        .route("/favorites/numbers", get(api::list_favorite_numbers))
        .route(
            "/favorites/{number}",
            post(api::add_favorite).delete(api::remove_favorite),
        )
        .route("/favorites/{number}/check", get(api::check_favorite));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
