//! Integration tests for the timetable cache HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tempfile::TempDir;

use crate::config::Config;
use crate::db::init_database;
use crate::search::FavoriteSearchIndex;
use crate::sync::test_support::{employee, group, StubSource};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    source: Arc<StubSource>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_index(true).await
    }

    async fn with_index(open_index: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        let config = Config {
            db_path: db_path.clone(),
            index_path: index_path.clone(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            upstream_url: "http://127.0.0.1:9".to_string(),
            upstream_timeout: Duration::from_secs(2),
            store_timeout: Duration::from_secs(5),
        };

        // Initialize database
        let pool = init_database(&db_path, config.store_timeout)
            .await
            .expect("Failed to init DB");

        let search = open_index.then(|| {
            Arc::new(FavoriteSearchIndex::open(&index_path).expect("Failed to init search"))
        });

        let source = StubSource::new(
            vec![group(1, "053501", 1), group(2, "053502", 2)],
            vec![employee(500, "i-ivanov", "PhD")],
        );

        let state = AppState::new(&config, source.clone(), pool, search);
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            source,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn send_json(&self, method: reqwest::Method, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .request(method, self.url(path))
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(format!("{}/health", fixture.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_groups_are_cached_after_first_fetch() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/groups").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["name"], "053501");
    assert_eq!(fixture.source.calls(), 1);

    let (_, body) = fixture.get_json("/groups/053502").await;
    assert_eq!(body["data"]["course"], 2);
    let (_, body) = fixture.get_json("/groups/by-id/1").await;
    assert_eq!(body["data"]["name"], "053501");
    assert_eq!(fixture.source.calls(), 1);

    // Cache bypass goes upstream again
    fixture.get_json("/groups?useCache=false").await;
    assert_eq!(fixture.source.calls(), 2);
}

#[tokio::test]
async fn test_group_refresh_replaces_cached_copy() {
    let fixture = TestFixture::new().await;
    fixture.get_json("/groups").await;

    *fixture.source.groups.lock().unwrap() = vec![group(1, "053501", 4)];

    let (status, body) = fixture
        .send_json(reqwest::Method::POST, "/groups/053501/refresh")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["course"], 4);

    let (_, body) = fixture.get_json("/groups/053501").await;
    assert_eq!(body["data"]["course"], 4);

    let (status, body) = fixture
        .send_json(reqwest::Method::POST, "/groups/refresh")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["refreshed"], 1);
}

#[tokio::test]
async fn test_unknown_keys_are_not_found() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/groups/999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = fixture.get_json("/employees/nobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_employee_endpoints() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/employees/i-ivanov").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["urlId"], "i-ivanov");
    assert_eq!(body["data"]["academicDepartment"][0], "EVM");

    let (_, by_id) = fixture.get_json("/employees/by-id/500").await;
    assert_eq!(by_id["data"], body["data"]);

    let (status, body) = fixture
        .send_json(reqwest::Method::POST, "/employees/refresh")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["refreshed"], 1);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let fixture = TestFixture::new().await;
    fixture.source.set_failing(true);

    let (status, body) = fixture.get_json("/employees").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn test_schedule_lifecycle() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/schedule/group/BUS-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["startDate"], "01.09.2024");
    assert_eq!(body["data"]["studentGroupDto"]["name"], "BUS-1");

    *fixture.source.schedule_start.lock().unwrap() = "03.02.2025".to_string();
    let (_, body) = fixture.get_json("/schedule/group/BUS-1").await;
    assert_eq!(body["data"]["startDate"], "01.09.2024");

    let (_, body) = fixture
        .send_json(reqwest::Method::POST, "/schedule/group/BUS-1/refresh")
        .await;
    assert_eq!(body["data"]["startDate"], "03.02.2025");

    let (_, body) = fixture.get_json("/schedule/group/BUS-1/last-update").await;
    assert_eq!(body["data"]["lastUpdateDate"], "30.08.2024");

    let (_, body) = fixture
        .send_json(reqwest::Method::DELETE, "/schedule/group/BUS-1")
        .await;
    assert_eq!(body["data"]["removed"], true);

    let (_, body) = fixture.get_json("/schedule/employee/ivanov?useCache=false").await;
    assert!(body["data"]["studentGroupDto"].is_null());
    let (_, body) = fixture
        .get_json("/schedule/employee/ivanov/last-update")
        .await;
    assert_eq!(body["data"]["lastUpdateDate"], "29.08.2024");
}

#[tokio::test]
async fn test_favorites_flow() {
    let fixture = TestFixture::new().await;

    for number in ["BUS-1", "BUS-2", "CS-1", "BUS-1"] {
        let (status, body) = fixture
            .send_json(reqwest::Method::POST, &format!("/favorites/{}?user_id=u1", number))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["is_favorite"], true);
    }

    let (_, body) = fixture.get_json("/favorites?user_id=u1").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["user_id"], "u1");

    let (_, body) = fixture.get_json("/favorites/numbers?user_id=u1").await;
    assert_eq!(body["data"], serde_json::json!(["BUS-1", "BUS-2", "CS-1"]));

    let (_, body) = fixture
        .get_json("/favorites/search?user_id=u1&query=bus")
        .await;
    let found: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["group_number"].as_str().unwrap())
        .collect();
    assert_eq!(found, vec!["BUS-1", "BUS-2"]);

    // Default user sees nothing
    let (_, body) = fixture.get_json("/favorites").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = fixture.get_json("/favorites/CS-1/check?user_id=u1").await;
    assert_eq!(body["data"]["is_favorite"], true);

    for _ in 0..2 {
        let (status, _) = fixture
            .send_json(reqwest::Method::DELETE, "/favorites/CS-1?user_id=u1")
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, body) = fixture.get_json("/favorites/CS-1/check?user_id=u1").await;
    assert_eq!(body["data"]["is_favorite"], false);
}

#[tokio::test]
async fn test_favorites_search_without_index() {
    let fixture = TestFixture::with_index(false).await;

    for number in ["BUS-1", "BUS-2", "CS-1"] {
        fixture
            .send_json(reqwest::Method::POST, &format!("/favorites/{}", number))
            .await;
    }

    let (status, body) = fixture.get_json("/favorites/search?query=BUS").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = fixture.get_json("/favorites/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}
