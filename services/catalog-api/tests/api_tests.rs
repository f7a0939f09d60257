//! End-to-end tests of the catalog routes against an in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use catalog_api::{config::ProjectsConfig, router, state::AppState};
use catalog_fetch::{ContentBackend, FetchError, FetchResult, FetcherConfig, ItemsPage};
use serde_json::{json, Value};
use tower::ServiceExt;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct FakeBackend {
    models: HashMap<(String, String), Vec<Value>>,
    delay: Duration,
}

impl FakeBackend {
    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with(mut self, project: &str, model: &str, items: Vec<Value>) -> Self {
        self.models
            .insert((project.to_string(), model.to_string()), items);
        self
    }
}

#[async_trait]
impl ContentBackend for FakeBackend {
    async fn items_page(
        &self,
        project: &str,
        model: &str,
        _page: usize,
        _per_page: usize,
    ) -> FetchResult<ItemsPage> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.models.get(&(project.to_string(), model.to_string())) {
            Some(items) => Ok(ItemsPage {
                items: items.clone(),
                total_count: items.len(),
            }),
            None => Err(FetchError::NotFound(format!("{}/{}", project, model))),
        }
    }
}

fn park(id: &str, pref: &str, city: &str) -> Value {
    json!({
        "id": id,
        "type": "公園",
        "prefecture": pref,
        "city_name": city,
        "data_url": format!("https://example.com/{}/park.geojson", id),
        "data_format": "GeoJSON",
        "year": "2022"
    })
}

const PROJECTS: &str = r#"
projects:
  - alias: a
  - alias: b
    sub_projects: [a]
  - alias: c
    schema: v3
  - alias: empty
"#;

fn app(update_key: Option<&str>) -> Router {
    app_with_delay(update_key, Duration::ZERO)
}

fn app_with_delay(update_key: Option<&str>, delay: Duration) -> Router {
    let legacy = FakeBackend::default()
        .delayed(delay)
        .with("a", "dataset", vec![park("a1", "東京都", "八王子市")])
        .with("b", "dataset", vec![park("b1", "神奈川県", "横浜市")]);
    let structured = FakeBackend::default().with("c", "plateau-city", vec![]);

    let state = AppState::new(
        ProjectsConfig::from_yaml(PROJECTS).unwrap(),
        Arc::new(legacy),
        Arc::new(structured),
        FetcherConfig::default(),
        update_key.map(str::to_string),
    );
    router(Arc::new(state))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, req).await
}

async fn post_json(app: &Router, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let req = Request::builder().method("POST").uri(uri);
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();
    send(app, req).await
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn as_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

// ============================================================================
// Catalog routes
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (status, body) = get(&app(None), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_datacatalog_returns_flat_items() {
    let (status, body) = get(&app(None), "/datacatalog/a").await;
    assert_eq!(status, StatusCode::OK);

    let items = as_json(&body);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], "a1");
    assert_eq!(items[0]["type"], "公園情報");
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let app = app(None);
    let (status, _) = get(&app, "/datacatalog/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/projects/missing/datasets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_project_without_data_is_not_ready() {
    let (status, body) = get(&app(None), "/projects/empty/datasets").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(as_json(&body)["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_datasets_merge_sub_projects() {
    let app = app(None);

    let (status, body) = get(&app, "/projects/b/datasets").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<String> = as_json(&body)
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["d_13_park", "d_14_park"]);

    let (_, body) = get(&app, "/projects/a/datasets").await;
    assert_eq!(as_json(&body).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_sub_projects_build_in_parallel() {
    let app = app_with_delay(None, Duration::from_millis(300));

    let start = Instant::now();
    let (status, body) = get(&app, "/projects/b/datasets").await;
    let elapsed = start.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body).as_array().unwrap().len(), 2);
    // one round of fetches, not one per member
    assert!(elapsed < Duration::from_millis(550), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_datasets_filter_by_area() {
    let (status, body) = get(&app(None), "/projects/b/datasets?area_codes=14").await;
    assert_eq!(status, StatusCode::OK);
    let datasets = as_json(&body);
    assert_eq!(datasets.as_array().unwrap().len(), 1);
    assert_eq!(datasets[0]["prefectureCode"], "14");
}

#[tokio::test]
async fn test_areas_and_years() {
    let app = app(None);

    let (status, body) = get(&app, "/projects/b/areas?area_types=prefecture").await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<String> = as_json(&body)
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(codes, vec!["13", "14"]);

    let (status, body) = get(&app, "/projects/b/years").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!([2022]));
}

#[tokio::test]
async fn test_invalid_query_parameter() {
    let (status, _) = get(&app(None), "/projects/a/areas?area_types=village").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_node_lookup() {
    let app = app(None);
    let (status, body) = get(&app, "/projects/b/nodes/d_14_park").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["id"], "d_14_park");

    let (status, _) = get(&app, "/projects/b/nodes/d_99_park").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_citygml_is_not_found() {
    let (status, _) = get(&app(None), "/projects/a/citygml/13201").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_warnings_only_for_structured_projects() {
    let app = app(None);

    let (status, _) = get(&app, "/projects/a/warnings").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/projects/c/years").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/projects/c/warnings").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().starts_with("updated at: "));
}

// ============================================================================
// Cache update
// ============================================================================

#[tokio::test]
async fn test_update_cache_checks_key() {
    let app = app(Some("secret"));
    get(&app, "/datacatalog/a").await;

    let (status, _) = post_json(&app, "/update-cache", Some(json!({"key": "wrong"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json(&app, "/update-cache", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_json(&app, "/update-cache", Some(json!({"key": "secret"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!("ok"));
}

#[tokio::test]
async fn test_update_cache_without_key_configured() {
    let app = app(None);
    let (status, _) = post_json(&app, "/update-cache", None).await;
    assert_eq!(status, StatusCode::OK);
}
