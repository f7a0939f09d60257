//! Tests for pagination and the fetch adapters against an in-memory backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog_builder::{FeatureType, PlateauItem};
use catalog_fetch::{
    fetch_all_items, ContentBackend, FetchError, FetchOptions, FetchResult, FetcherConfig,
    ItemsPage, LegacyFetcher, StructuredFetcher,
};
use serde_json::{json, Value};

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Default)]
struct FakeBackend {
    models: HashMap<(String, String), Vec<Value>>,
    failing: HashSet<(String, String)>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeBackend {
    fn with(mut self, project: &str, model: &str, items: Vec<Value>) -> Self {
        self.models
            .insert((project.to_string(), model.to_string()), items);
        self
    }

    fn failing(mut self, project: &str, model: &str) -> Self {
        self.failing
            .insert((project.to_string(), model.to_string()));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentBackend for FakeBackend {
    async fn items_page(
        &self,
        project: &str,
        model: &str,
        page: usize,
        per_page: usize,
    ) -> FetchResult<ItemsPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let key = (project.to_string(), model.to_string());
        if self.failing.contains(&key) {
            return Err(FetchError::Status {
                status: 500,
                url: format!("fake://{}/{}", project, model),
            });
        }
        let Some(items) = self.models.get(&key) else {
            return Err(FetchError::NotFound(format!("{}/{}", project, model)));
        };

        let start = ((page - 1) * per_page).min(items.len());
        let end = (start + per_page).min(items.len());
        Ok(ItemsPage {
            items: items[start..end].to_vec(),
            total_count: items.len(),
        })
    }
}

fn plateau(id: &str, city: &str) -> Value {
    json!({"id": id, "city_name": city, "prefecture": "東京都"})
}

fn legacy(backend: FakeBackend) -> (LegacyFetcher, Arc<FakeBackend>) {
    let backend = Arc::new(backend);
    let fetcher = LegacyFetcher::new(backend.clone(), FetcherConfig::default());
    (fetcher, backend)
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_fetch_all_items_preserves_page_order() {
    let items: Vec<Value> = (0..250).map(|i| json!({"id": format!("i{:03}", i)})).collect();
    let backend = FakeBackend::default().with("p", "plateau", items);

    let result: Vec<PlateauItem> = fetch_all_items(&backend, "p", "plateau", 2, 100)
        .await
        .unwrap();

    assert_eq!(result.len(), 250);
    assert_eq!(result[0].id, "i000");
    assert_eq!(result[100].id, "i100");
    assert_eq!(result[249].id, "i249");
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn test_fetch_all_items_empty_model() {
    let backend = FakeBackend::default().with("p", "plateau", vec![]);
    let result: Vec<PlateauItem> = fetch_all_items(&backend, "p", "plateau", 10, 100)
        .await
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_undecodable_record_is_a_hard_error() {
    let backend = FakeBackend::default().with("p", "plateau", vec![json!({"bldg": "not a list"})]);
    let result = fetch_all_items::<PlateauItem>(&backend, "p", "plateau", 10, 100).await;
    assert!(matches!(result, Err(FetchError::Decode { .. })));
}

#[test]
fn test_fetch_all_items_unknown_model_is_not_found() {
    let backend = FakeBackend::default();
    let result = tokio_test::block_on(fetch_all_items::<PlateauItem>(
        &backend, "p", "plateau", 10, 100,
    ));
    assert!(result.unwrap_err().is_not_found());
}

// ============================================================================
// Legacy adapter
// ============================================================================

#[tokio::test]
async fn test_legacy_partial_not_found_is_empty() {
    let (fetcher, _) = legacy(
        FakeBackend::default().with("p", "dataset", vec![json!({"id": "d1", "type": "公園"})]),
    );

    let res = fetcher.fetch("p", &FetchOptions::default()).await.unwrap();
    assert!(res.plateau.is_empty());
    assert!(res.usecase.is_empty());
    assert_eq!(res.dataset.len(), 1);
    assert_eq!(res.dataset[0].type_name, "公園");
}

#[tokio::test]
async fn test_legacy_all_not_found() {
    let (fetcher, _) = legacy(FakeBackend::default());
    let err = fetcher
        .fetch("missing", &FetchOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_legacy_subproject_only_counts_when_issued() {
    // the main project is gone but the sub-project answers
    let (fetcher, _) = legacy(
        FakeBackend::default().with(
            "sub",
            "plateau",
            vec![plateau("s1", "八王子市"), plateau("s2", "町田市")],
        ),
    );
    let opts = FetchOptions {
        subproject: Some("sub".to_string()),
        city_name: Some("八王子市".to_string()),
        ..Default::default()
    };

    let res = fetcher.fetch("p", &opts).await.unwrap();
    assert_eq!(res.plateau.len(), 1);
    assert_eq!(res.plateau[0].id, "s1");
}

#[tokio::test]
async fn test_legacy_subproject_requires_city_name() {
    let (fetcher, backend) = legacy(
        FakeBackend::default()
            .with("p", "plateau", vec![plateau("p1", "八王子市")])
            .with("sub", "plateau", vec![plateau("s1", "八王子市")]),
    );
    let opts = FetchOptions {
        subproject: Some("sub".to_string()),
        ..Default::default()
    };

    let res = fetcher.fetch("p", &opts).await.unwrap();
    assert_eq!(res.plateau.len(), 1);
    assert_eq!(res.plateau[0].id, "p1");
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn test_legacy_other_errors_abort() {
    let (fetcher, _) = legacy(
        FakeBackend::default()
            .with("p", "plateau", vec![plateau("p1", "八王子市")])
            .failing("p", "usecase"),
    );
    let err = fetcher.fetch("p", &FetchOptions::default()).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_legacy_hides_usecase_city_and_ward() {
    let (fetcher, _) = legacy(FakeBackend::default().with(
        "p",
        "usecase",
        vec![json!({"id": "u1", "city_name": "東京都23区/港区"})],
    ));
    let opts = FetchOptions {
        hide_usecase_city_and_ward: true,
        ..Default::default()
    };

    let res = fetcher.fetch("p", &opts).await.unwrap();
    assert!(res.usecase[0].hide_city_and_ward);
    assert!(res.usecase_items()[0].city_admin.is_empty());
}

#[tokio::test]
async fn test_legacy_timeout() {
    let backend = FakeBackend {
        delay: Some(Duration::from_millis(500)),
        ..Default::default()
    }
    .with("p", "plateau", vec![]);
    let fetcher = LegacyFetcher::new(
        Arc::new(backend),
        FetcherConfig {
            timeout: Duration::from_millis(20),
            ..Default::default()
        },
    );

    let err = fetcher.fetch("p", &FetchOptions::default()).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }));
}

// ============================================================================
// Structured adapter
// ============================================================================

#[tokio::test]
async fn test_structured_fetch() {
    let backend = FakeBackend::default()
        .with(
            "p",
            "plateau-city",
            vec![json!({"id": "c1", "city_name": "八王子市", "city_code": "13201", "year": "2023年"})],
        )
        .with(
            "p",
            "plateau-bldg",
            vec![json!({
                "id": "f1",
                "city": "c1",
                "data": [{"id": "a1", "url": "https://a/13201_hachioji-shi_2023_3dtiles_1_op_bldg_lod1.zip"}]
            })],
        );
    let fetcher = StructuredFetcher::new(Arc::new(backend), FetcherConfig::default());

    let items = fetcher.fetch("p").await.unwrap();
    assert_eq!(items.cities.len(), 1);
    assert_eq!(items.cities[0].year_int(), 2023);
    assert_eq!(items.features.len(), 1);
    assert_eq!(items.features[&FeatureType::Bldg][0].data[0].id(), "a1");
}

#[tokio::test]
async fn test_structured_missing_city_model() {
    let backend = FakeBackend::default().with("p", "plateau-bldg", vec![]);
    let fetcher = StructuredFetcher::new(Arc::new(backend), FetcherConfig::default());
    assert!(fetcher.fetch("p").await.unwrap_err().is_not_found());
}
