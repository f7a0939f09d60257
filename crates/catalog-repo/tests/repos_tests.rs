//! Snapshot, merger and cache manager behaviour.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog_common::{CatalogItem, Family};
use catalog_fetch::{
    ContentBackend, FetchError, FetchOptions, FetchResult, FetcherConfig, ItemsPage,
    LegacyFetcher,
};
use catalog_repo::{
    DatasetsQuery, InMemoryRepo, LegacySource, Merger, Repo, RepoError, Repos, Snapshot, SnapshotSource,
    StaticSource,
};
use serde_json::{json, Value};

// ============================================================================
// Fixtures
// ============================================================================

fn bldg(city_code: &str, city: &str, year: i32) -> CatalogItem {
    CatalogItem {
        id: format!("{}_city_bldg", city_code),
        name: format!("建築物モデル（{}）", city),
        pref: "東京都".to_string(),
        pref_code: "13".to_string(),
        city: city.to_string(),
        city_code: city_code.to_string(),
        type_name: "建築物モデル".to_string(),
        type_en: "bldg".to_string(),
        format: "3dtiles".to_string(),
        url: format!("https://example.com/{}/{}/tileset.json", year, city_code),
        year,
        spec: "第2.3版".to_string(),
        edition: "2022".to_string(),
        family: Family::Plateau,
        ..Default::default()
    }
}

fn published(mut item: CatalogItem) -> CatalogItem {
    item.sdk_public = true;
    item.citygml_url = format!("https://example.com/{}/{}_citygml.zip", item.year, item.city_code);
    item.max_lod_url = format!("https://example.com/{}/maxlod.csv", item.year);
    item.citygml_feature_types = vec!["bldg".to_string(), "tran".to_string()];
    item
}

fn repo(name: &str, items: Vec<CatalogItem>) -> Arc<dyn Repo> {
    Arc::new(InMemoryRepo::new(name, Arc::new(Snapshot::build(items))))
}

/// A source whose failures can be switched on and off.
#[derive(Default)]
struct SwitchSource {
    items: Vec<CatalogItem>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl SwitchSource {
    fn new(items: Vec<CatalogItem>) -> Arc<Self> {
        Arc::new(Self {
            items,
            ..Default::default()
        })
    }

    fn fail(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for SwitchSource {
    async fn fetch_items(&self) -> FetchResult<Vec<CatalogItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Status {
                status: 502,
                url: "fake://cms".to_string(),
            });
        }
        Ok(self.items.clone())
    }
}

/// A source that takes a while; each call yields the next year.
struct SlowSource {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowSource {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for SlowSource {
    async fn fetch_items(&self) -> FetchResult<Vec<CatalogItem>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) as i32;
        tokio::time::sleep(self.delay).await;
        Ok(vec![bldg("13201", "八王子市", 2022 + n)])
    }
}

/// Content backend answering from fixed model contents.
#[derive(Default)]
struct FakeBackend {
    models: HashMap<(String, String), Vec<Value>>,
}

impl FakeBackend {
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
        match self.models.get(&(project.to_string(), model.to_string())) {
            Some(items) => Ok(ItemsPage {
                items: items.clone(),
                total_count: items.len(),
            }),
            None => Err(FetchError::NotFound(format!("{}/{}", project, model))),
        }
    }
}

fn legacy_source(backend: FakeBackend, project: &str) -> Arc<dyn SnapshotSource> {
    let fetcher = LegacyFetcher::new(Arc::new(backend), FetcherConfig::default());
    Arc::new(LegacySource::new(fetcher, project, FetchOptions::default()))
}

// ============================================================================
// Snapshot
// ============================================================================

#[test]
fn test_citygml_greater_year_wins() {
    let snapshot = Snapshot::build(vec![
        published(bldg("13201", "八王子市", 2022)),
        published(CatalogItem {
            id: "13201_city_tran".to_string(),
            type_en: "tran".to_string(),
            type_name: "道路モデル".to_string(),
            ..bldg("13201", "八王子市", 2020)
        }),
    ]);

    assert_eq!(snapshot.citygml.len(), 1);
    let cg = &snapshot.citygml["13201"];
    assert_eq!(cg.year, 2022);
    assert_eq!(cg.id, "cg_13201");
    assert_eq!(cg.url, "https://example.com/2022/13201_citygml.zip");
}

#[test]
fn test_citygml_later_record_with_greater_year_replaces() {
    let snapshot = Snapshot::build(vec![
        published(bldg("13201", "八王子市", 2020)),
        published(bldg("13201", "八王子市", 2022)),
    ]);
    assert_eq!(snapshot.citygml["13201"].year, 2022);
}

#[test]
fn test_unpublished_city_has_no_citygml() {
    let snapshot = Snapshot::build(vec![bldg("13201", "八王子市", 2022)]);
    assert!(snapshot.citygml.is_empty());
    assert_eq!(snapshot.datasets.len(), 1);
}

// ============================================================================
// Merger
// ============================================================================

#[test]
fn test_merger_prefers_latest_generation() {
    let old = repo("v2", vec![published(bldg("13201", "八王子市", 2020))]);
    let new = repo(
        "v3",
        vec![published(CatalogItem {
            spec: "第3.0版".to_string(),
            ..bldg("13201", "八王子市", 2023)
        })],
    );
    let merger = Merger::new(vec![old, new]).unwrap();

    assert_eq!(merger.name(), "merger(v2,v3)");

    let datasets = merger.datasets(&DatasetsQuery::default()).unwrap();
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].year, 2023);

    let cg = merger.citygml("13201").unwrap().unwrap();
    assert_eq!(cg.year, 2023);

    assert_eq!(merger.years().unwrap(), vec![2020, 2023]);
}

#[test]
fn test_merger_keeps_distinct_areas_sorted_by_id() {
    let a = repo("a", vec![bldg("13201", "八王子市", 2022)]);
    let b = repo("b", vec![bldg("13100", "東京都23区", 2022)]);
    let merger = Merger::new(vec![a, b]).unwrap();

    let codes: Vec<String> = merger
        .areas(&Default::default())
        .unwrap()
        .into_iter()
        .map(|a| a.code)
        .collect();
    // c_13100, c_13201, p_13
    assert_eq!(codes, vec!["13100", "13201", "13"]);
}

#[test]
fn test_merger_orders_dataset_types() {
    let a = repo(
        "a",
        vec![CatalogItem {
            id: "13201_city_tran".to_string(),
            type_en: "tran".to_string(),
            type_name: "道路モデル".to_string(),
            ..bldg("13201", "八王子市", 2022)
        }],
    );
    let b = repo("b", vec![bldg("13100", "東京都23区", 2022)]);
    let merger = Merger::new(vec![a, b]).unwrap();

    let types = merger.dataset_types(&Default::default()).unwrap();
    let codes: Vec<&str> = types.iter().map(|t| t.code.as_str()).collect();
    assert_eq!(codes, vec!["bldg", "tran"]);
    assert_eq!(types[0].order, Some(1));
    assert_eq!(types[1].order, Some(2));
}

// ============================================================================
// Cache manager
// ============================================================================

#[tokio::test]
async fn test_prepare_is_idempotent() {
    let repos = Repos::new();
    let source = SwitchSource::new(vec![bldg("13201", "八王子市", 2022)]);

    repos.prepare("p", source.clone()).await.unwrap();
    repos.prepare("p", source.clone()).await.unwrap();

    assert_eq!(source.calls(), 1);
    assert_eq!(repos.projects().await, vec!["p"]);
    assert!(repos.updated_at("p").await.is_some());
}

#[tokio::test]
async fn test_concurrent_prepare_shares_one_build() {
    let repos = Arc::new(Repos::new());
    let source = SlowSource::new(Duration::from_millis(200));

    let first = {
        let repos = repos.clone();
        let source = source.clone();
        tokio::spawn(async move {
            repos.prepare("p", source).await.unwrap();
            repos.snapshot("p").await.is_some()
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    repos.prepare("p", source.clone()).await.unwrap();
    assert!(repos.snapshot("p").await.is_some());
    assert!(first.await.unwrap());
    assert_eq!(source.calls(), 1);
    assert_eq!(repos.projects().await, vec!["p"]);
}

#[tokio::test]
async fn test_update_waits_for_running_prepare() {
    let repos = Arc::new(Repos::new());
    let source = SlowSource::new(Duration::from_millis(200));

    let first = {
        let repos = repos.clone();
        let source = source.clone();
        tokio::spawn(async move { repos.prepare("p", source).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let updated = repos.update("p").await.unwrap();
    first.await.unwrap().unwrap();

    assert_eq!(source.calls(), 2);
    assert_eq!(updated.items[0].year, 2023);
    let current = repos.snapshot("p").await.unwrap();
    assert!(Arc::ptr_eq(&current, &updated));
}

#[tokio::test]
async fn test_repo_reports_missing_snapshot() {
    let repos = Repos::new();
    assert!(matches!(
        repos.repo("p").await,
        Err(RepoError::UnknownProject(_))
    ));

    let source = SwitchSource::new(vec![bldg("13201", "八王子市", 2022)]);
    source.fail(true);
    assert!(repos.prepare("p", source.clone()).await.is_err());
    assert!(matches!(repos.repo("p").await, Err(RepoError::NotReady(_))));

    source.fail(false);
    repos.update("p").await.unwrap();
    assert!(repos.repo("p").await.is_ok());
}

#[tokio::test]
async fn test_failed_update_keeps_previous_snapshot() {
    let repos = Repos::new();
    let source = SwitchSource::new(vec![bldg("13201", "八王子市", 2022)]);
    repos.prepare("p", source.clone()).await.unwrap();
    let before = repos.snapshot("p").await.unwrap();

    source.fail(true);
    let err = repos.update("p").await.unwrap_err();
    assert!(matches!(err, RepoError::Update { .. }));

    let after = repos.snapshot("p").await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.datasets.len(), 1);

    source.fail(false);
    let rebuilt = repos.update("p").await.unwrap();
    assert!(!Arc::ptr_eq(&before, &rebuilt));
}

#[tokio::test]
async fn test_readers_keep_their_generation() {
    let repos = Repos::new();
    repos
        .prepare("p", Arc::new(StaticSource(vec![bldg("13201", "八王子市", 2022)])))
        .await
        .unwrap();

    let reader = repos.repo("p").await.unwrap();
    repos.update("p").await.unwrap();

    // the old facade still answers from the snapshot it was created with
    assert_eq!(reader.datasets(&DatasetsQuery::default()).unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_prepare_can_be_retried() {
    let repos = Repos::new();
    let source = SwitchSource::new(vec![bldg("13201", "八王子市", 2022)]);
    source.fail(true);

    assert!(repos.prepare("p", source.clone()).await.is_err());
    assert!(repos.snapshot("p").await.is_none());
    assert!(repos.warnings("p").await.is_empty());

    source.fail(false);
    repos.prepare("p", source.clone()).await.unwrap();
    assert!(repos.snapshot("p").await.is_some());
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_update_unknown_project() {
    let repos = Repos::new();
    let err = repos.update("missing").await.unwrap_err();
    assert!(matches!(err, RepoError::UnknownProject(_)));
}

#[tokio::test]
async fn test_update_all_rebuilds_every_project() {
    let repos = Repos::new();
    let a = SwitchSource::new(vec![bldg("13201", "八王子市", 2022)]);
    let b = SwitchSource::new(vec![bldg("13100", "東京都23区", 2022)]);
    repos.prepare("a", a.clone()).await.unwrap();
    repos.prepare("b", b.clone()).await.unwrap();

    repos.update_all().await.unwrap();
    assert_eq!(a.calls(), 2);
    assert_eq!(b.calls(), 2);

    b.fail(true);
    assert!(repos.update_all().await.is_err());
    assert!(repos.snapshot("b").await.is_some());
}

// ============================================================================
// Three-source fetch through the manager
// ============================================================================

#[tokio::test]
async fn test_partial_not_found_builds_from_available_source() {
    let backend = FakeBackend::default().with(
        "p",
        "dataset",
        vec![json!({
            "id": "d1",
            "type": "公園",
            "prefecture": "東京都",
            "city_name": "八王子市",
            "data_url": "https://example.com/park.geojson",
            "data_format": "GeoJSON",
            "year": "2022"
        })],
    );

    let repos = Repos::new();
    repos.prepare("p", legacy_source(backend, "p")).await.unwrap();

    let snapshot = repos.snapshot("p").await.unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.datasets.len(), 1);
    assert_eq!(snapshot.datasets[0].type_code, "park");
}

#[tokio::test]
async fn test_all_not_found_fails_with_single_not_found() {
    let repos = Repos::new();
    let err = repos
        .prepare("p", legacy_source(FakeBackend::default(), "p"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(repos.snapshot("p").await.is_none());
}
