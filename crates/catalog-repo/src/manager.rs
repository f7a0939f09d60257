//! Per-project snapshot cache.
//!
//! Each registered project owns a source and the latest snapshot built from
//! it. Snapshots are swapped atomically: readers keep whichever generation
//! they loaded, and a failed rebuild leaves the previous one in place.
//! Builds of one project are serialized: concurrent `prepare` calls share a
//! single first build, and an `update` waits for any build in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use metrics::{counter, gauge, histogram};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::error::{RepoError, RepoResult};
use crate::repo::{InMemoryRepo, Repo};
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;

struct ProjectCache {
    source: Arc<dyn SnapshotSource>,
    snapshot: ArcSwapOption<Snapshot>,
    /// Held across a fetch and build.
    build: Mutex<()>,
}

impl ProjectCache {
    fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            snapshot: ArcSwapOption::empty(),
            build: Mutex::new(()),
        }
    }
}

/// Registry of project caches.
#[derive(Default)]
pub struct Repos {
    projects: RwLock<HashMap<String, Arc<ProjectCache>>>,
}

impl Repos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project and build its first snapshot.
    ///
    /// The source of the first call is kept for the lifetime of the entry.
    /// Callers arriving while the first build runs wait for it and return
    /// without fetching again; a project whose earlier build failed is
    /// built again.
    #[instrument(skip(self, source), fields(project = %project))]
    pub async fn prepare(&self, project: &str, source: Arc<dyn SnapshotSource>) -> RepoResult<()> {
        let cache = {
            let mut projects = self.projects.write().await;
            projects
                .entry(project.to_string())
                .or_insert_with(|| Arc::new(ProjectCache::new(source)))
                .clone()
        };

        let _build = cache.build.lock().await;
        if cache.snapshot.load().is_some() {
            return Ok(());
        }
        refresh(project, &cache).await.map(|_| ())
    }

    /// Re-fetch a project and replace its snapshot.
    #[instrument(skip(self), fields(project = %project))]
    pub async fn update(&self, project: &str) -> RepoResult<Arc<Snapshot>> {
        let cache = self.entry(project).await?;
        rebuild(project, &cache).await
    }

    /// Rebuild every registered project concurrently.
    ///
    /// Stops at the first failure; projects that were not rebuilt keep their
    /// current snapshot.
    pub async fn update_all(&self) -> RepoResult<()> {
        let entries: Vec<(String, Arc<ProjectCache>)> = {
            let projects = self.projects.read().await;
            projects
                .iter()
                .map(|(p, c)| (p.clone(), c.clone()))
                .collect()
        };

        info!(projects = entries.len(), "Updating all catalogs");
        try_join_all(entries.iter().map(|(p, c)| rebuild(p, c))).await?;
        Ok(())
    }

    pub async fn projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self.projects.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn snapshot(&self, project: &str) -> Option<Arc<Snapshot>> {
        self.projects
            .read()
            .await
            .get(project)
            .and_then(|c| c.snapshot.load_full())
    }

    /// Query facade over the current snapshot of a project.
    pub async fn repo(&self, project: &str) -> RepoResult<Arc<dyn Repo>> {
        let snapshot = self
            .entry(project)
            .await?
            .snapshot
            .load_full()
            .ok_or_else(|| RepoError::NotReady(project.to_string()))?;
        Ok(Arc::new(InMemoryRepo::new(project, snapshot)))
    }

    pub async fn updated_at(&self, project: &str) -> Option<DateTime<Utc>> {
        self.snapshot(project).await.map(|s| s.built_at)
    }

    pub async fn warnings(&self, project: &str) -> Vec<String> {
        self.snapshot(project)
            .await
            .map(|s| s.warnings.clone())
            .unwrap_or_default()
    }

    async fn entry(&self, project: &str) -> RepoResult<Arc<ProjectCache>> {
        self.projects
            .read()
            .await
            .get(project)
            .cloned()
            .ok_or_else(|| RepoError::UnknownProject(project.to_string()))
    }
}

async fn rebuild(project: &str, cache: &ProjectCache) -> RepoResult<Arc<Snapshot>> {
    let _build = cache.build.lock().await;
    refresh(project, cache).await
}

/// Fetch and swap in a new snapshot. The caller holds `cache.build`.
async fn refresh(project: &str, cache: &ProjectCache) -> RepoResult<Arc<Snapshot>> {
    let start = Instant::now();

    let items = match cache.source.fetch_items().await {
        Ok(items) => items,
        Err(source) => {
            counter!("catalog_updates_total", "result" => "error").increment(1);
            warn!(
                project,
                error = %source,
                stale = cache.snapshot.load().is_some(),
                "Catalog update failed"
            );
            return Err(RepoError::Update {
                project: project.to_string(),
                source,
            });
        }
    };

    let snapshot = Arc::new(Snapshot::build(items));
    cache.snapshot.store(Some(snapshot.clone()));

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    counter!("catalog_updates_total", "result" => "ok").increment(1);
    histogram!("catalog_update_duration_ms").record(elapsed_ms);
    gauge!("catalog_datasets", "project" => project.to_string())
        .set(snapshot.datasets.len() as f64);

    info!(
        project,
        items = snapshot.items.len(),
        datasets = snapshot.datasets.len(),
        citygml = snapshot.citygml.len(),
        warnings = snapshot.warnings.len(),
        elapsed_ms,
        "Catalog updated"
    );
    Ok(snapshot)
}
