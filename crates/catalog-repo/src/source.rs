//! Where a project's catalog items come from.

use async_trait::async_trait;
use catalog_common::CatalogItem;
use catalog_fetch::{FetchOptions, FetchResult, LegacyFetcher, StructuredFetcher};

/// Produces the full list of catalog items of one project.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_items(&self) -> FetchResult<Vec<CatalogItem>>;
}

/// Legacy `plateau` / `dataset` / `usecase` models.
pub struct LegacySource {
    fetcher: LegacyFetcher,
    project: String,
    options: FetchOptions,
}

impl LegacySource {
    pub fn new(fetcher: LegacyFetcher, project: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            fetcher,
            project: project.into(),
            options,
        }
    }
}

#[async_trait]
impl SnapshotSource for LegacySource {
    async fn fetch_items(&self) -> FetchResult<Vec<CatalogItem>> {
        let res = self.fetcher.fetch(&self.project, &self.options).await?;
        Ok(res.all())
    }
}

/// Structured `plateau-city` / `plateau-<feature>` models.
pub struct StructuredSource {
    fetcher: StructuredFetcher,
    project: String,
}

impl StructuredSource {
    pub fn new(fetcher: StructuredFetcher, project: impl Into<String>) -> Self {
        Self {
            fetcher,
            project: project.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for StructuredSource {
    async fn fetch_items(&self) -> FetchResult<Vec<CatalogItem>> {
        let items = self.fetcher.fetch(&self.project).await?;
        Ok(items.catalog_items())
    }
}

/// A fixed list of items.
pub struct StaticSource(pub Vec<CatalogItem>);

#[async_trait]
impl SnapshotSource for StaticSource {
    async fn fetch_items(&self) -> FetchResult<Vec<CatalogItem>> {
        Ok(self.0.clone())
    }
}
