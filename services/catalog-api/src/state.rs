//! Application state and shared resources.

use std::sync::Arc;

use catalog_common::{CatalogError, CatalogResult};
use catalog_fetch::{ContentBackend, FetcherConfig, LegacyFetcher, StructuredFetcher};
use catalog_repo::{LegacySource, Merger, Repo, Repos, SnapshotSource, StructuredSource};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::config::{ProjectConfig, ProjectsConfig, SchemaVersion};

/// Shared application state.
pub struct AppState {
    pub repos: Repos,
    pub projects: ProjectsConfig,
    legacy: LegacyFetcher,
    structured: StructuredFetcher,
    update_key: Option<String>,
}

impl AppState {
    /// `legacy` answers the public read API, `structured` the integration API.
    pub fn new(
        projects: ProjectsConfig,
        legacy: Arc<dyn ContentBackend>,
        structured: Arc<dyn ContentBackend>,
        fetcher: FetcherConfig,
        update_key: Option<String>,
    ) -> Self {
        Self {
            repos: Repos::new(),
            projects,
            legacy: LegacyFetcher::new(legacy, fetcher.clone()),
            structured: StructuredFetcher::new(structured, fetcher),
            update_key: update_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn project(&self, alias: &str) -> CatalogResult<&ProjectConfig> {
        self.projects
            .project(alias)
            .ok_or_else(|| CatalogError::ProjectNotFound(alias.to_string()))
    }

    /// Whether a cache update request carrying `key` may proceed.
    pub fn accepts_update_key(&self, key: Option<&str>) -> bool {
        match &self.update_key {
            None => true,
            Some(expected) => key == Some(expected.as_str()),
        }
    }

    fn source(&self, project: &ProjectConfig) -> Arc<dyn SnapshotSource> {
        match project.schema {
            SchemaVersion::V2 => Arc::new(LegacySource::new(
                self.legacy.clone(),
                project.alias.as_str(),
                project.fetch_options(),
            )),
            SchemaVersion::V3 => Arc::new(StructuredSource::new(
                self.structured.clone(),
                project.alias.as_str(),
            )),
        }
    }

    /// Build the snapshots of a project and of every project merged into it.
    ///
    /// Build failures are logged only; the caller sees whatever snapshots
    /// exist afterwards.
    pub async fn prepare(&self, alias: &str) -> CatalogResult<()> {
        let project = self.project(alias)?;
        let builds = members(project).filter_map(|name| {
            let member = self.projects.project(name)?;
            Some(async move {
                if let Err(e) = self.repos.prepare(name, self.source(member)).await {
                    warn!(project = %alias, member = %name, error = %e, "Failed to prepare catalog");
                }
            })
        });
        join_all(builds).await;
        Ok(())
    }

    /// Query view over a project and the projects merged into it.
    pub async fn merged_repo(&self, alias: &str) -> CatalogResult<Arc<dyn Repo>> {
        self.prepare(alias).await?;
        let project = self.project(alias)?;

        let mut repos = Vec::new();
        for name in members(project) {
            match self.repos.repo(name).await {
                Ok(repo) => repos.push(repo),
                Err(e) => debug!(member = %name, error = %e, "Catalog not built, skipped"),
            }
        }

        match repos.len() {
            0 => Err(CatalogError::CacheNotReady(alias.to_string())),
            1 => Ok(repos.remove(0)),
            _ => Ok(Arc::new(Merger::new(repos)?)),
        }
    }

    /// Rebuild every project that has been prepared so far.
    pub async fn update_all(&self) -> CatalogResult<()> {
        self.repos.update_all().await?;
        Ok(())
    }
}

/// The project itself followed by its merged sub-projects.
fn members(project: &ProjectConfig) -> impl Iterator<Item = &str> {
    std::iter::once(project.alias.as_str())
        .chain(project.sub_projects.iter().map(String::as_str))
}
