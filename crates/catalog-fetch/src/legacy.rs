//! Legacy model adapter: `plateau`, `usecase` and `dataset` records.

use std::sync::Arc;
use std::time::Duration;

use catalog_builder::{CatalogSource, DatasetItem, PlateauItem, ResponseAll, UsecaseItem};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::backend::ContentBackend;
use crate::error::{FetchError, FetchResult};
use crate::pagination::{fetch_all_items, DEFAULT_CONCURRENCY, DEFAULT_PER_PAGE};

pub const MODEL_PLATEAU: &str = "plateau";
pub const MODEL_DATASET: &str = "dataset";
pub const MODEL_USECASE: &str = "usecase";

/// Per-request timeout of the legacy adapter.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Request tuning shared by the adapters.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub concurrency: usize,
    pub per_page: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Options of one legacy fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Project whose plateau and dataset records are merged in, filtered
    /// to `city_name`. Ignored unless both are set.
    pub subproject: Option<String>,
    pub city_name: Option<String>,
    pub hide_usecase_city_and_ward: bool,
}

impl FetchOptions {
    fn subproject(&self) -> Option<(&str, &str)> {
        match (self.subproject.as_deref(), self.city_name.as_deref()) {
            (Some(sub), Some(city)) if !sub.is_empty() && !city.is_empty() => Some((sub, city)),
            _ => None,
        }
    }
}

/// Outcome of one model fetch.
enum SubFetch<T> {
    Items(Vec<T>),
    NotFound,
    Skipped,
}

impl<T> SubFetch<T> {
    fn issued(&self) -> bool {
        !matches!(self, SubFetch::Skipped)
    }

    fn not_found(&self) -> bool {
        matches!(self, SubFetch::NotFound)
    }

    fn into_items(self) -> Vec<T> {
        match self {
            SubFetch::Items(items) => items,
            SubFetch::NotFound | SubFetch::Skipped => Vec::new(),
        }
    }
}

/// Fetches the legacy models of a project.
#[derive(Clone)]
pub struct LegacyFetcher {
    backend: Arc<dyn ContentBackend>,
    config: FetcherConfig,
}

impl LegacyFetcher {
    pub fn new(backend: Arc<dyn ContentBackend>, config: FetcherConfig) -> Self {
        Self { backend, config }
    }

    /// Fetch every legacy record of a project.
    ///
    /// Models that do not exist are treated as empty; when every issued
    /// request was not found the project itself is reported not found. Any
    /// other failure aborts the remaining requests.
    #[instrument(skip(self, opts), fields(project = %project))]
    pub async fn fetch(&self, project: &str, opts: &FetchOptions) -> FetchResult<ResponseAll> {
        let sub = opts.subproject();
        let sub_project = sub.map(|(p, _)| p);

        let (plateau, usecase, dataset, sub_plateau, sub_dataset) = tokio::try_join!(
            self.fetch_model::<PlateauItem>(Some(project), MODEL_PLATEAU),
            self.fetch_model::<UsecaseItem>(Some(project), MODEL_USECASE),
            self.fetch_model::<DatasetItem>(Some(project), MODEL_DATASET),
            self.fetch_model::<PlateauItem>(sub_project, MODEL_PLATEAU),
            self.fetch_model::<DatasetItem>(sub_project, MODEL_DATASET),
        )?;

        let outcomes = [
            (plateau.issued(), plateau.not_found()),
            (usecase.issued(), usecase.not_found()),
            (dataset.issued(), dataset.not_found()),
            (sub_plateau.issued(), sub_plateau.not_found()),
            (sub_dataset.issued(), sub_dataset.not_found()),
        ];
        let issued = outcomes.iter().filter(|(i, _)| *i).count();
        let not_found = outcomes.iter().filter(|(_, n)| *n).count();
        if issued > 0 && not_found == issued {
            return Err(FetchError::NotFound(project.to_string()));
        }

        let city = sub.map(|(_, c)| c).unwrap_or_default();
        let mut res = ResponseAll {
            plateau: plateau.into_items(),
            dataset: dataset.into_items(),
            usecase: usecase.into_items(),
        };
        res.plateau.extend(filter_by_city_name(sub_plateau.into_items(), city));
        res.dataset.extend(filter_by_city_name(sub_dataset.into_items(), city));

        if opts.hide_usecase_city_and_ward {
            for u in &mut res.usecase {
                u.hide_city_and_ward = true;
            }
        }

        info!(
            plateau = res.plateau.len(),
            dataset = res.dataset.len(),
            usecase = res.usecase.len(),
            not_found,
            "Fetched legacy records"
        );
        Ok(res)
    }

    async fn fetch_model<T: DeserializeOwned>(
        &self,
        project: Option<&str>,
        model: &str,
    ) -> FetchResult<SubFetch<T>> {
        let Some(project) = project else {
            return Ok(SubFetch::Skipped);
        };

        let fetch = fetch_all_items::<T>(
            self.backend.as_ref(),
            project,
            model,
            self.config.concurrency,
            self.config.per_page,
        );

        match tokio::time::timeout(self.config.timeout, fetch).await {
            Err(_) => Err(FetchError::Timeout {
                model: format!("{}/{}", project, model),
                elapsed: self.config.timeout,
            }),
            Ok(Err(e)) if e.is_not_found() => {
                debug!(project, model, "Model not found");
                Ok(SubFetch::NotFound)
            }
            Ok(Err(e)) => Err(e),
            Ok(Ok(items)) => Ok(SubFetch::Items(items)),
        }
    }
}

fn filter_by_city_name<T: CatalogSource>(items: Vec<T>, city_name: &str) -> Vec<T> {
    if city_name.is_empty() {
        return Vec::new();
    }
    items
        .into_iter()
        .filter(|i| i.city_name() == city_name)
        .collect()
}
