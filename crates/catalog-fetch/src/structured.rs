//! Structured model adapter: `plateau-city` plus one `plateau-<feature>`
//! model per feature type.

use std::collections::HashMap;
use std::sync::Arc;

use catalog_builder::{CityItem, FeatureItem, FeatureType, StructuredItems};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::backend::ContentBackend;
use crate::error::{FetchError, FetchResult};
use crate::legacy::FetcherConfig;
use crate::pagination::fetch_all_items;

const MODEL_PREFIX: &str = "plateau-";
pub const MODEL_CITY: &str = "plateau-city";

pub fn feature_model(ft: FeatureType) -> String {
    format!("{}{}", MODEL_PREFIX, ft.code())
}

/// Fetches the structured models of a project.
#[derive(Clone)]
pub struct StructuredFetcher {
    backend: Arc<dyn ContentBackend>,
    config: FetcherConfig,
}

impl StructuredFetcher {
    pub fn new(backend: Arc<dyn ContentBackend>, config: FetcherConfig) -> Self {
        Self { backend, config }
    }

    /// Fetch the city records and every feature model concurrently.
    ///
    /// A missing city model means the project is not found; a missing
    /// feature model is empty. Any other failure aborts the whole fetch.
    #[instrument(skip(self), fields(project = %project))]
    pub async fn fetch(&self, project: &str) -> FetchResult<StructuredItems> {
        let features = try_join_all(FeatureType::ALL.into_iter().map(|ft| async move {
            let model = feature_model(ft);
            match self.fetch_model::<FeatureItem>(project, &model).await {
                Ok(items) => Ok((ft, items)),
                Err(e) if e.is_not_found() => {
                    debug!(model = %model, "Feature model not found");
                    Ok((ft, Vec::new()))
                }
                Err(e) => Err(e),
            }
        }));

        let (cities, features) =
            tokio::try_join!(self.fetch_model::<CityItem>(project, MODEL_CITY), features)?;

        let features: HashMap<FeatureType, Vec<FeatureItem>> = features
            .into_iter()
            .filter(|(_, items)| !items.is_empty())
            .collect();

        info!(
            cities = cities.len(),
            features = features.values().map(Vec::len).sum::<usize>(),
            "Fetched structured records"
        );
        Ok(StructuredItems { cities, features })
    }

    async fn fetch_model<T: DeserializeOwned>(&self, project: &str, model: &str) -> FetchResult<Vec<T>> {
        let fetch = fetch_all_items::<T>(
            self.backend.as_ref(),
            project,
            model,
            self.config.concurrency,
            self.config.per_page,
        );
        tokio::time::timeout(self.config.timeout, fetch)
            .await
            .map_err(|_| FetchError::Timeout {
                model: format!("{}/{}", project, model),
                elapsed: self.config.timeout,
            })?
    }
}
