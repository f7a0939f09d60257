//! Content backend adapters for the catalog.
//!
//! A [`ContentBackend`] lists raw items page by page; the legacy and
//! structured fetchers fan out over the models of a project and decode the
//! records the catalog builder consumes.

pub mod backend;
pub mod error;
pub mod legacy;
pub mod pagination;
pub mod structured;

pub use backend::{flatten_fields, ApiShape, ContentBackend, HttpBackend, ItemsPage};
pub use error::{FetchError, FetchResult};
pub use legacy::{
    FetchOptions, FetcherConfig, LegacyFetcher, DEFAULT_TIMEOUT, MODEL_DATASET, MODEL_PLATEAU,
    MODEL_USECASE,
};
pub use pagination::{fetch_all_items, DEFAULT_CONCURRENCY, DEFAULT_PER_PAGE};
pub use structured::{feature_model, StructuredFetcher, MODEL_CITY};
