//! HTTP request handlers.
//!
//! - `api`: catalog queries and the flat item list
//! - `cache`: cache update trigger
//! - `metrics`: health check and Prometheus metrics
//! - `common`: error responses and parameter parsing

pub mod api;
pub mod cache;
pub mod common;
pub mod metrics;

pub use api::{
    areas_handler, citygml_handler, datacatalog_handler, dataset_types_handler, datasets_handler,
    node_handler, plateau_specs_handler, warnings_handler, years_handler,
};
pub use cache::update_cache_handler;
pub use metrics::{health_handler, metrics_handler};
