//! Open-data catalog API service library.
//!
//! This module exposes the internal modules for testing purposes.

pub mod config;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use state::AppState;

/// Catalog routes sharing one application state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Legacy flat catalog
        .route("/datacatalog/:project", get(handlers::datacatalog_handler))
        // Catalog queries
        .route("/projects/:project/areas", get(handlers::areas_handler))
        .route("/projects/:project/datasets", get(handlers::datasets_handler))
        .route(
            "/projects/:project/dataset-types",
            get(handlers::dataset_types_handler),
        )
        .route("/projects/:project/years", get(handlers::years_handler))
        .route(
            "/projects/:project/plateau-specs",
            get(handlers::plateau_specs_handler),
        )
        .route("/projects/:project/nodes/:id", get(handlers::node_handler))
        .route(
            "/projects/:project/citygml/:code",
            get(handlers::citygml_handler),
        )
        .route(
            "/projects/:project/warnings",
            get(handlers::warnings_handler),
        )
        // Cache management
        .route("/update-cache", post(handlers::update_cache_handler))
        .route("/health", get(handlers::health_handler))
        .layer(Extension(state))
}
