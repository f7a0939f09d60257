//! Catalog query endpoints.
//!
//! Every `/projects/:project/...` endpoint answers from the merged view over
//! the project and the projects configured to be merged into it.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use catalog_common::{CatalogError, CatalogItem};
use catalog_repo::{
    Area, AreaType, AreasQuery, CityGmlDataset, Dataset, DatasetType, DatasetTypeCategory,
    DatasetTypesQuery, DatasetsQuery, Node, PlateauSpec,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::common::{comma_list, error_response, search_tokens};
use crate::config::SchemaVersion;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, Response>;

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AreasParams {
    pub parent_code: Option<String>,
    /// Comma separated: prefecture, city, ward.
    pub area_types: Option<String>,
    pub search: Option<String>,
    /// Comma separated type codes.
    pub dataset_types: Option<String>,
    #[serde(default)]
    pub include_parents: bool,
}

impl AreasParams {
    pub fn to_query(&self) -> Result<AreasQuery, CatalogError> {
        let area_types = comma_list(self.area_types.as_deref())
            .iter()
            .map(|t| {
                AreaType::from_str_opt(t)
                    .ok_or_else(|| CatalogError::InvalidRequest(format!("unknown area type: {}", t)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AreasQuery {
            parent_code: self.parent_code.clone().filter(|c| !c.is_empty()),
            area_types,
            search_tokens: search_tokens(self.search.as_deref()),
            dataset_types: comma_list(self.dataset_types.as_deref()),
            include_parents: self.include_parents,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DatasetTypesParams {
    pub category: Option<String>,
    pub year: Option<i32>,
    pub plateau_spec: Option<String>,
}

impl DatasetTypesParams {
    pub fn to_query(&self) -> Result<DatasetTypesQuery, CatalogError> {
        let category = match self.category.as_deref().filter(|c| !c.is_empty()) {
            None => None,
            Some(c) => Some(DatasetTypeCategory::from_str_opt(c).ok_or_else(|| {
                CatalogError::InvalidRequest(format!("unknown dataset category: {}", c))
            })?),
        };

        Ok(DatasetTypesQuery {
            category,
            year: self.year,
            plateau_spec: self.plateau_spec.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DatasetsParams {
    pub area_codes: Option<String>,
    #[serde(default)]
    pub shallow: bool,
    pub year: Option<i32>,
    pub plateau_spec: Option<String>,
    pub include_types: Option<String>,
    pub exclude_types: Option<String>,
    pub search: Option<String>,
}

impl DatasetsParams {
    pub fn to_query(&self) -> DatasetsQuery {
        DatasetsQuery {
            area_codes: comma_list(self.area_codes.as_deref()),
            shallow: self.shallow,
            year: self.year,
            plateau_spec: self.plateau_spec.clone(),
            include_types: comma_list(self.include_types.as_deref()),
            exclude_types: comma_list(self.exclude_types.as_deref()),
            search_tokens: search_tokens(self.search.as_deref()),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /datacatalog/:project - Flat catalog item list of one project
#[instrument(skip(state))]
pub async fn datacatalog_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(project): Path<String>,
) -> ApiResult<Vec<CatalogItem>> {
    state.prepare(&project).await.map_err(error_response)?;

    let snapshot = state
        .repos
        .snapshot(&project)
        .await
        .ok_or_else(|| error_response(CatalogError::CacheNotReady(project.clone())))?;

    debug!(items = snapshot.items.len(), "Serving catalog items");
    Ok(Json(snapshot.items.clone()))
}

/// GET /projects/:project/areas
#[instrument(skip(state))]
pub async fn areas_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(project): Path<String>,
    Query(params): Query<AreasParams>,
) -> ApiResult<Vec<Area>> {
    let query = params.to_query().map_err(error_response)?;
    let repo = state.merged_repo(&project).await.map_err(error_response)?;
    repo.areas(&query)
        .map(Json)
        .map_err(|e| error_response(e.into()))
}

/// GET /projects/:project/dataset-types
#[instrument(skip(state))]
pub async fn dataset_types_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(project): Path<String>,
    Query(params): Query<DatasetTypesParams>,
) -> ApiResult<Vec<DatasetType>> {
    let query = params.to_query().map_err(error_response)?;
    let repo = state.merged_repo(&project).await.map_err(error_response)?;
    repo.dataset_types(&query)
        .map(Json)
        .map_err(|e| error_response(e.into()))
}

/// GET /projects/:project/datasets
#[instrument(skip(state))]
pub async fn datasets_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(project): Path<String>,
    Query(params): Query<DatasetsParams>,
) -> ApiResult<Vec<Dataset>> {
    let repo = state.merged_repo(&project).await.map_err(error_response)?;
    repo.datasets(&params.to_query())
        .map(Json)
        .map_err(|e| error_response(e.into()))
}

/// GET /projects/:project/years
#[instrument(skip(state))]
pub async fn years_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(project): Path<String>,
) -> ApiResult<Vec<i32>> {
    let repo = state.merged_repo(&project).await.map_err(error_response)?;
    repo.years().map(Json).map_err(|e| error_response(e.into()))
}

/// GET /projects/:project/plateau-specs
#[instrument(skip(state))]
pub async fn plateau_specs_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(project): Path<String>,
) -> ApiResult<Vec<PlateauSpec>> {
    let repo = state.merged_repo(&project).await.map_err(error_response)?;
    repo.plateau_specs()
        .map(Json)
        .map_err(|e| error_response(e.into()))
}

/// GET /projects/:project/nodes/:id - Any node by its global ID
#[instrument(skip(state))]
pub async fn node_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((project, id)): Path<(String, String)>,
) -> ApiResult<Node> {
    let repo = state.merged_repo(&project).await.map_err(error_response)?;
    match repo.node(&id).map_err(|e| error_response(e.into()))? {
        Some(node) => Ok(Json(node)),
        None => Err(error_response(CatalogError::NotFound(id))),
    }
}

/// GET /projects/:project/citygml/:code - CityGML package of a city
#[instrument(skip(state))]
pub async fn citygml_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((project, code)): Path<(String, String)>,
) -> ApiResult<CityGmlDataset> {
    let repo = state.merged_repo(&project).await.map_err(error_response)?;
    match repo.citygml(&code).map_err(|e| error_response(e.into()))? {
        Some(citygml) => Ok(Json(citygml)),
        None => Err(error_response(CatalogError::NotFound(format!(
            "citygml of {}",
            code
        )))),
    }
}

/// GET /projects/:project/warnings - Build warnings of the current snapshot
///
/// Plain text: the build time on the first line, then one warning per line.
/// Only structured (v3) projects report warnings.
#[instrument(skip(state))]
pub async fn warnings_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(project): Path<String>,
) -> Response {
    match state.project(&project) {
        Ok(p) if p.schema == SchemaVersion::V3 => {}
        _ => return error_response(CatalogError::NotFound(project)),
    }

    let mut body = String::new();
    if let Some(t) = state.repos.updated_at(&project).await {
        body.push_str(&format!("updated at: {}\n", t.to_rfc3339()));
    }
    body.push_str(&state.repos.warnings(&project).await.join("\n"));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}
