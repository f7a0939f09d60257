//! Cache update trigger.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_common::CatalogError;
use metrics::counter;
use serde::Deserialize;
use tracing::{info, instrument};

use super::common::error_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateCacheRequest {
    #[serde(default)]
    pub key: String,
}

/// POST /update-cache - Rebuild every prepared catalog
///
/// When an update key is configured the JSON body must carry it; a missing
/// or unreadable body is treated as a wrong key.
#[instrument(skip(state, body))]
pub async fn update_cache_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Result<Json<UpdateCacheRequest>, JsonRejection>,
) -> Response {
    let key = body.as_ref().ok().map(|Json(b)| b.key.as_str());
    if !state.accepts_update_key(key) {
        counter!("catalog_update_requests_total", "result" => "unauthorized").increment(1);
        return error_response(CatalogError::Unauthorized);
    }

    info!("Updating catalog caches");
    match state.update_all().await {
        Ok(()) => {
            counter!("catalog_update_requests_total", "result" => "ok").increment(1);
            (StatusCode::OK, Json("ok")).into_response()
        }
        Err(e) => {
            counter!("catalog_update_requests_total", "result" => "error").increment(1);
            error_response(e)
        }
    }
}
