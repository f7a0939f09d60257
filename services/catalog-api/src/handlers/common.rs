//! Helpers shared by the catalog handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_common::CatalogError;
use tracing::{error, warn};

// ============================================================================
// Error Responses
// ============================================================================

/// JSON error response with the status the error maps to.
pub fn error_response(err: CatalogError) -> Response {
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        error!(error = %err, status = status.as_u16(), "Request failed");
    } else {
        warn!(error = %err, status = status.as_u16(), "Request rejected");
    }

    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Split a comma separated parameter, dropping empty entries.
pub fn comma_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a free-text search parameter into tokens.
pub fn search_tokens(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_list() {
        assert_eq!(comma_list(Some("bldg, tran,,fld")), vec!["bldg", "tran", "fld"]);
        assert!(comma_list(None).is_empty());
        assert!(comma_list(Some(" , ")).is_empty());
    }

    #[test]
    fn test_search_tokens() {
        assert_eq!(search_tokens(Some("八王子  建築物")), vec!["八王子", "建築物"]);
        assert!(search_tokens(Some("   ")).is_empty());
    }

    #[test]
    fn test_error_status() {
        let res = error_response(CatalogError::ProjectNotFound("p".to_string()));
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = error_response(CatalogError::CacheNotReady("p".to_string()));
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
