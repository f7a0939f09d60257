//! Error types for catalog services.

use thiserror::Error;

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Primary error type surfaced by the catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    // === Request Errors ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    // === Lookup Errors ===
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Catalog for project '{0}' is not ready")]
    CacheNotReady(String),

    // === Upstream Errors ===
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Request timeout")]
    Timeout,

    // === Infrastructure Errors ===
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl CatalogError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            CatalogError::InvalidRequest(_) => 400,
            CatalogError::Unauthorized => 401,

            CatalogError::ProjectNotFound(_) | CatalogError::NotFound(_) => 404,

            CatalogError::CacheNotReady(_) => 503,
            CatalogError::UpstreamError(_) => 502,
            CatalogError::Timeout => 504,

            _ => 500,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::InternalError(format!("JSON error: {}", err))
    }
}
