//! Error types for the fetch crate.

use std::time::Duration;

use catalog_common::CatalogError;
use thiserror::Error;

/// Errors raised while reading the content backend.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The project or model does not exist upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request for {model} timed out after {elapsed:?}")]
    Timeout { model: String, elapsed: Duration },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to decode {model} item: {source}")]
    Decode {
        model: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

impl From<FetchError> for CatalogError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(what) => CatalogError::NotFound(what),
            FetchError::Timeout { .. } => CatalogError::Timeout,
            FetchError::InvalidConfig(msg) => CatalogError::ConfigError(msg),
            other => CatalogError::UpstreamError(other.to_string()),
        }
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
