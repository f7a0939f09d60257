//! Error types for the repository crate.

use catalog_common::CatalogError;
use catalog_fetch::FetchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    /// Fetching the source records of a project failed.
    #[error("Failed to update catalog of '{project}': {source}")]
    Update {
        project: String,
        #[source]
        source: FetchError,
    },

    #[error("Project is not registered: {0}")]
    UnknownProject(String),

    /// The project is registered but its first build has not completed.
    #[error("Catalog of '{0}' has not been built yet")]
    NotReady(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        match self {
            RepoError::Update { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

impl From<RepoError> for CatalogError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Update { source, .. } => source.into(),
            RepoError::UnknownProject(p) => CatalogError::ProjectNotFound(p),
            RepoError::NotReady(p) => CatalogError::CacheNotReady(p),
        }
    }
}

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
