//! Project list configuration.
//!
//! Loaded from a YAML file listing every project the service serves:
//!
//! ```yaml
//! projects:
//!   - alias: plateau-2022
//!     schema: v2
//!     subproject: plateau-2022-extra
//!     city_name: 八王子市
//!   - alias: plateau-2023
//!     schema: v3
//!     sub_projects: [plateau-2022]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use catalog_common::{CatalogError, CatalogResult};
use catalog_fetch::FetchOptions;
use serde::Deserialize;
use tracing::info;

/// Record layout of a project in the content backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Legacy `plateau` / `dataset` / `usecase` models.
    #[default]
    V2,
    /// Structured `plateau-city` / `plateau-<feature>` models.
    V3,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub alias: String,
    pub schema: SchemaVersion,
    /// Extra project whose records of `city_name` are folded in (v2 only).
    pub subproject: Option<String>,
    pub city_name: Option<String>,
    /// Projects merged into this project's query view.
    pub sub_projects: Vec<String>,
    pub hide_usecase_city_and_ward: bool,
}

impl ProjectConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            subproject: self.subproject.clone(),
            city_name: self.city_name.clone(),
            hide_usecase_city_and_ward: self.hide_usecase_city_and_ward,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProjectsConfig {
    pub projects: Vec<ProjectConfig>,
}

impl ProjectsConfig {
    pub fn from_yaml(contents: &str) -> CatalogResult<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| CatalogError::ConfigError(format!("invalid project list: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CatalogError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&contents)?;
        info!(path = %path.display(), projects = config.projects.len(), "Loaded project list");
        Ok(config)
    }

    pub fn project(&self, alias: &str) -> Option<&ProjectConfig> {
        self.projects.iter().find(|p| p.alias == alias)
    }

    fn validate(&self) -> CatalogResult<()> {
        let mut seen = HashSet::new();
        for p in &self.projects {
            if p.alias.is_empty() {
                return Err(CatalogError::ConfigError("project alias is empty".to_string()));
            }
            if !seen.insert(p.alias.as_str()) {
                return Err(CatalogError::ConfigError(format!(
                    "duplicate project alias: {}",
                    p.alias
                )));
            }
        }

        for p in &self.projects {
            if let Some(missing) = p.sub_projects.iter().find(|s| !seen.contains(s.as_str())) {
                return Err(CatalogError::ConfigError(format!(
                    "project {} merges unknown project {}",
                    p.alias, missing
                )));
            }
        }
        Ok(())
    }
}
