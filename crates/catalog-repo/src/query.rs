//! Filters accepted by the repository list queries.

use crate::convert::{major_version, spec_number};
use crate::model::{Area, AreaType, Dataset, DatasetType, DatasetTypeCategory, NodeKind};

#[derive(Debug, Clone, Default)]
pub struct AreasQuery {
    pub parent_code: Option<String>,
    pub area_types: Vec<AreaType>,
    /// Any token contained in the name matches.
    pub search_tokens: Vec<String>,
    /// Only areas that have datasets of these type codes.
    pub dataset_types: Vec<String>,
    /// With `dataset_types`, also keep the parents of the matching areas.
    pub include_parents: bool,
}

impl AreasQuery {
    pub fn matches(&self, area: &Area) -> bool {
        if !self.area_types.is_empty() && !self.area_types.contains(&area.area_type) {
            return false;
        }
        if !self.search_tokens.is_empty()
            && !self.search_tokens.iter().any(|t| area.name.contains(t.as_str()))
        {
            return false;
        }
        if let Some(parent) = &self.parent_code {
            if area.parent_code() != Some(parent.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetTypesQuery {
    pub category: Option<DatasetTypeCategory>,
    pub year: Option<i32>,
    pub plateau_spec: Option<String>,
}

impl DatasetTypesQuery {
    pub fn matches(&self, ty: &DatasetType) -> bool {
        if self.category.is_some_and(|c| c != ty.category) {
            return false;
        }
        if self.year.is_some_and(|y| ty.year == 0 || ty.year != y) {
            return false;
        }
        if let Some(spec) = self.plateau_spec.as_deref().filter(|s| !s.is_empty()) {
            let ty_spec = ty.plateau_spec_id.as_deref().map(local_id).unwrap_or_default();
            if ty_spec.is_empty() || !spec_matches(spec, ty_spec) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetsQuery {
    pub area_codes: Vec<String>,
    /// Match `area_codes` against the most detailed area only.
    pub shallow: bool,
    pub year: Option<i32>,
    pub plateau_spec: Option<String>,
    /// Type codes or category names to keep.
    pub include_types: Vec<String>,
    /// Type codes or category names to drop.
    pub exclude_types: Vec<String>,
    /// Every token must appear in the name, description, subname or subcode.
    pub search_tokens: Vec<String>,
}

impl DatasetsQuery {
    pub fn matches(&self, d: &Dataset) -> bool {
        if !self.area_codes.is_empty() {
            let found = if self.shallow {
                d.area_code()
                    .is_some_and(|c| self.area_codes.iter().any(|a| a == c))
            } else {
                d.area_codes().any(|c| self.area_codes.iter().any(|a| a == c))
            };
            if !found {
                return false;
            }
        }

        if self.year.is_some_and(|y| y != d.year) {
            return false;
        }

        if let Some(spec) = self.plateau_spec.as_deref().filter(|s| !s.is_empty()) {
            let ds_spec = d.plateau_spec_minor_id.as_deref().map(local_id).unwrap_or_default();
            if ds_spec.is_empty() || !spec_matches(spec, ds_spec) {
                return false;
            }
        }

        if !type_matches(
            &d.type_code,
            d.category,
            &self.include_types,
            &self.exclude_types,
        ) {
            return false;
        }

        if !self.search_tokens.is_empty() {
            let text = [
                Some(d.name.as_str()),
                Some(d.description.as_str()),
                d.subname.as_deref(),
                d.subcode.as_deref(),
            ];
            let all_found = self.search_tokens.iter().all(|t| {
                text.iter()
                    .flatten()
                    .any(|s| !s.is_empty() && s.contains(t.as_str()))
            });
            if !all_found {
                return false;
            }
        }

        true
    }
}

fn local_id(id: &str) -> &str {
    NodeKind::parse(id).map(|(_, local)| local).unwrap_or(id)
}

/// `3.0` matches `3.0` and everything of major version `3`.
fn spec_matches(query: &str, spec: &str) -> bool {
    let q = spec_number(query);
    let s = spec_number(spec);
    q == s || q == major_version(s)
}

fn type_matches(
    code: &str,
    category: DatasetTypeCategory,
    includes: &[String],
    excludes: &[String],
) -> bool {
    let code = code.to_lowercase();
    let cat = category.as_str();
    let hit = |t: &String| {
        let t = t.to_lowercase();
        (!code.is_empty() && t == code) || t == cat
    };

    if excludes.iter().any(hit) {
        return false;
    }
    includes.is_empty() || includes.iter().any(hit)
}
