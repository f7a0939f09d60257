//! Query facade over catalog snapshots.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::RepoResult;
use crate::model::{
    Area, CityGmlDataset, Dataset, DatasetType, Node, NodeKind, PlateauSpec,
};
use crate::query::{AreasQuery, DatasetTypesQuery, DatasetsQuery};
use crate::snapshot::Snapshot;

/// Read access to a catalog.
pub trait Repo: Send + Sync {
    fn name(&self) -> String;

    /// Look up any node by its global ID.
    fn node(&self, id: &str) -> RepoResult<Option<Node>>;

    fn area(&self, code: &str) -> RepoResult<Option<Area>>;

    fn areas(&self, query: &AreasQuery) -> RepoResult<Vec<Area>>;

    fn dataset_types(&self, query: &DatasetTypesQuery) -> RepoResult<Vec<DatasetType>>;

    fn datasets(&self, query: &DatasetsQuery) -> RepoResult<Vec<Dataset>>;

    /// CityGML package of a city.
    fn citygml(&self, city_code: &str) -> RepoResult<Option<CityGmlDataset>>;

    fn plateau_specs(&self) -> RepoResult<Vec<PlateauSpec>>;

    fn years(&self) -> RepoResult<Vec<i32>>;
}

/// A repository answering from one snapshot.
#[derive(Debug, Clone)]
pub struct InMemoryRepo {
    name: String,
    snapshot: Arc<Snapshot>,
}

impl InMemoryRepo {
    pub fn new(name: impl Into<String>, snapshot: Arc<Snapshot>) -> Self {
        Self {
            name: name.into(),
            snapshot,
        }
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    /// Area codes holding datasets of the given types.
    fn areas_with_dataset_types(&self, types: &[String], include_parents: bool) -> HashSet<&str> {
        let mut codes = HashSet::new();
        for d in self
            .snapshot
            .datasets
            .iter()
            .filter(|d| types.iter().any(|t| *t == d.type_code))
        {
            if include_parents {
                codes.extend(d.area_codes());
            } else if let Some(code) = d.area_code() {
                codes.insert(code);
            }
        }
        codes
    }
}

impl Repo for InMemoryRepo {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn node(&self, id: &str) -> RepoResult<Option<Node>> {
        let Some((kind, _)) = NodeKind::parse(id) else {
            return Ok(None);
        };
        let s = &self.snapshot;

        let node = match kind {
            NodeKind::Prefecture | NodeKind::City | NodeKind::Ward => {
                s.areas.iter().find(|a| a.id == id).cloned().map(Node::Area)
            }
            NodeKind::DatasetType => s
                .dataset_types
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .map(Node::DatasetType),
            NodeKind::Dataset => s.dataset(id).cloned().map(Node::Dataset),
            NodeKind::DatasetItem => s
                .datasets
                .iter()
                .find_map(|d| d.item(id))
                .cloned()
                .map(Node::DatasetItem),
            NodeKind::CityGml => s
                .citygml
                .values()
                .find(|c| c.id == id)
                .cloned()
                .map(Node::CityGml),
            NodeKind::PlateauSpec => s.plateau_specs.iter().find_map(|p| {
                if p.id == id {
                    return Some(Node::PlateauSpec(p.clone()));
                }
                p.minor_versions
                    .iter()
                    .find(|m| m.id == id)
                    .cloned()
                    .map(Node::PlateauSpecMinor)
            }),
        };
        Ok(node)
    }

    fn area(&self, code: &str) -> RepoResult<Option<Area>> {
        Ok(self.snapshot.areas.iter().find(|a| a.code == code).cloned())
    }

    fn areas(&self, query: &AreasQuery) -> RepoResult<Vec<Area>> {
        let with_types = (!query.dataset_types.is_empty())
            .then(|| self.areas_with_dataset_types(&query.dataset_types, query.include_parents));

        Ok(self
            .snapshot
            .areas
            .iter()
            .filter(|a| query.matches(a))
            .filter(|a| {
                with_types
                    .as_ref()
                    .map_or(true, |codes| codes.contains(a.code.as_str()))
            })
            .cloned()
            .collect())
    }

    fn dataset_types(&self, query: &DatasetTypesQuery) -> RepoResult<Vec<DatasetType>> {
        Ok(self
            .snapshot
            .dataset_types
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect())
    }

    fn datasets(&self, query: &DatasetsQuery) -> RepoResult<Vec<Dataset>> {
        Ok(self
            .snapshot
            .datasets
            .iter()
            .filter(|d| query.matches(d))
            .cloned()
            .collect())
    }

    fn citygml(&self, city_code: &str) -> RepoResult<Option<CityGmlDataset>> {
        Ok(self.snapshot.citygml.get(city_code).cloned())
    }

    fn plateau_specs(&self) -> RepoResult<Vec<PlateauSpec>> {
        Ok(self.snapshot.plateau_specs.clone())
    }

    fn years(&self) -> RepoResult<Vec<i32>> {
        Ok(self.snapshot.years.clone())
    }
}
