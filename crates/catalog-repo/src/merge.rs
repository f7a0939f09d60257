//! A repository composed of several member repositories.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::RepoResult;
use crate::model::{Area, CityGmlDataset, Dataset, DatasetType, Node, PlateauSpec, Versioned};
use crate::query::{AreasQuery, DatasetTypesQuery, DatasetsQuery};
use crate::repo::Repo;

/// Answers each query by asking every member and preferring the latest
/// data generation.
///
/// Plateau datasets of the same area and type are unified across members,
/// so a newer generation replaces an older one even when their IDs differ.
pub struct Merger {
    repos: Vec<Arc<dyn Repo>>,
    /// Dataset type IDs in merged display order.
    type_order: Vec<String>,
}

impl Merger {
    pub fn new(repos: Vec<Arc<dyn Repo>>) -> RepoResult<Self> {
        let mut merger = Self {
            repos,
            type_order: Vec::new(),
        };
        let mut types = merger.merged_dataset_types(&DatasetTypesQuery::default())?;
        sort_dataset_types(&mut types);
        merger.type_order = types.into_iter().map(|t| t.id).collect();
        Ok(merger)
    }

    fn collect<T>(&self, f: impl Fn(&dyn Repo) -> RepoResult<T>) -> RepoResult<Vec<T>> {
        self.repos.iter().map(|r| f(r.as_ref())).collect()
    }

    fn flatten<T>(&self, f: impl Fn(&dyn Repo) -> RepoResult<Vec<T>>) -> RepoResult<Vec<T>> {
        Ok(self.collect(f)?.into_iter().flatten().collect())
    }

    fn merged_dataset_types(&self, query: &DatasetTypesQuery) -> RepoResult<Vec<DatasetType>> {
        let types = self.flatten(|r| r.dataset_types(query))?;
        Ok(merge_results(types, false))
    }

    fn apply_type_order(&self, types: &mut [DatasetType]) {
        for t in types.iter_mut() {
            if let Some(i) = self.type_order.iter().position(|id| *id == t.id) {
                t.order = Some(i as i32 + 1);
            }
        }
    }
}

impl Repo for Merger {
    fn name(&self) -> String {
        let names: Vec<String> = self.repos.iter().map(|r| r.name()).collect();
        format!("merger({})", names.join(","))
    }

    fn node(&self, id: &str) -> RepoResult<Option<Node>> {
        let nodes = self.collect(|r| r.node(id))?;
        let mut node = latest_year(nodes.into_iter().flatten());
        if let Some(Node::DatasetType(t)) = node.as_mut() {
            self.apply_type_order(std::slice::from_mut(t));
        }
        Ok(node)
    }

    fn area(&self, code: &str) -> RepoResult<Option<Area>> {
        let areas = self.collect(|r| r.area(code))?;
        Ok(latest_year(areas.into_iter().flatten()))
    }

    fn areas(&self, query: &AreasQuery) -> RepoResult<Vec<Area>> {
        let areas = self.flatten(|r| r.areas(query))?;
        Ok(merge_results(areas, true))
    }

    fn dataset_types(&self, query: &DatasetTypesQuery) -> RepoResult<Vec<DatasetType>> {
        let mut types = self.merged_dataset_types(query)?;
        sort_dataset_types(&mut types);
        self.apply_type_order(&mut types);
        Ok(types)
    }

    fn datasets(&self, query: &DatasetsQuery) -> RepoResult<Vec<Dataset>> {
        let datasets = self.flatten(|r| r.datasets(query))?;
        Ok(merge_results(datasets, true))
    }

    fn citygml(&self, city_code: &str) -> RepoResult<Option<CityGmlDataset>> {
        let found = self.collect(|r| r.citygml(city_code))?;
        Ok(latest_year(found.into_iter().flatten()))
    }

    fn plateau_specs(&self) -> RepoResult<Vec<PlateauSpec>> {
        let specs = self.flatten(|r| r.plateau_specs())?;
        Ok(merge_results(specs, true))
    }

    fn years(&self) -> RepoResult<Vec<i32>> {
        let mut years: Vec<i32> = self
            .flatten(|r| r.years())?
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        years.sort_unstable();
        Ok(years)
    }
}

/// The node with the greatest year; the first one wins ties.
fn latest_year<T: Versioned>(nodes: impl IntoIterator<Item = T>) -> Option<T> {
    nodes.into_iter().fold(None, |best, n| match best {
        Some(b) if b.year() >= n.year() => Some(b),
        _ => Some(n),
    })
}

/// Group by merge key, keep the latest year of each group and de-duplicate
/// by ID. With `sort`, order by ID and then by descending year.
fn merge_results<T: Versioned>(nodes: Vec<T>, sort: bool) -> Vec<T> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<T>> = HashMap::new();
    for n in nodes {
        let key = n.merge_key();
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(n);
    }

    let mut res: Vec<T> = order
        .iter()
        .filter_map(|k| groups.remove(k))
        .flat_map(latest_year_nodes)
        .collect();

    if sort {
        res.sort_by(|a, b| {
            a.node_id()
                .cmp(b.node_id())
                .then_with(|| b.year().cmp(&a.year()))
        });
    }
    res
}

fn latest_year_nodes<T: Versioned>(nodes: Vec<T>) -> Vec<T> {
    let max_year = nodes.iter().map(|n| n.year()).max().unwrap_or(0);
    let latest = nodes
        .into_iter()
        .filter(|n| max_year <= 0 || n.year() == max_year);

    let mut seen = HashSet::new();
    latest
        .filter(|n| n.node_id().is_empty() || seen.insert(n.node_id().to_string()))
        .collect()
}

/// Newest types first, then by display order.
fn sort_dataset_types(types: &mut [DatasetType]) {
    types.sort_by(|a, b| {
        b.year.cmp(&a.year).then_with(|| match (a.order, b.order) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => std::cmp::Ordering::Equal,
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AreaType, DatasetTypeCategory};

    fn area(code: &str) -> Area {
        Area {
            id: format!("c_{}", code),
            area_type: AreaType::City,
            code: code.to_string(),
            name: code.to_string(),
            prefecture_code: Some("13".to_string()),
            city_code: None,
            citygml_id: None,
        }
    }

    fn ty(id: &str, year: i32, order: i32) -> DatasetType {
        DatasetType {
            id: id.to_string(),
            code: id.to_string(),
            name: id.to_string(),
            category: DatasetTypeCategory::Plateau,
            year,
            order: Some(order),
            flood: false,
            plateau_spec_id: None,
        }
    }

    #[test]
    fn test_merge_results_deduplicates_and_sorts() {
        let merged = merge_results(vec![area("13201"), area("13100"), area("13201")], true);
        let codes: Vec<&str> = merged.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["13100", "13201"]);
    }

    #[test]
    fn test_latest_year_prefers_first_on_tie() {
        let a = ty("a", 2023, 1);
        let b = ty("b", 2023, 2);
        let c = ty("c", 2022, 3);
        let best = latest_year(vec![c, a, b]).unwrap();
        assert_eq!(best.id, "a");
    }

    #[test]
    fn test_sort_dataset_types_newest_first() {
        let mut types = vec![ty("old", 2022, 1), ty("new2", 2023, 2), ty("new1", 2023, 1)];
        sort_dataset_types(&mut types);
        let ids: Vec<&str> = types.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["new1", "new2", "old"]);
    }
}
