//! Immutable per-project catalog state.

use std::collections::{BTreeMap, HashSet};

use catalog_common::CatalogItem;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::convert::{
    citygml_from, city_from, dataset_from, dataset_type_from, prefecture_from, ward_from,
    PLATEAU_SPECS,
};
use crate::model::{Area, AreaType, CityGmlDataset, Dataset, DatasetType, PlateauSpec};

/// One fully built generation of a project's catalog.
///
/// Built by a single pass over the catalog items and never mutated
/// afterwards; an update replaces the whole value.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Prefectures, then cities, then wards.
    pub areas: Vec<Area>,
    /// Plateau, then related, then generic types.
    pub dataset_types: Vec<DatasetType>,
    pub datasets: Vec<Dataset>,
    /// CityGML packages keyed by city code.
    pub citygml: BTreeMap<String, CityGmlDataset>,
    pub plateau_specs: Vec<PlateauSpec>,
    pub years: Vec<i32>,
    /// The flat legacy catalog.
    pub items: Vec<CatalogItem>,
    pub warnings: Vec<String>,
    pub built_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn build(items: Vec<CatalogItem>) -> Self {
        let mut fold = Fold::default();
        for item in &items {
            fold.add(item);
        }
        fold.finish(items)
    }

    pub fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Default)]
struct Fold {
    area_codes: HashSet<String>,
    prefectures: Vec<Area>,
    cities: Vec<Area>,
    wards: Vec<Area>,
    type_ids: HashSet<String>,
    dataset_types: Vec<DatasetType>,
    dataset_ids: HashSet<String>,
    datasets: Vec<Dataset>,
    citygml: BTreeMap<String, CityGmlDataset>,
    years: Vec<i32>,
    warnings: Vec<String>,
}

impl Fold {
    fn add(&mut self, item: &CatalogItem) {
        for area in [prefecture_from(item), city_from(item), ward_from(item)]
            .into_iter()
            .flatten()
        {
            self.add_area(area);
        }

        if let Some(ty) = dataset_type_from(item) {
            if self.type_ids.insert(ty.id.clone()) {
                self.dataset_types.push(ty);
            }
        }

        if let Some(d) = dataset_from(item) {
            if d.items.is_empty() {
                self.warnings
                    .push(format!("dataset {} ({}) has no files", d.id, d.name));
            }
            if self.dataset_ids.insert(d.id.clone()) {
                self.datasets.push(d);
            } else {
                self.warnings.push(format!(
                    "dataset {} is duplicated: item {} is ignored",
                    d.id, item.id
                ));
            }
        }

        if item.year != 0 && !self.years.contains(&item.year) {
            self.years.push(item.year);
        }

        if let Some(cg) = citygml_from(item) {
            match self.citygml.get(&cg.city_code) {
                Some(existing) if existing.year >= cg.year => {
                    debug!(city_code = %cg.city_code, year = cg.year, kept = existing.year, "Keeping newer CityGML");
                }
                _ => {
                    self.citygml.insert(cg.city_code.clone(), cg);
                }
            }
        }
    }

    fn add_area(&mut self, area: Area) {
        if !self.area_codes.insert(area.code.clone()) {
            return;
        }
        match area.area_type {
            AreaType::Prefecture => self.prefectures.push(area),
            AreaType::City => self.cities.push(area),
            AreaType::Ward => self.wards.push(area),
        }
    }

    fn finish(mut self, items: Vec<CatalogItem>) -> Snapshot {
        self.years.sort_unstable();
        self.dataset_types.sort_by_key(|t| t.category);
        self.datasets.sort_by_key(|d| d.category);

        let mut areas = self.prefectures;
        areas.extend(self.cities);
        areas.extend(self.wards);

        Snapshot {
            areas,
            dataset_types: self.dataset_types,
            datasets: self.datasets,
            citygml: self.citygml,
            plateau_specs: PLATEAU_SPECS.clone(),
            years: self.years,
            items,
            warnings: self.warnings,
            built_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_common::Family;

    fn item(id: &str, city_code: &str, year: i32) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: "建築物モデル".to_string(),
            pref: "東京都".to_string(),
            pref_code: "13".to_string(),
            city: "八王子市".to_string(),
            city_code: city_code.to_string(),
            type_name: "建築物モデル".to_string(),
            type_en: "bldg".to_string(),
            format: "3dtiles".to_string(),
            url: format!("https://example.com/{}/tileset.json", id),
            year,
            spec: "第2.3版".to_string(),
            edition: "2022".to_string(),
            family: Family::Plateau,
            ..Default::default()
        }
    }

    #[test]
    fn test_fold_deduplicates_areas_and_types() {
        let items = vec![
            item("13201_hachioji-shi_bldg", "13201", 2022),
            CatalogItem {
                type_en: "tran".to_string(),
                type_name: "道路モデル".to_string(),
                name: "道路モデル".to_string(),
                ..item("13201_hachioji-shi_tran", "13201", 2022)
            },
        ];
        let snapshot = Snapshot::build(items);

        let codes: Vec<&str> = snapshot.areas.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["13", "13201"]);
        assert_eq!(snapshot.dataset_types.len(), 2);
        assert_eq!(snapshot.datasets.len(), 2);
        assert_eq!(snapshot.years, vec![2022]);
        assert!(snapshot.warnings.is_empty());
        assert_eq!(snapshot.items.len(), 2);
    }

    #[test]
    fn test_duplicate_dataset_ids_warn() {
        let snapshot = Snapshot::build(vec![
            item("13201_hachioji-shi_bldg", "13201", 2022),
            item("13201_hachioji-shi_bldg", "13201", 2022),
        ]);
        assert_eq!(snapshot.datasets.len(), 1);
        assert_eq!(snapshot.warnings.len(), 1);
    }

    #[test]
    fn test_years_sorted_and_distinct() {
        let snapshot = Snapshot::build(vec![
            item("a", "13201", 2023),
            item("b", "13202", 2020),
            item("c", "13203", 2023),
            item("d", "13204", 0),
        ]);
        assert_eq!(snapshot.years, vec![2020, 2023]);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::build(vec![]);
        assert!(snapshot.is_empty());
        assert!(snapshot.areas.is_empty());
        assert_eq!(snapshot.plateau_specs.len(), 2);
    }
}
