//! All legacy records of one project, converted together.

use std::collections::HashMap;

use catalog_common::CatalogItem;

use crate::plateau::PlateauItem;
use crate::related::{DatasetItem, UsecaseItem};
use crate::CatalogSource;

#[derive(Debug, Clone, Default)]
pub struct ResponseAll {
    pub plateau: Vec<PlateauItem>,
    pub dataset: Vec<DatasetItem>,
    pub usecase: Vec<UsecaseItem>,
}

impl ResponseAll {
    /// Every catalog item: plateau first, then related, then generic.
    pub fn all(&self) -> Vec<CatalogItem> {
        let mut items = self.plateau_items();
        items.extend(self.dataset_items());
        items.extend(self.usecase_items());
        items
    }

    /// Plateau items of the latest year of each city.
    pub fn plateau_items(&self) -> Vec<CatalogItem> {
        latest_year_only(collect_items(&self.plateau))
    }

    pub fn dataset_items(&self) -> Vec<CatalogItem> {
        collect_items(&self.dataset)
    }

    pub fn usecase_items(&self) -> Vec<CatalogItem> {
        collect_items(&self.usecase)
    }

    pub fn is_empty(&self) -> bool {
        self.plateau.is_empty() && self.dataset.is_empty() && self.usecase.is_empty()
    }
}

fn collect_items<T: CatalogSource>(records: &[T]) -> Vec<CatalogItem> {
    records.iter().flat_map(|r| r.catalog_items()).collect()
}

/// Keep the items whose year is the year of the last item seen for their
/// city code.
fn latest_year_only(items: Vec<CatalogItem>) -> Vec<CatalogItem> {
    let years: HashMap<String, i32> = items
        .iter()
        .map(|i| (i.city_code.clone(), i.year))
        .collect();

    items
        .into_iter()
        .filter(|i| years.get(&i.city_code) == Some(&i.year))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(code: &str, year: i32) -> CatalogItem {
        CatalogItem {
            id: format!("{}_{}", code, year),
            city_code: code.to_string(),
            year,
            ..Default::default()
        }
    }

    #[test]
    fn test_latest_year_only() {
        let items = vec![item("13100", 2020), item("13100", 2022), item("14100", 2021)];
        let kept: Vec<String> = latest_year_only(items).into_iter().map(|i| i.id).collect();
        assert_eq!(kept, vec!["13100_2022", "14100_2021"]);
    }

    #[test]
    fn test_all_orders_sources() {
        let res = ResponseAll {
            dataset: vec![DatasetItem {
                id: "d".to_string(),
                ..Default::default()
            }],
            usecase: vec![UsecaseItem {
                id: "u".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let ids: Vec<String> = res.all().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["d", "u"]);
    }
}
