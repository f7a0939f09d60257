//! Structured model records: one `plateau-city` record per city and one
//! `plateau-<feature>` record per city and feature type.
//!
//! These feed the same [`CatalogItemBuilder`] as the legacy records.

use std::collections::HashMap;

use catalog_common::{year_int, CatalogItem};
use serde::{Deserialize, Serialize};

use crate::asset_name::AssetName;
use crate::builder::{CatalogItemBuilder, CityContext};
use crate::dic::Dic;
use crate::options::FeatureType;

/// Spec version assumed when a city record names none.
pub const DEFAULT_SPEC: &str = "第3.2版";

/// Asset field value: a bare URL or an asset object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetRef {
    Url(String),
    Asset {
        #[serde(default)]
        id: String,
        #[serde(default)]
        url: String,
    },
}

impl AssetRef {
    pub fn url(&self) -> &str {
        match self {
            AssetRef::Url(url) => url,
            AssetRef::Asset { url, .. } => url,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            AssetRef::Url(_) => "",
            AssetRef::Asset { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityItem {
    pub id: String,
    pub prefecture: String,
    pub city_name: String,
    pub city_name_en: String,
    pub city_code: String,
    pub spec: String,
    pub year: String,
    pub open_data_url: String,
    pub sdk_public: bool,
}

impl CityItem {
    pub fn spec(&self) -> &str {
        if self.spec.is_empty() {
            DEFAULT_SPEC
        } else {
            &self.spec
        }
    }

    pub fn year_int(&self) -> i32 {
        year_int(&self.year)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureItemDatum {
    pub id: String,
    pub data: Vec<AssetRef>,
    pub name: String,
    pub desc: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureItem {
    pub id: String,
    /// ID of the city record this feature belongs to.
    pub city: String,
    pub citygml: Option<AssetRef>,
    pub data: Vec<AssetRef>,
    pub desc: String,
    pub items: Vec<FeatureItemDatum>,
    pub dic: String,
    pub maxlod: Option<AssetRef>,
}

impl FeatureItem {
    /// Every asset URL of the record, top-level data first.
    pub fn asset_urls(&self) -> Vec<String> {
        self.data
            .iter()
            .chain(self.items.iter().flat_map(|i| i.data.iter()))
            .map(|a| a.url().to_string())
            .filter(|u| !u.is_empty())
            .collect()
    }

    /// Descriptions in the shape the builder expects.
    ///
    /// Features with one description per asset get one entry per asset,
    /// headed by the asset's file name.
    pub fn descriptions(&self, multiple: bool) -> Vec<String> {
        if !multiple {
            return vec![self.desc.clone()];
        }

        let top = self.data.iter().map(|a| (a, self.desc.as_str()));
        let nested = self
            .items
            .iter()
            .flat_map(|i| i.data.iter().map(move |a| (a, i.desc.as_str())));

        top.chain(nested)
            .filter(|(_, desc)| !desc.is_empty())
            .map(|(a, desc)| {
                let url = a.url();
                let file = url.rsplit('/').next().unwrap_or(url);
                format!("{}\n{}", file, desc)
            })
            .collect()
    }
}

/// All structured records of one project.
#[derive(Debug, Clone, Default)]
pub struct StructuredItems {
    pub cities: Vec<CityItem>,
    pub features: HashMap<FeatureType, Vec<FeatureItem>>,
}

impl StructuredItems {
    fn features_of<'a>(
        &'a self,
        ft: FeatureType,
        city_id: &'a str,
    ) -> impl Iterator<Item = &'a FeatureItem> + 'a {
        self.features
            .get(&ft)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(move |f| f.city == city_id)
    }

    /// CityGML feature types that have a CityGML asset for the city.
    fn citygml_feature_types(&self, city_id: &str) -> Vec<String> {
        FeatureType::ALL
            .into_iter()
            .filter(|ft| {
                ft.is_citygml()
                    && self
                        .features_of(*ft, city_id)
                        .any(|f| f.citygml.is_some())
            })
            .map(|ft| ft.code().to_string())
            .collect()
    }

    fn city_context(&self, city: &CityItem, feature: &FeatureItem, types: &[String]) -> CityContext {
        let citygml = feature.citygml.as_ref();
        let city_en = if city.city_name_en.is_empty() {
            citygml
                .map(|a| AssetName::parse(a.url()).city_en)
                .unwrap_or_default()
        } else {
            city.city_name_en.clone()
        };

        CityContext {
            id: feature.id.clone(),
            prefecture: city.prefecture.clone(),
            city: city.city_name.clone(),
            city_en,
            city_code: city.city_code.clone(),
            dic: Dic::parse(&feature.dic),
            open_data_url: city.open_data_url.clone(),
            year: city.year_int(),
            spec: city.spec().to_string(),
            citygml_url: citygml.map(|a| a.url().to_string()).unwrap_or_default(),
            citygml_asset_id: citygml.map(|a| a.id().to_string()).unwrap_or_default(),
            citygml_feature_types: types.to_vec(),
            max_lod_url: feature
                .maxlod
                .as_ref()
                .map(|a| a.url().to_string())
                .unwrap_or_default(),
            sdk_public: city.sdk_public,
        }
    }

    /// Catalog items of every city, in city then feature type order.
    pub fn catalog_items(&self) -> Vec<CatalogItem> {
        let mut items = Vec::new();
        for city in &self.cities {
            if city.id.is_empty() || city.year_int() == 0 {
                continue;
            }

            let types = self.citygml_feature_types(&city.id);
            for ft in FeatureType::ALL {
                let option = ft.option();
                for feature in self.features_of(ft, &city.id) {
                    let context = self.city_context(city, feature, &types);
                    let assets = feature.asset_urls();
                    let descriptions = feature.descriptions(option.multiple_desc);
                    items.extend(
                        CatalogItemBuilder {
                            assets: &assets,
                            search_index: &[],
                            descriptions: &descriptions,
                            city: &context,
                            option,
                        }
                        .build(),
                    );
                }
            }
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_ref_forms() {
        let refs: Vec<AssetRef> =
            serde_json::from_str(r#"["https://a/x.zip", {"id": "a1", "url": "https://a/y.zip"}]"#)
                .unwrap();
        assert_eq!(refs[0].url(), "https://a/x.zip");
        assert_eq!(refs[1].url(), "https://a/y.zip");
        assert_eq!(refs[1].id(), "a1");
    }

    #[test]
    fn test_city_spec_default() {
        let city = CityItem::default();
        assert_eq!(city.spec(), "第3.2版");
    }

    #[test]
    fn test_descriptions_are_headed_by_file_name() {
        let feature = FeatureItem {
            data: vec![AssetRef::Url("https://a/b/x_fld.zip".to_string())],
            desc: "top".to_string(),
            items: vec![FeatureItemDatum {
                data: vec![AssetRef::Url("https://a/b/y_fld.zip".to_string())],
                desc: "nested".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(feature.descriptions(false), vec!["top"]);
        assert_eq!(
            feature.descriptions(true),
            vec!["x_fld.zip\ntop", "y_fld.zip\nnested"]
        );
        assert_eq!(
            feature.asset_urls(),
            vec!["https://a/b/x_fld.zip", "https://a/b/y_fld.zip"]
        );
    }

    #[test]
    fn test_catalog_items_per_city() {
        let mut items = StructuredItems {
            cities: vec![CityItem {
                id: "c1".to_string(),
                prefecture: "東京都".to_string(),
                city_name: "八王子市".to_string(),
                city_name_en: "hachioji-shi".to_string(),
                city_code: "13201".to_string(),
                year: "2023".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        items.features.insert(
            FeatureType::Bldg,
            vec![FeatureItem {
                id: "f1".to_string(),
                city: "c1".to_string(),
                citygml: Some(AssetRef::Url(
                    "https://a/13201_hachioji-shi_2023_citygml_1_op.zip".to_string(),
                )),
                data: vec![AssetRef::Url(
                    "https://a/13201_hachioji-shi_2023_3dtiles_1_op_bldg_lod1.zip"
                        .to_string(),
                )],
                ..Default::default()
            }],
        );

        let result = items.catalog_items();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].city_code, "13201");
        assert_eq!(result[0].year, 2023);
        assert_eq!(result[0].spec, "第3.2版");
        assert_eq!(result[0].citygml_feature_types, vec!["bldg"]);
    }
}
