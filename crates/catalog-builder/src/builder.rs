//! Generic catalog item builder.
//!
//! Turns the assets of one feature type of one city into catalog items:
//! assets are decoded, partitioned into groups by the feature's policy,
//! ordered, and each group becomes one item whose config lists the group's
//! files. The builder holds no shared state and performs no I/O.

use std::collections::HashMap;

use catalog_common::{
    asset_root_path, asset_url_from_format, format_pref_code, pref_code, CatalogConfig,
    CatalogItem, ConfigItem, Family,
};
use tracing::debug;

use crate::asset_name::{join_non_empty, AssetName};
use crate::description::{layers_if_supported, Description, ItemOverride, Override};
use crate::dic::{Dic, DicEntry};
use crate::options::BuilderOption;

/// Suffix of config labels of untextured assets.
pub const NO_TEXTURE_LABEL: &str = "（テクスチャなし）";

const EDITION: &str = "2022";

/// City-level identity shared by every item built from one source record.
#[derive(Debug, Clone, Default)]
pub struct CityContext {
    /// ID of the source record.
    pub id: String,
    pub prefecture: String,
    pub city: String,
    pub city_en: String,
    pub city_code: String,
    pub dic: Dic,
    pub open_data_url: String,
    pub year: i32,
    pub spec: String,
    pub citygml_url: String,
    pub citygml_asset_id: String,
    pub citygml_feature_types: Vec<String>,
    pub max_lod_url: String,
    pub sdk_public: bool,
}

impl CityContext {
    fn id(&self, an: &AssetName, group_name: &str) -> String {
        join_non_empty(
            &[
                &self.city_code,
                &self.city_en,
                &an.ward_code,
                &an.ward_en,
                &an.feature,
                group_name,
            ],
            "_",
        )
    }
}

/// Input of the per-group and per-item override callbacks.
#[derive(Debug, Clone, Copy)]
pub struct ItemContext<'a> {
    pub asset_name: &'a AssetName,
    pub description: &'a Description,
    pub dic_entry: Option<&'a DicEntry>,
    pub group_name: &'a str,
    /// Position of the asset in its group; `None` for group callbacks.
    pub index: Option<usize>,
    pub asset_len: usize,
}

#[derive(Debug)]
struct Asset<'a> {
    index: usize,
    url: &'a str,
    name: AssetName,
    description: Description,
    dic: Option<&'a DicEntry>,
}

impl Asset<'_> {
    fn asset_url(&self) -> String {
        asset_url_from_format(self.url, &self.name.format)
    }
}

#[derive(Debug)]
struct AssetGroup<'a> {
    name: String,
    assets: Vec<Asset<'a>>,
}

impl AssetGroup<'_> {
    /// Index of the asset used for the item's own URL.
    fn default_asset(&self, max_lod: bool) -> Option<usize> {
        if self.assets.is_empty() {
            return None;
        }
        if !max_lod {
            return Some(0);
        }

        // first of the highest LOD
        let mut best = 0;
        for (i, a) in self.assets.iter().enumerate().skip(1) {
            if a.name.lod_int() > self.assets[best].name.lod_int() {
                best = i;
            }
        }
        Some(best)
    }
}

/// Builds the catalog items of one feature type of one city.
#[derive(Debug, Clone, Copy)]
pub struct CatalogItemBuilder<'a> {
    pub assets: &'a [String],
    pub search_index: &'a [String],
    pub descriptions: &'a [String],
    pub city: &'a CityContext,
    pub option: &'a BuilderOption,
}

impl<'a> CatalogItemBuilder<'a> {
    pub fn build(&self) -> Vec<CatalogItem> {
        if self.assets.is_empty() {
            return Vec::new();
        }

        let assets: Vec<Asset<'a>> = self
            .assets
            .iter()
            .enumerate()
            .map(|(index, url)| {
                let name = AssetName::parse(url);
                let description = Description::for_asset(
                    url,
                    &name,
                    self.descriptions,
                    !self.option.multiple_desc,
                );
                let dic = self.city.dic.find_by_asset(&name);
                Asset {
                    index,
                    url,
                    name,
                    description,
                    dic,
                }
            })
            .collect();

        let mut groups = self.group(assets);
        for g in &mut groups {
            self.sort_assets(&mut g.assets);
        }

        let base = Override {
            name: Some(self.option.type_name.to_string()),
            type_name: Some(self.option.type_name.to_string()),
            type_en: Some(self.option.type_en.to_string()),
            layers: self.option.layers(),
            ..Default::default()
        };

        let mut results = Vec::with_capacity(groups.len());
        for (i, g) in groups.iter().enumerate() {
            let Some(default_index) = g.default_asset(self.option.use_max_lod_as_default) else {
                debug!(feature = self.option.type_en, group = %g.name, "Dropping group without assets");
                continue;
            };
            let default_asset = &g.assets[default_index];
            let group_override = default_asset
                .description
                .overrides
                .clone()
                .merge(self.group_override(default_asset, g).merge(base.clone()));

            let config = if self.option.lod || self.option.item.is_some() {
                g.assets
                    .iter()
                    .enumerate()
                    .map(|(i, a)| {
                        let o = a
                            .description
                            .overrides
                            .item()
                            .merge(self.item_override(g, a, i).merge(base.item()));
                        ConfigItem {
                            name: o.name.clone().unwrap_or_default(),
                            url: a.asset_url(),
                            format: a.name.format.clone(),
                            layers: o.layers_if_supported(&a.name.format),
                            ..Default::default()
                        }
                    })
                    .collect()
            } else {
                Vec::new()
            };

            let add_item_id = self.option.item_id && i == 0;
            match self.catalog_item(default_asset, g, add_item_id, config, group_override) {
                Some(item) => results.push(item),
                None => debug!(
                    feature = self.option.type_en,
                    asset = default_asset.url,
                    "Dropping item without identity"
                ),
            }
        }

        debug!(
            feature = self.option.type_en,
            city = %self.city.city_code,
            assets = self.assets.len(),
            items = results.len(),
            "Built catalog items"
        );
        results
    }

    /// Partition assets by the group key, keeping first-occurrence order, then
    /// apply the policy's stable group ordering.
    fn group(&self, assets: Vec<Asset<'a>>) -> Vec<AssetGroup<'a>> {
        let Some(group_by) = self.option.group_by else {
            return vec![AssetGroup {
                name: String::new(),
                assets,
            }];
        };

        let names: Vec<AssetName> = assets.iter().map(|a| a.name.clone()).collect();
        let mut groups: Vec<AssetGroup<'a>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for a in assets {
            let key = group_by(&a.name, &names);
            match positions.get(&key) {
                Some(&pos) => groups[pos].assets.push(a),
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push(AssetGroup {
                        name: key,
                        assets: vec![a],
                    });
                }
            }
        }

        if let Some(cmp) = self.option.sort_group_by {
            groups.sort_by(|a, b| cmp(&a.assets[0].name, &b.assets[0].name));
        } else {
            groups.sort_by_key(|g| g.assets[0].index);
        }
        groups
    }

    fn sort_assets(&self, assets: &mut [Asset<'a>]) {
        if let Some(cmp) = self.option.sort_asset_by {
            assets.sort_by(|a, b| cmp(&a.name, &b.name));
            return;
        }

        let by_lod = self.option.lod && self.option.sort_by_lod;
        assets.sort_by(|a, b| {
            let lod = if by_lod {
                a.name.lod_int().cmp(&b.name.lod_int())
            } else {
                std::cmp::Ordering::Equal
            };
            lod.then_with(|| {
                let ao = a.description.overrides.dataset_order.unwrap_or(0);
                let bo = b.description.overrides.dataset_order.unwrap_or(0);
                ao.cmp(&bo)
            })
        });
    }

    fn group_override(&self, default_asset: &Asset<'_>, g: &AssetGroup<'_>) -> Override {
        let Some(callback) = self.option.group else {
            return Override::default();
        };
        callback(&ItemContext {
            asset_name: &default_asset.name,
            description: &default_asset.description,
            dic_entry: default_asset.dic,
            group_name: &g.name,
            index: None,
            asset_len: g.assets.len(),
        })
    }

    fn item_override(&self, g: &AssetGroup<'_>, a: &Asset<'_>, index: usize) -> ItemOverride {
        let mut o = match self.option.item {
            Some(callback) => callback(&ItemContext {
                asset_name: &a.name,
                description: &a.description,
                dic_entry: a.dic,
                group_name: &g.name,
                index: Some(index),
                asset_len: g.assets.len(),
            }),
            None => ItemOverride::default(),
        };

        if o.name.is_none() && self.option.lod {
            let mut name = if !a.name.lod.is_empty() {
                format!("LOD{}", a.name.lod)
            } else if g.assets.len() > 1 {
                format!("{}{}", self.option.type_name, index + 1)
            } else {
                self.option.type_name.to_string()
            };
            if a.name.no_texture {
                name.push_str(NO_TEXTURE_LABEL);
            }
            o.name = Some(name);
        }

        o
    }

    fn catalog_item(
        &self,
        a: &Asset<'_>,
        g: &AssetGroup<'_>,
        add_item_id: bool,
        config: Vec<ConfigItem>,
        o: Override,
    ) -> Option<CatalogItem> {
        let city = self.city;
        let group_name = if self.option.omit_group_name_from_id {
            ""
        } else {
            g.name.as_str()
        };

        let id = city.id(&a.name, group_name);
        if id.is_empty() {
            return None;
        }

        let ward = city.dic.ward_name(&a.name.ward_code).unwrap_or_else(|| {
            if a.name.ward_code.is_empty() {
                String::new()
            } else {
                a.name.ward_en.clone()
            }
        });
        let ward_code = if ward.is_empty() {
            String::new()
        } else {
            a.name.ward_code.clone()
        };

        let city_or_ward = if ward.is_empty() { &city.city } else { &ward };
        let subname = o
            .subname
            .as_deref()
            .map(|s| format!(" {}", s))
            .unwrap_or_default();
        let area = o.area.as_deref().unwrap_or(city_or_ward);
        let name = format!(
            "{}{}（{}）",
            o.name.as_deref().unwrap_or_default(),
            subname,
            area
        );

        let open_data_url = if city.open_data_url.is_empty() {
            open_data_url_from_asset_name(&a.name)
        } else {
            city.open_data_url.clone()
        };

        let search_index = if self.option.search_index {
            search_index_url(self.search_index, &ward_code)
        } else {
            String::new()
        };

        let format = a.name.format.clone();
        Some(CatalogItem {
            id,
            item_id: if add_item_id {
                city.id.clone()
            } else {
                String::new()
            },
            name,
            pref: city.prefecture.clone(),
            pref_code: format_pref_code(pref_code(&city.prefecture)),
            city: city.city.clone(),
            city_en: city.city_en.clone(),
            city_code: city.city_code.clone(),
            ward,
            ward_en: a.name.ward_en.clone(),
            ward_code,
            type_name: o.type_name.clone().unwrap_or_default(),
            type2: o.type2.clone().unwrap_or_default(),
            type_en: o.type_en.clone().unwrap_or_default(),
            type2_en: o.type2_en.clone().unwrap_or_default(),
            layers: layers_if_supported(o.layers.as_deref(), &format),
            url: a.asset_url(),
            format,
            description: a.description.desc.clone(),
            search_index,
            year: city.year,
            open_data_url,
            config: (!config.is_empty()).then_some(CatalogConfig { data: config }),
            order: o.order,
            root: o.root.unwrap_or(false),
            root_type: self.option.root_type,
            group: o.group.clone().unwrap_or_default(),
            infobox: true,
            spec: city.spec.clone(),
            family: Family::Plateau,
            edition: EDITION.to_string(),
            citygml_url: city.citygml_url.clone(),
            citygml_asset_id: city.citygml_asset_id.clone(),
            citygml_feature_types: city.citygml_feature_types.clone(),
            max_lod_url: city.max_lod_url.clone(),
            sdk_public: city.sdk_public,
            ..Default::default()
        })
    }
}

fn open_data_url_from_asset_name(a: &AssetName) -> String {
    format!(
        "https://www.geospatial.jp/ckan/dataset/plateau-{}-{}-{}",
        a.city_code, a.city_en, a.year
    )
}

/// Search index of the ward (any index when the item has no ward).
fn search_index_url(assets: &[String], ward_code: &str) -> String {
    let Some(url) = assets
        .iter()
        .find(|u| ward_code.is_empty() || AssetName::parse(u).ward_code == ward_code)
    else {
        return String::new();
    };

    let (base, rest) = match url.find(['?', '#']) {
        Some(i) => url.split_at(i),
        None => (url.as_str(), ""),
    };
    format!("{}/indexRoot.json{}", asset_root_path(base), rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_index_url_matches_ward() {
        let assets = vec![
            "https://example.com/13100_tokyo_2022_3dtiles_1_op_bldg_13101_chiyoda-ku_index.zip"
                .to_string(),
            "https://example.com/13100_tokyo_2022_3dtiles_1_op_bldg_13102_chuo-ku_index.zip"
                .to_string(),
        ];
        assert_eq!(
            search_index_url(&assets, "13102"),
            "https://example.com/13100_tokyo_2022_3dtiles_1_op_bldg_13102_chuo-ku_index/indexRoot.json"
        );
        assert!(search_index_url(&assets, "13103").is_empty());
        assert!(search_index_url(&assets, "").ends_with("chiyoda-ku_index/indexRoot.json"));
    }

    #[test]
    fn test_open_data_url_from_asset_name() {
        let an = AssetName::parse("13100_tokyo_2022_3dtiles_1_op_bldg_lod1.zip");
        assert_eq!(
            open_data_url_from_asset_name(&an),
            "https://www.geospatial.jp/ckan/dataset/plateau-13100-tokyo-2022"
        );
    }

    #[test]
    fn test_default_asset_prefers_first_max_lod() {
        let urls: Vec<String> = [
            "13100_tokyo_2022_3dtiles_1_op_bldg_lod2.zip",
            "13100_tokyo_2022_3dtiles_1_op_bldg_lod1.zip",
            "13100_tokyo_2022_3dtiles_1_op_bldg_lod2_no_texture.zip",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let g = AssetGroup {
            name: String::new(),
            assets: urls
                .iter()
                .enumerate()
                .map(|(index, url)| Asset {
                    index,
                    url,
                    name: AssetName::parse(url),
                    description: Description::default(),
                    dic: None,
                })
                .collect(),
        };

        assert_eq!(g.default_asset(true), Some(0));
        assert_eq!(g.default_asset(false), Some(0));
    }
}
