//! Flat catalog records.
//!
//! `CatalogItem` is the normalized output of the item builder and the input of
//! the snapshot fold. Its JSON form is the legacy catalog array served to
//! existing consumers; fields marked `#[serde(skip)]` are cross references used
//! only inside the process.

use serde::{Deserialize, Serialize};

/// Which upstream model family a catalog item was derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// 3D city model assets built from the plateau model.
    #[default]
    Plateau,
    /// Related datasets (parks, shelters, borders, ...).
    Related,
    /// Use cases and other free-form datasets.
    Generic,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Plateau => "plateau",
            Family::Related => "related",
            Family::Generic => "generic",
        }
    }
}

/// One selectable file of a multi-file dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigItem {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original_format: String,
}

/// Ordered sub-file list of a catalog item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub data: Vec<ConfigItem>,
}

/// A synthesized, user-facing dataset entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItem {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "itemId", skip_serializing_if = "String::is_empty")]
    pub item_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pref: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pref_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city_en: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city_code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ward: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ward_en: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ward_code: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub type2: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub type_en: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub type2_en: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "desc", skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub search_index: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(rename = "openDataUrl", skip_serializing_if = "String::is_empty")]
    pub open_data_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<CatalogConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub original_format: String,
    /// Do not create a type folder for this item.
    #[serde(skip_serializing_if = "is_false")]
    pub root: bool,
    /// Create the type folder at the root.
    #[serde(skip_serializing_if = "is_false")]
    pub root_type: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(skip_serializing_if = "is_false")]
    pub infobox: bool,
    /// Alias of the type used as a folder name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub category: String,

    // internal
    #[serde(skip)]
    pub spec: String,
    #[serde(skip)]
    pub family: Family,
    #[serde(skip)]
    pub edition: String,
    #[serde(skip)]
    pub citygml_url: String,
    #[serde(skip)]
    pub citygml_asset_id: String,
    #[serde(skip)]
    pub citygml_feature_types: Vec<String>,
    #[serde(skip)]
    pub max_lod_url: String,
    #[serde(skip)]
    pub sdk_public: bool,
    #[serde(skip)]
    pub city_admin: String,
    #[serde(skip)]
    pub city_code_admin: String,
    #[serde(skip)]
    pub ward_admin: String,
    #[serde(skip)]
    pub ward_code_admin: String,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl CatalogItem {
    /// The item's own file as a config entry, if it has a URL.
    pub fn main_config_item(&self) -> Option<ConfigItem> {
        if self.url.is_empty() {
            return None;
        }

        let name = if self.type2.is_empty() {
            self.type_name.clone()
        } else {
            self.type2.clone()
        };

        Some(ConfigItem {
            name,
            url: self.url.clone(),
            format: self.format.clone(),
            layers: self.layers.clone(),
            original_url: self.original_url.clone(),
            original_format: self.original_format.clone(),
        })
    }

    pub fn config_items(&self) -> &[ConfigItem] {
        self.config.as_ref().map(|c| c.data.as_slice()).unwrap_or_default()
    }

    /// Config entries, or the main file alone when there are none.
    pub fn main_or_config_items(&self) -> Vec<ConfigItem> {
        let items = self.config_items();
        if items.is_empty() {
            return self.main_config_item().into_iter().collect();
        }
        items.to_vec()
    }

    /// City code, falling back to the administrative code of generic items.
    pub fn effective_city_code(&self) -> &str {
        if self.city_code.is_empty() {
            &self.city_code_admin
        } else {
            &self.city_code
        }
    }

    /// Ward code, falling back to the administrative code of generic items.
    pub fn effective_ward_code(&self) -> &str {
        if self.ward_code.is_empty() {
            &self.ward_code_admin
        } else {
            &self.ward_code
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_fields_are_not_serialized() {
        let item = CatalogItem {
            id: "13100_tokyo_bldg".to_string(),
            type_name: "建築物モデル".to_string(),
            year: 2022,
            spec: "第2.3版".to_string(),
            citygml_url: "https://example.com/citygml.zip".to_string(),
            sdk_public: true,
            ..Default::default()
        };

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "13100_tokyo_bldg");
        assert_eq!(json["type"], "建築物モデル");
        assert_eq!(json["year"], 2022);
        assert!(json.get("spec").is_none());
        assert!(json.get("citygml_url").is_none());
        assert!(json.get("root").is_none());
        assert!(json.get("config").is_none());
    }

    #[test]
    fn test_main_or_config_items_prefers_config() {
        let mut item = CatalogItem {
            url: "https://example.com/main.json".to_string(),
            type_name: "公園情報".to_string(),
            format: "geojson".to_string(),
            ..Default::default()
        };

        let main = item.main_or_config_items();
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].name, "公園情報");

        item.config = Some(CatalogConfig {
            data: vec![
                ConfigItem {
                    name: "LOD1".to_string(),
                    ..Default::default()
                },
                ConfigItem {
                    name: "LOD2".to_string(),
                    ..Default::default()
                },
            ],
        });
        let names: Vec<_> = item
            .main_or_config_items()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["LOD1", "LOD2"]);
    }

    #[test]
    fn test_main_config_item_requires_url() {
        let item = CatalogItem::default();
        assert!(item.main_config_item().is_none());
        assert!(item.main_or_config_items().is_empty());
    }
}
