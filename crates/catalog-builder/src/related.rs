//! Related and generic records: the legacy `dataset` and `usecase` models.
//!
//! Each record becomes exactly one catalog item. Neither model carries a
//! city code, so the code fields stay empty unless the record itself names
//! one through its asset.

use catalog_common::{
    asset_url_from_format, format_pref_code, format_type_en, normalize_pref, split_comma_list,
    year_int, CatalogConfig, CatalogItem, Family, NATIONWIDE,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::plateau::PublicAsset;
use crate::CatalogSource;

const EDITION: &str = "2022";
const FOLDER: &str = "フォルダ";
const FOLDER_EN: &str = "folder";
const USECASE: &str = "ユースケース";
const USECASE_EN: &str = "usecase";
const TYPE_SUFFIX: &str = "情報";

static DATASET_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("公園", "park"),
        ("避難施設", "shelter"),
        ("鉄道", "railway"),
        ("鉄道駅", "station"),
        ("行政界", "border"),
        ("ランドマーク", "landmark"),
        ("緊急輸送道路", "emergency_route"),
    ])
});

/// English code of a related dataset type.
pub fn dataset_type_en(type_name: &str) -> Option<&'static str> {
    DATASET_TYPES.get(type_name).copied()
}

/// One record of the legacy `dataset` model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub prefecture: String,
    pub city_name: String,
    pub ward_name: String,
    #[serde(rename = "opendata_url")]
    pub open_data_url: String,
    pub description: String,
    pub year: String,
    pub data: Option<PublicAsset>,
    pub data_format: String,
    pub data_url: String,
    #[serde(rename = "data_layer")]
    pub data_layers: String,
    pub config: String,
    pub order: Option<i32>,
    #[serde(rename = "data_orig")]
    pub original_data: Vec<PublicAsset>,
}

/// One record of the legacy `usecase` model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsecaseItem {
    pub id: String,
    pub name: String,
    pub prefecture: String,
    pub city_name: String,
    pub ward_name: String,
    #[serde(rename = "opendata_url")]
    pub open_data_url: String,
    pub description: String,
    pub year: String,
    pub data: Option<PublicAsset>,
    pub data_format: String,
    pub data_url: String,
    #[serde(rename = "data_layer")]
    pub data_layers: String,
    pub config: String,
    pub order: Option<i32>,
    pub category: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub type_en: String,
    pub infobox: bool,
    /// Drop the city and ward the record is filed under.
    #[serde(skip)]
    pub hide_city_and_ward: bool,
}

fn data_url(data: Option<&PublicAsset>, fallback: &str) -> String {
    data.map(|d| d.url.as_str())
        .filter(|u| !u.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn parse_config(id: &str, config: &str) -> Option<CatalogConfig> {
    if config.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(config) {
        Ok(c) => Some(c),
        Err(e) => {
            debug!(item = id, error = %e, "Ignoring malformed item config");
            None
        }
    }
}

/// Split `<city>/<ward>` unless the ward is given on its own.
fn city_and_ward(city_name: &str, ward_name: &str) -> (String, String) {
    if !ward_name.is_empty() {
        return (city_name.to_string(), ward_name.to_string());
    }
    match city_name.split_once('/') {
        Some((city, ward)) => (city.to_string(), ward.to_string()),
        None => (city_name.to_string(), String::new()),
    }
}

fn extension(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.').map_or("", |(_, ext)| ext)
}

impl DatasetItem {
    pub fn to_catalog_item(&self) -> CatalogItem {
        let (pref, pref_code) = normalize_pref(&self.prefecture);
        let (city, ward) = city_and_ward(&self.city_name, &self.ward_name);

        let format = format_type_en(&self.data_format);
        let url = data_url(self.data.as_ref(), &self.data_url);

        let (original_url, original_format) = match self.original_data.first() {
            Some(orig) => {
                let f = format_type_en(extension(&orig.url));
                (asset_url_from_format(&orig.url, &f), f)
            }
            None => (String::new(), String::new()),
        };

        let type_name = match self.type_name.as_str() {
            "" => String::new(),
            t if t.ends_with(TYPE_SUFFIX) => t.to_string(),
            t => format!("{}{}", t, TYPE_SUFFIX),
        };

        let name = if type_name.is_empty() {
            self.name.clone()
        } else {
            let city_or_ward = if ward.is_empty() { &city } else { &ward };
            format!("{}（{}）", type_name, city_or_ward)
        };

        CatalogItem {
            id: self.id.clone(),
            name,
            type_name,
            type_en: dataset_type_en(&self.type_name)
                .unwrap_or_default()
                .to_string(),
            pref,
            pref_code: format_pref_code(pref_code),
            city,
            ward,
            url: asset_url_from_format(&url, &format),
            format,
            original_url,
            original_format,
            description: self.description.clone(),
            config: parse_config(&self.id, &self.config),
            layers: split_comma_list(&self.data_layers),
            year: year_int(&self.year),
            open_data_url: self.open_data_url.clone(),
            order: self.order,
            family: Family::Related,
            edition: EDITION.to_string(),
            ..Default::default()
        }
    }
}

impl UsecaseItem {
    pub fn to_catalog_item(&self) -> CatalogItem {
        let (pref, pref_code) = normalize_pref(&self.prefecture);
        let (city, ward) = if self.hide_city_and_ward {
            (String::new(), String::new())
        } else {
            city_and_ward(&self.city_name, &self.ward_name)
        };

        let base = CatalogItem {
            id: self.id.clone(),
            name: self.name.clone(),
            pref_code: format_pref_code(pref_code),
            description: self.description.clone(),
            family: Family::Generic,
            edition: EDITION.to_string(),
            city_admin: city,
            ward_admin: ward,
            ..Default::default()
        };

        if self.data_format == FOLDER {
            return CatalogItem {
                type_name: FOLDER.to_string(),
                type_en: FOLDER_EN.to_string(),
                pref,
                ..base
            };
        }

        let format = format_type_en(&self.data_format);
        let url = data_url(self.data.as_ref(), &self.data_url);

        let (mut type_name, mut type_en) = (self.type_name.clone(), self.type_en.clone());
        if !type_name.is_empty() && type_en.is_empty() {
            type_en = type_name.clone();
        }
        if type_name.is_empty() || type_name == USECASE || type_en == USECASE_EN {
            type_name = USECASE.to_string();
            type_en = USECASE_EN.to_string();
        }

        let category = if self.category.is_empty() && type_name != USECASE {
            USECASE.to_string()
        } else {
            self.category.clone()
        };

        CatalogItem {
            type_name,
            type_en,
            url: asset_url_from_format(&url, &format),
            format,
            config: parse_config(&self.id, &self.config),
            layers: split_comma_list(&self.data_layers),
            year: year_int(&self.year),
            open_data_url: self.open_data_url.clone(),
            order: self.order,
            root_type: pref != NATIONWIDE,
            category,
            infobox: self.infobox,
            pref,
            ..base
        }
    }
}

impl CatalogSource for DatasetItem {
    fn city_name(&self) -> &str {
        &self.city_name
    }

    fn catalog_items(&self) -> Vec<CatalogItem> {
        vec![self.to_catalog_item()]
    }
}

impl CatalogSource for UsecaseItem {
    fn city_name(&self) -> &str {
        &self.city_name
    }

    fn catalog_items(&self) -> Vec<CatalogItem> {
        vec![self.to_catalog_item()]
    }
}
