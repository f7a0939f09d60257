//! Legacy plateau model records.
//!
//! One record holds every feature asset of one city and year, with the
//! descriptions and dictionary needed to turn them into catalog items.

use catalog_common::CatalogItem;
use serde::{Deserialize, Serialize};

use crate::asset_name::AssetName;
use crate::builder::{CatalogItemBuilder, CityContext};
use crate::dic::Dic;
use crate::options::FeatureType;
use crate::CatalogSource;

const SDK_PUBLISHED: &str = "公開する";
const NO_DEM: &str = "無し";

/// Asset reference as returned by the public content API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicAsset {
    pub id: String,
    pub url: String,
}

impl PublicAsset {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            url: url.into(),
        }
    }
}

/// One record of the legacy `plateau` model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateauItem {
    pub id: String,
    pub prefecture: String,
    pub city_name: String,
    pub specification: String,
    pub citygml: Option<PublicAsset>,
    pub description_bldg: String,
    pub description_tran: String,
    pub description_frn: String,
    pub description_veg: String,
    pub description_luse: String,
    pub description_lsld: String,
    pub description_urf: Vec<String>,
    pub description_fld: Vec<String>,
    pub description_htd: Vec<String>,
    pub description_ifld: Vec<String>,
    pub description_tnm: Vec<String>,
    pub description_brid: String,
    pub description_rail: String,
    pub description_gen: Vec<String>,
    pub description_extra: Vec<String>,
    pub bldg: Vec<PublicAsset>,
    pub tran: Vec<PublicAsset>,
    pub frn: Vec<PublicAsset>,
    pub veg: Vec<PublicAsset>,
    pub luse: Vec<PublicAsset>,
    pub lsld: Vec<PublicAsset>,
    pub urf: Vec<PublicAsset>,
    pub fld: Vec<PublicAsset>,
    pub htd: Vec<PublicAsset>,
    pub ifld: Vec<PublicAsset>,
    pub tnm: Vec<PublicAsset>,
    pub brid: Vec<PublicAsset>,
    pub rail: Vec<PublicAsset>,
    pub gen: Vec<PublicAsset>,
    pub extra: Vec<PublicAsset>,
    pub dictionary: Option<PublicAsset>,
    pub dic: String,
    pub dem: String,
    pub search_index: Vec<PublicAsset>,
    #[serde(rename = "opendata_url")]
    pub open_data_url: String,
    pub max_lod: Option<PublicAsset>,
    pub sdk_publication: String,
}

impl PlateauItem {
    pub fn is_sdk_public(&self) -> bool {
        self.sdk_publication == SDK_PUBLISHED
    }

    pub fn feature(&self, ft: FeatureType) -> &[PublicAsset] {
        match ft {
            FeatureType::Bldg => &self.bldg,
            FeatureType::Tran => &self.tran,
            FeatureType::Frn => &self.frn,
            FeatureType::Veg => &self.veg,
            FeatureType::Luse => &self.luse,
            FeatureType::Lsld => &self.lsld,
            FeatureType::Urf => &self.urf,
            FeatureType::Fld => &self.fld,
            FeatureType::Tnm => &self.tnm,
            FeatureType::Htd => &self.htd,
            FeatureType::Ifld => &self.ifld,
            FeatureType::Brid => &self.brid,
            FeatureType::Rail => &self.rail,
            FeatureType::Gen => &self.gen,
            FeatureType::Extra => &self.extra,
        }
    }

    pub fn feature_descriptions(&self, ft: FeatureType) -> Vec<String> {
        match ft {
            FeatureType::Bldg => vec![self.description_bldg.clone()],
            FeatureType::Tran => vec![self.description_tran.clone()],
            FeatureType::Frn => vec![self.description_frn.clone()],
            FeatureType::Veg => vec![self.description_veg.clone()],
            FeatureType::Luse => vec![self.description_luse.clone()],
            FeatureType::Lsld => vec![self.description_lsld.clone()],
            FeatureType::Urf => self.description_urf.clone(),
            FeatureType::Fld => self.description_fld.clone(),
            FeatureType::Tnm => self.description_tnm.clone(),
            FeatureType::Htd => self.description_htd.clone(),
            FeatureType::Ifld => self.description_ifld.clone(),
            FeatureType::Brid => vec![self.description_brid.clone()],
            FeatureType::Rail => vec![self.description_rail.clone()],
            FeatureType::Gen => self.description_gen.clone(),
            FeatureType::Extra => self.description_extra.clone(),
        }
    }

    /// CityGML feature types present in this record, plus `dem` when a
    /// terrain model is declared.
    pub fn citygml_feature_types(&self) -> Vec<String> {
        let mut types: Vec<String> = FeatureType::ALL
            .into_iter()
            .filter(|ft| ft.is_citygml() && !self.feature(*ft).is_empty())
            .map(|ft| ft.code().to_string())
            .collect();

        if !self.dem.is_empty() && self.dem != NO_DEM {
            types.push("dem".to_string());
        }
        types
    }

    /// City-level identity derived from the CityGML asset (or the first
    /// building asset) name. Empty when the record has neither.
    pub fn city_context(&self) -> CityContext {
        let url = match (&self.citygml, self.bldg.first()) {
            (Some(citygml), _) => citygml.url.as_str(),
            (None, Some(bldg)) => bldg.url.as_str(),
            (None, None) => "",
        };
        if url.is_empty() {
            return CityContext::default();
        }

        let an = AssetName::parse(url);
        let citygml = self.citygml.as_ref();

        CityContext {
            id: self.id.clone(),
            prefecture: self.prefecture.clone(),
            city: self.city_name.clone(),
            city_en: an.city_en.clone(),
            city_code: an.city_code.clone(),
            dic: Dic::parse(&self.dic),
            open_data_url: self.open_data_url.clone(),
            year: an.year.parse().unwrap_or(0),
            spec: self.specification.clone(),
            citygml_url: citygml.map(|a| a.url.clone()).unwrap_or_default(),
            citygml_asset_id: citygml.map(|a| a.id.clone()).unwrap_or_default(),
            citygml_feature_types: self.citygml_feature_types(),
            max_lod_url: self.max_lod.as_ref().map(|a| a.url.clone()).unwrap_or_default(),
            sdk_public: self.is_sdk_public(),
        }
    }

    /// Catalog items of one feature type.
    pub fn feature_catalog_items(&self, city: &CityContext, ft: FeatureType) -> Vec<CatalogItem> {
        let assets: Vec<String> = self.feature(ft).iter().map(|a| a.url.clone()).collect();
        let search_index: Vec<String> = self.search_index.iter().map(|a| a.url.clone()).collect();
        let descriptions = self.feature_descriptions(ft);

        CatalogItemBuilder {
            assets: &assets,
            search_index: &search_index,
            descriptions: &descriptions,
            city,
            option: ft.option(),
        }
        .build()
    }

    /// Catalog items of every feature type, in feature type order.
    pub fn all_catalog_items(&self) -> Vec<CatalogItem> {
        let city = self.city_context();
        if city.id.is_empty() || city.year == 0 {
            return Vec::new();
        }

        FeatureType::ALL
            .into_iter()
            .flat_map(|ft| self.feature_catalog_items(&city, ft))
            .collect()
    }
}

impl CatalogSource for PlateauItem {
    fn city_name(&self) -> &str {
        &self.city_name
    }

    fn catalog_items(&self) -> Vec<CatalogItem> {
        self.all_catalog_items()
    }
}
