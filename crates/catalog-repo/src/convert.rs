//! Conversion of flat catalog items into snapshot nodes.
//!
//! Each function looks at one [`CatalogItem`] and returns the node it
//! contributes, if any. The snapshot fold calls them once per item and
//! de-duplicates the results.

use catalog_common::{CatalogItem, ConfigItem, Family};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{
    Area, AreaType, CityGmlAdmin, CityGmlDataset, Dataset, DatasetFormat, DatasetItem,
    DatasetType, DatasetTypeCategory, FloodingScale, NodeKind, PlateauSpec, PlateauSpecMinor,
    River, RiverAdmin, Texture, REGISTRATION_YEAR,
};

const TOKYO_CODE: &str = "13";
const TOKYO_23KU_CODE: &str = "13100";

const SAMPLE_CODE: &str = "sample";
const USECASE_CODE: &str = "usecase";
const GLOBAL_CODE: &str = "global";

/// Spec version assumed for extension datasets (`_ex_` IDs).
const EX_SPEC: &str = "3.0";

/// Display order of plateau dataset types.
const PLATEAU_TYPE_ORDER: [&str; 14] = [
    "bldg", "tran", "brid", "rail", "veg", "frn", "luse", "lsld", "urf", "fld", "tnm", "htd",
    "ifld", "gen",
];

const FLOOD_TYPES: [&str; 4] = ["fld", "htd", "tnm", "ifld"];

/// Landmark kinds that get their own item ID suffix.
const LANDMARK_TYPES: [(&str, &str); 11] = [
    ("病院", "hospital"),
    ("消防署", "fire_station"),
    ("警察署", "police_station"),
    ("郵便局", "post_office"),
    ("保健所", "health_center"),
    ("国の機関", "national_agency"),
    ("地方の機関", "local_agency"),
    ("指定公共機関", "designated_public_institution"),
    ("博物館・美術館", "museum"),
    ("学校", "school"),
    ("ランドマーク", "landmark"),
];

static BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"（[^（]*）").unwrap());

/// The plateau specification versions known to the catalog.
pub static PLATEAU_SPECS: Lazy<Vec<PlateauSpec>> = Lazy::new(|| {
    vec![
        plateau_spec(2, 2022, &[("2.3", 2022)]),
        plateau_spec(3, 2022, &[("3.0", 2023)]),
    ]
});

fn plateau_spec(major: i32, year: i32, minors: &[(&str, i32)]) -> PlateauSpec {
    let id = plateau_spec_id(&major.to_string());
    PlateauSpec {
        id: id.clone(),
        major_version: major,
        year,
        minor_versions: minors
            .iter()
            .map(|(version, year)| PlateauSpecMinor {
                id: plateau_spec_id(version),
                version: version.to_string(),
                name: format!("第{}版", version),
                major_version: major,
                year: *year,
                parent_id: id.clone(),
            })
            .collect(),
    }
}

// ============================================================================
// Specification versions
// ============================================================================

/// `第2.3版` → `2.3`
pub fn spec_number(spec: &str) -> &str {
    let s = spec.strip_prefix('第').unwrap_or(spec);
    s.strip_suffix('版').unwrap_or(s)
}

/// `第2.3版` → `2`
pub fn major_version(spec: &str) -> &str {
    let v = spec_number(spec);
    v.split_once('.').map(|(major, _)| major).unwrap_or(v)
}

pub fn plateau_spec_id(version: &str) -> String {
    NodeKind::PlateauSpec.id(spec_number(version))
}

fn is_ex(item: &CatalogItem) -> bool {
    item.id.contains("_ex_")
}

fn effective_spec(item: &CatalogItem) -> &str {
    if is_ex(item) {
        EX_SPEC
    } else {
        &item.spec
    }
}

fn is_tokyo_23ku(item: &CatalogItem) -> bool {
    item.pref_code == TOKYO_CODE
        && (item.city_code == TOKYO_23KU_CODE
            || item.city_code_admin == TOKYO_23KU_CODE
            || item.city.ends_with('区'))
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

// ============================================================================
// Areas
// ============================================================================

pub fn prefecture_from(item: &CatalogItem) -> Option<Area> {
    if item.pref_code.is_empty() {
        return None;
    }
    Some(Area {
        id: NodeKind::Prefecture.id(&item.pref_code),
        area_type: AreaType::Prefecture,
        code: item.pref_code.clone(),
        name: item.pref.clone(),
        prefecture_code: None,
        city_code: None,
        citygml_id: None,
    })
}

pub fn city_from(item: &CatalogItem) -> Option<Area> {
    let code = item.effective_city_code();
    if item.city.is_empty() || code.is_empty() || item.pref_code.is_empty() {
        return None;
    }

    let citygml_code = if is_tokyo_23ku(item) {
        TOKYO_23KU_CODE
    } else {
        item.city_code.as_str()
    };

    Some(Area {
        id: NodeKind::City.id(code),
        area_type: AreaType::City,
        code: code.to_string(),
        name: item.city.clone(),
        prefecture_code: Some(item.pref_code.clone()),
        city_code: None,
        citygml_id: non_empty(citygml_code).map(|c| NodeKind::CityGml.id(&c)),
    })
}

pub fn ward_from(item: &CatalogItem) -> Option<Area> {
    let code = item.effective_ward_code();
    let city_code = item.effective_city_code();
    if item.ward.is_empty() || code.is_empty() || city_code.is_empty() || item.pref_code.is_empty()
    {
        return None;
    }

    Some(Area {
        id: NodeKind::Ward.id(code),
        area_type: AreaType::Ward,
        code: code.to_string(),
        name: item.ward.clone(),
        prefecture_code: Some(item.pref_code.clone()),
        city_code: Some(city_code.to_string()),
        citygml_id: None,
    })
}

// ============================================================================
// Dataset types
// ============================================================================

pub fn dataset_type_code(item: &CatalogItem) -> String {
    match item.family {
        Family::Plateau => {
            if !item.group.is_empty() {
                SAMPLE_CODE.to_string()
            } else if item.type_en.starts_with("urf_") {
                "urf".to_string()
            } else {
                item.type_en.clone()
            }
        }
        Family::Related => item.type_en.clone(),
        Family::Generic => {
            if item.category == "サンプルデータ" {
                SAMPLE_CODE.to_string()
            } else if !item.category.is_empty() {
                item.category.clone()
            } else if item.pref_code.is_empty() {
                GLOBAL_CODE.to_string()
            } else {
                USECASE_CODE.to_string()
            }
        }
    }
}

pub fn dataset_type_id(item: &CatalogItem) -> String {
    let code = dataset_type_code(item);
    if item.family == Family::Plateau && code != SAMPLE_CODE {
        return NodeKind::DatasetType.id(&format!(
            "{}_{}",
            code,
            major_version(effective_spec(item))
        ));
    }
    NodeKind::DatasetType.id(&code)
}

pub fn dataset_type_from(item: &CatalogItem) -> Option<DatasetType> {
    let code = dataset_type_code(item);
    if code.is_empty() {
        return None;
    }

    let generic = |name: &str| DatasetType {
        id: dataset_type_id(item),
        code: code.clone(),
        name: name.to_string(),
        category: DatasetTypeCategory::Generic,
        year: 0,
        order: None,
        flood: false,
        plateau_spec_id: None,
    };

    let ty = match item.family {
        Family::Plateau if code == SAMPLE_CODE => generic("サンプルデータ"),
        Family::Plateau => {
            let name = if item.type_en.starts_with("urf_") {
                "都市計画決定情報モデル".to_string()
            } else {
                item.type_name.clone()
            };
            let order = PLATEAU_TYPE_ORDER
                .iter()
                .position(|t| *t == code)
                .unwrap_or(PLATEAU_TYPE_ORDER.len())
                + 1;

            DatasetType {
                id: dataset_type_id(item),
                code: code.clone(),
                name,
                category: DatasetTypeCategory::Plateau,
                year: item.edition.parse().unwrap_or(0),
                order: Some(order as i32),
                flood: FLOOD_TYPES.contains(&item.type_en.as_str()),
                plateau_spec_id: Some(plateau_spec_id(major_version(effective_spec(item)))),
            }
        }
        Family::Related => DatasetType {
            id: dataset_type_id(item),
            code: code.clone(),
            name: item.type_name.clone(),
            category: DatasetTypeCategory::Related,
            year: 0,
            order: None,
            flood: false,
            plateau_spec_id: None,
        },
        Family::Generic if code == SAMPLE_CODE => generic("サンプルデータ"),
        Family::Generic if !item.category.is_empty() => generic(&item.category),
        Family::Generic if code == GLOBAL_CODE => generic("全球データ"),
        Family::Generic => generic("ユースケース"),
    };
    Some(ty)
}

// ============================================================================
// Datasets
// ============================================================================

pub fn dataset_id(item: &CatalogItem) -> String {
    if item.family == Family::Generic || (!item.id.is_empty() && !item.group.is_empty()) {
        return NodeKind::Dataset.id(&item.id);
    }

    let area_code = [&item.ward_code, &item.city_code, &item.pref_code]
        .into_iter()
        .find(|c| !c.is_empty())
        .map(String::as_str)
        .unwrap_or_default();
    let sub = subcode(item)
        .map(|s| format!("_{}", s))
        .unwrap_or_default();

    NodeKind::Dataset.id(&format!("{}_{}{}", area_code, dataset_type_code(item), sub))
}

/// Variant code distinguishing datasets of the same type and area.
pub fn subcode(item: &CatalogItem) -> Option<String> {
    if !item.type2_en.is_empty() {
        return Some(item.type2_en.clone());
    }

    let parts: Vec<&str> = item.id.splitn(4, '_').collect();
    // 01100_sapporo-shi_01103_higashi-ku_bldg has no variant
    if parts.len() < 4 || parts[2] != item.type_en {
        return None;
    }

    let mut code = parts[3].strip_suffix("_no_texture").unwrap_or(parts[3]);
    for suffix in ["_l1", "_l2"] {
        code = code.strip_suffix(suffix).unwrap_or(code);
    }
    non_empty(code)
}

pub fn subname(item: &CatalogItem) -> Option<String> {
    if !item.type2.is_empty() {
        return Some(item.type2.clone());
    }
    let name = BRACKETS.replace_all(&item.name, "");
    let name = name.strip_prefix(item.type_name.as_str()).unwrap_or(&*name);
    non_empty(name.trim())
}

fn groups_from(item: &CatalogItem) -> Vec<String> {
    if item.group.is_empty() {
        return Vec::new();
    }
    item.group.split('/').map(str::to_string).collect()
}

fn river_from(item: &CatalogItem) -> Option<River> {
    if item.type_en != "fld" {
        return None;
    }

    let admin = if item.name.contains("（国管理区間）") {
        Some(RiverAdmin::National)
    } else if item.name.contains("（都道府県管理区間）") {
        Some(RiverAdmin::Prefecture)
    } else {
        None
    };
    let stripped = BRACKETS.replace_all(&item.name, "");
    let name = stripped
        .split(' ')
        .find(|s| s.ends_with('川'))
        .unwrap_or_default()
        .to_string();

    Some(River { name, admin })
}

/// Skeleton shared by every dataset category.
fn dataset_base(item: &CatalogItem, id: String, category: DatasetTypeCategory) -> Dataset {
    Dataset {
        id,
        name: item.name.clone(),
        subname: None,
        subcode: None,
        description: item.description.clone(),
        open_data_url: non_empty(&item.open_data_url),
        category,
        prefecture_code: non_empty(&item.pref_code),
        city_code: non_empty(item.effective_city_code()),
        ward_code: non_empty(item.effective_ward_code()),
        year: item.year,
        registration_year: REGISTRATION_YEAR,
        type_id: dataset_type_id(item),
        type_code: dataset_type_code(item),
        groups: groups_from(item),
        plateau_spec_minor_id: None,
        river: None,
        items: Vec::new(),
    }
}

pub fn dataset_from(item: &CatalogItem) -> Option<Dataset> {
    match item.family {
        Family::Plateau => Some(plateau_dataset_from(item)),
        Family::Related => Some(related_dataset_from(item)),
        Family::Generic => Some(generic_dataset_from(item)),
    }
}

fn plateau_dataset_from(item: &CatalogItem) -> Dataset {
    let id = dataset_id(item);
    let mut d = dataset_base(item, id.clone(), DatasetTypeCategory::Plateau);

    if !item.name.contains(item.type_name.as_str()) {
        d.name = format!("{} {}", item.type_name, item.name);
    }
    d.subname = subname(item);
    d.subcode = subcode(item);
    d.plateau_spec_minor_id = non_empty(effective_spec(item)).map(|s| plateau_spec_id(&s));
    d.river = river_from(item);
    d.items = item
        .main_or_config_items()
        .iter()
        .map(|c| plateau_dataset_item_from(c, &id))
        .collect();
    d
}

fn plateau_dataset_item_from(c: &ConfigItem, parent_id: &str) -> DatasetItem {
    let lod = c
        .name
        .strip_prefix("LOD")
        .map(|rest| rest.split('（').next().unwrap_or_default())
        .and_then(|l| l.parse().ok());

    let format = DatasetFormat::from_legacy(&c.format);
    let texture = if c.name.contains("（テクスチャなし）") {
        Some(Texture::None)
    } else if format == Some(DatasetFormat::Cesium3dtiles) {
        Some(Texture::Texture)
    } else {
        None
    };

    let (flooding_scale, local) = if c.name.contains("想定最大規模") || c.name.contains("L2") {
        (Some(FloodingScale::ExpectedMaximum), "l2")
    } else if c.name.contains("計画規模") || c.name.contains("L1") {
        (Some(FloodingScale::Planned), "l1")
    } else {
        (None, c.name.as_str())
    };

    DatasetItem {
        id: item_id(parent_id, &format!("_{}", local)),
        name: c.name.clone(),
        url: c.url.clone(),
        format,
        layers: c.layers.clone(),
        parent_id: parent_id.to_string(),
        lod,
        texture,
        flooding_scale,
        original_url: None,
        original_format: None,
    }
}

fn related_dataset_from(item: &CatalogItem) -> Dataset {
    let id = dataset_id(item);
    let mut d = dataset_base(item, id.clone(), DatasetTypeCategory::Related);

    // 2021 data sorts behind the generations merged on top of it
    if d.year == 2021 {
        d.year = 2020;
    }

    d.items = item
        .main_or_config_items()
        .iter()
        .map(|c| {
            let suffix = if item.type_en == "landmark" {
                LANDMARK_TYPES
                    .iter()
                    .find(|(name, _)| *name == c.name)
                    .map(|(_, code)| format!("_{}", code))
                    .unwrap_or_default()
            } else {
                String::new()
            };

            DatasetItem {
                id: item_id(&id, &suffix),
                name: c.name.clone(),
                url: c.url.clone(),
                format: DatasetFormat::from_legacy(&c.format),
                layers: c.layers.clone(),
                parent_id: id.clone(),
                lod: None,
                texture: None,
                flooding_scale: None,
                original_url: non_empty(&c.original_url),
                original_format: if c.original_url.is_empty() {
                    None
                } else {
                    DatasetFormat::from_legacy(&c.original_format)
                },
            }
        })
        .collect();
    d
}

fn generic_dataset_from(item: &CatalogItem) -> Dataset {
    let id = dataset_id(item);
    let mut d = dataset_base(item, id.clone(), DatasetTypeCategory::Generic);
    d.items = item
        .main_or_config_items()
        .iter()
        .enumerate()
        .map(|(i, c)| DatasetItem {
            id: NodeKind::DatasetItem.id(&format!("{}:{}", item.id, i)),
            name: c.name.clone(),
            url: c.url.clone(),
            format: DatasetFormat::from_legacy(&c.format),
            layers: c.layers.clone(),
            parent_id: id.clone(),
            lod: None,
            texture: None,
            flooding_scale: None,
            original_url: None,
            original_format: None,
        })
        .collect();
    d
}

/// Dataset item ID derived from its parent dataset ID.
fn item_id(parent_id: &str, suffix: &str) -> String {
    let local = NodeKind::parse(parent_id)
        .map(|(_, local)| local)
        .unwrap_or(parent_id);
    NodeKind::DatasetItem.id(&format!("{}{}", local, suffix))
}

// ============================================================================
// CityGML
// ============================================================================

/// CityGML package of a plateau item's city, when it is published.
///
/// Wards of the Tokyo special wards other than the 23-ward pseudo city do
/// not carry their own package.
pub fn citygml_from(item: &CatalogItem) -> Option<CityGmlDataset> {
    if item.family != Family::Plateau
        || item.spec.is_empty()
        || !item.sdk_public
        || item.citygml_url.is_empty()
        || item.max_lod_url.is_empty()
        || item.citygml_feature_types.is_empty()
        || item.city_code.is_empty()
        || item.pref_code.is_empty()
        || (is_tokyo_23ku(item) && item.city_code != TOKYO_23KU_CODE)
    {
        return None;
    }

    Some(CityGmlDataset {
        id: NodeKind::CityGml.id(&item.city_code),
        year: item.year,
        registration_year: REGISTRATION_YEAR,
        prefecture_code: item.pref_code.clone(),
        city_code: item.city_code.clone(),
        city_name: item.city.clone(),
        plateau_spec_minor_id: plateau_spec_id(&item.spec),
        url: item.citygml_url.clone(),
        feature_types: item.citygml_feature_types.clone(),
        admin: CityGmlAdmin {
            maxlod: vec![item.max_lod_url.clone()],
            citygml_url: vec![item.citygml_url.clone()],
            citygml_asset_id: item.citygml_asset_id.clone(),
        },
    })
}
