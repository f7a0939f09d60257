//! Feature types and their build policies.
//!
//! Each feature type maps to one immutable [`BuilderOption`] consumed by the
//! generic [`CatalogItemBuilder`](crate::builder::CatalogItemBuilder). Adding
//! a category means adding a variant and a table entry; the builder itself
//! never looks at the feature type.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::asset_name::AssetName;
use crate::builder::ItemContext;
use crate::description::{ItemOverride, Override};

// ============================================================================
// Feature types
// ============================================================================

/// Dataset categories of the plateau model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureType {
    Bldg,
    Tran,
    Frn,
    Veg,
    Luse,
    Lsld,
    Urf,
    Fld,
    Tnm,
    Htd,
    Ifld,
    Brid,
    Rail,
    Gen,
    Extra,
}

impl FeatureType {
    /// Every feature type in catalog build order.
    pub const ALL: [FeatureType; 15] = [
        FeatureType::Bldg,
        FeatureType::Tran,
        FeatureType::Frn,
        FeatureType::Veg,
        FeatureType::Luse,
        FeatureType::Lsld,
        FeatureType::Urf,
        FeatureType::Fld,
        FeatureType::Tnm,
        FeatureType::Htd,
        FeatureType::Ifld,
        FeatureType::Brid,
        FeatureType::Rail,
        FeatureType::Gen,
        FeatureType::Extra,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            FeatureType::Bldg => "bldg",
            FeatureType::Tran => "tran",
            FeatureType::Frn => "frn",
            FeatureType::Veg => "veg",
            FeatureType::Luse => "luse",
            FeatureType::Lsld => "lsld",
            FeatureType::Urf => "urf",
            FeatureType::Fld => "fld",
            FeatureType::Tnm => "tnm",
            FeatureType::Htd => "htd",
            FeatureType::Ifld => "ifld",
            FeatureType::Brid => "brid",
            FeatureType::Rail => "rail",
            FeatureType::Gen => "gen",
            FeatureType::Extra => "extra",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ft| ft.code() == code)
    }

    /// Whether the feature type is part of the city's CityGML package.
    pub fn is_citygml(&self) -> bool {
        matches!(
            self,
            FeatureType::Bldg
                | FeatureType::Tran
                | FeatureType::Frn
                | FeatureType::Veg
                | FeatureType::Luse
                | FeatureType::Lsld
                | FeatureType::Urf
                | FeatureType::Fld
                | FeatureType::Tnm
                | FeatureType::Htd
                | FeatureType::Ifld
        )
    }

    /// Whether the feature type describes a flood hazard model.
    pub fn is_flood(&self) -> bool {
        matches!(
            self,
            FeatureType::Fld | FeatureType::Tnm | FeatureType::Htd | FeatureType::Ifld
        )
    }

    /// The build policy of this feature type.
    pub fn option(&self) -> &'static BuilderOption {
        &FEATURE_OPTIONS[self]
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// Build policy
// ============================================================================

pub type GroupByFn = fn(&AssetName, &[AssetName]) -> String;
pub type CompareFn = fn(&AssetName, &AssetName) -> Ordering;
pub type GroupOverrideFn = fn(&ItemContext<'_>) -> Override;
pub type ItemOverrideFn = fn(&ItemContext<'_>) -> ItemOverride;

/// Build policy of one feature type.
#[derive(Clone, Copy)]
pub struct BuilderOption {
    /// Display label, also the default item name.
    pub type_name: &'static str,
    pub type_en: &'static str,
    pub root_type: bool,
    pub layers: Option<&'static [&'static str]>,
    pub group: Option<GroupOverrideFn>,
    pub item: Option<ItemOverrideFn>,
    /// Descriptions are matched to assets by their header line.
    pub multiple_desc: bool,
    /// The first group carries the source item ID.
    pub item_id: bool,
    /// Every asset of a group is listed as a config entry.
    pub lod: bool,
    pub sort_by_lod: bool,
    pub use_max_lod_as_default: bool,
    pub group_by: Option<GroupByFn>,
    pub sort_group_by: Option<CompareFn>,
    pub sort_asset_by: Option<CompareFn>,
    pub omit_group_name_from_id: bool,
    pub search_index: bool,
}

impl BuilderOption {
    pub const fn new(type_name: &'static str, type_en: &'static str) -> Self {
        Self {
            type_name,
            type_en,
            root_type: false,
            layers: None,
            group: None,
            item: None,
            multiple_desc: false,
            item_id: false,
            lod: false,
            sort_by_lod: false,
            use_max_lod_as_default: false,
            group_by: None,
            sort_group_by: None,
            sort_asset_by: None,
            omit_group_name_from_id: false,
            search_index: false,
        }
    }

    pub fn layers(&self) -> Option<Vec<String>> {
        self.layers
            .map(|layers| layers.iter().map(|l| l.to_string()).collect())
    }
}

impl fmt::Debug for BuilderOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderOption")
            .field("type_name", &self.type_name)
            .field("type_en", &self.type_en)
            .field("lod", &self.lod)
            .field("multiple_desc", &self.multiple_desc)
            .field("grouped", &self.group_by.is_some())
            .finish()
    }
}

// ============================================================================
// Controlled vocabularies
// ============================================================================

/// Urban planning feature types in display order, with their labels.
pub const URF_FEATURE_TYPES: [(&str, &str); 30] = [
    ("UrbanPlanningArea", "都市計画区域"),
    ("QuasiUrbanPlanningArea", "準都市計画区域"),
    ("AreaClassification", "区域区分"),
    ("UseDistrict", "用途地域"),
    ("SpecialUseDistrict", "特別用途地区"),
    ("SpecialUseRestrictionDistrict", "特定用途制限地域"),
    ("ExceptionalFloorAreaRateDistrict", "特例容積率適用地区"),
    ("HighRiseResidentialAttractionDistrict", "高層住居誘導地区"),
    ("HeightControlDistrict", "高度地区"),
    ("HighLevelUseDistrict", "高度利用地区"),
    ("SpecifiedBlock", "特定街区"),
    ("SpecialUrbanRenaissanceDistrict", "都市再生特別地区"),
    ("HousingControlArea", "居住調整地域"),
    ("ResidentialEnvironmentImprovementDistrict", "居住環境向上用途誘導地区"),
    ("SpecifiedUseAttractionDistrict", "特定用途誘導地区"),
    ("FirePreventionDistrict", "防火地域又は準防火地域"),
    ("SpecifiedDisasterPreventionBlockImprovementZone", "特定防災街区整備地区"),
    ("LandscapeZone", "景観地区"),
    ("ScenicDistrict", "風致地区"),
    ("ParkingPlaceDevelopmentZone", "駐車場整備地区"),
    ("PortZone", "臨港地区"),
    ("SpecialZoneForPreservationOfHistoricalLandscape", "歴史的風土特別保存地区"),
    ("GreenSpaceConservationDistrict", "緑地保全地域"),
    ("SpecialGreenSpaceConservationDistrict", "特別緑地保全地区"),
    ("TreePlantingDistrict", "緑化地域"),
    ("DistributionBusinessZone", "流通業務地区"),
    ("ProductiveGreenZone", "生産緑地地区"),
    ("ConservationZoneForClustersOfTraditionalStructures", "伝統的建造物群保存地区"),
    ("AircraftNoiseControlZone", "航空機騒音障害防止地区"),
    ("Waterway", "水路"),
];

/// Position of an urban planning feature type in the vocabulary; unknown
/// types sort after every known one.
pub fn urf_feature_type_index(ft: &str) -> usize {
    URF_FEATURE_TYPES
        .iter()
        .position(|(code, _)| *code == ft)
        .unwrap_or(URF_FEATURE_TYPES.len())
}

pub fn urf_feature_type_name(ft: &str) -> Option<&'static str> {
    URF_FEATURE_TYPES
        .iter()
        .find(|(code, _)| *code == ft)
        .map(|(_, name)| *name)
}

pub fn normalize_urf_feature_type(ft: &str) -> &str {
    if ft == "WaterWay" {
        "Waterway"
    } else {
        ft
    }
}

/// Road layers per LOD.
fn tran_layers_for_lod(lod: &str) -> Option<Vec<String>> {
    let layers: &[&str] = match lod {
        "0" | "1" => &["Road"],
        "2" => &["TrafficArea", "AuxiliaryTrafficArea"],
        _ => return None,
    };
    Some(layers.iter().map(|l| l.to_string()).collect())
}

// ============================================================================
// Policy table
// ============================================================================

static FEATURE_OPTIONS: Lazy<HashMap<FeatureType, BuilderOption>> = Lazy::new(|| {
    FeatureType::ALL
        .into_iter()
        .map(|ft| (ft, builder_option(ft)))
        .collect()
});

fn builder_option(ft: FeatureType) -> BuilderOption {
    match ft {
        FeatureType::Bldg => BuilderOption {
            lod: true,
            sort_by_lod: true,
            use_max_lod_as_default: true,
            item_id: true,
            group_by: Some(|an, _| an.ward_en.clone()),
            sort_group_by: Some(|a, b| a.ward_code_int().cmp(&b.ward_code_int())),
            omit_group_name_from_id: true,
            search_index: true,
            ..BuilderOption::new("建築物モデル", "bldg")
        },
        FeatureType::Tran => BuilderOption {
            lod: true,
            sort_by_lod: true,
            use_max_lod_as_default: true,
            group: Some(|ctx| Override {
                layers: tran_layers_for_lod(&ctx.asset_name.lod),
                ..Default::default()
            }),
            item: Some(|ctx| ItemOverride {
                name: None,
                layers: tran_layers_for_lod(&ctx.asset_name.lod),
            }),
            ..BuilderOption::new("道路モデル", "tran")
        },
        FeatureType::Frn => BuilderOption {
            lod: true,
            sort_by_lod: true,
            ..BuilderOption::new("都市設備モデル", "frn")
        },
        FeatureType::Veg => BuilderOption {
            lod: true,
            sort_by_lod: true,
            ..BuilderOption::new("植生モデル", "veg")
        },
        FeatureType::Luse => BuilderOption {
            layers: Some(&["luse"]),
            ..BuilderOption::new("土地利用モデル", "luse")
        },
        FeatureType::Lsld => BuilderOption {
            layers: Some(&["lsld"]),
            ..BuilderOption::new("土砂災害警戒区域モデル", "lsld")
        },
        FeatureType::Urf => BuilderOption {
            root_type: true,
            multiple_desc: true,
            group: Some(urf_group_override),
            group_by: Some(|an, _| normalize_urf_feature_type(&an.urf_feature_type).to_string()),
            sort_group_by: Some(|a, b| {
                let a = urf_feature_type_index(normalize_urf_feature_type(&a.urf_feature_type));
                let b = urf_feature_type_index(normalize_urf_feature_type(&b.urf_feature_type));
                a.cmp(&b)
            }),
            ..BuilderOption::new("都市計画決定情報モデル", "urf")
        },
        FeatureType::Fld => BuilderOption {
            root_type: true,
            multiple_desc: true,
            group: Some(|ctx| {
                let subname = match ctx.dic_entry {
                    Some(e) => format!("{}（{}管理区間）", e.description, e.admin),
                    None => ctx.asset_name.fld_admin_and_name(),
                };
                Override {
                    subname: Some(subname).filter(|s| !s.is_empty()),
                    ..Default::default()
                }
            }),
            item: Some(|ctx| {
                let name = match ctx.dic_entry {
                    Some(e) => e.scale.clone(),
                    None => ctx.asset_name.fld_scale.clone(),
                };
                ItemOverride {
                    name: Some(name).filter(|n| !n.is_empty()),
                    layers: None,
                }
            }),
            group_by: Some(fld_group_key),
            sort_group_by: Some(|a, b| a.fld_admin_and_name().cmp(&b.fld_admin_and_name())),
            sort_asset_by: Some(|a, b| a.fld_scale.cmp(&b.fld_scale)),
            ..BuilderOption::new("洪水浸水想定区域モデル", "fld")
        },
        FeatureType::Tnm => flood_name_option("津波浸水想定区域モデル", "tnm"),
        FeatureType::Htd => flood_name_option("高潮浸水想定区域モデル", "htd"),
        FeatureType::Ifld => flood_name_option("内水浸水想定区域モデル", "ifld"),
        FeatureType::Brid => BuilderOption {
            layers: Some(&["brid"]),
            lod: true,
            sort_by_lod: true,
            ..BuilderOption::new("橋梁モデル", "brid")
        },
        FeatureType::Rail => BuilderOption {
            layers: Some(&["rail"]),
            lod: true,
            sort_by_lod: true,
            ..BuilderOption::new("鉄道モデル", "rail")
        },
        FeatureType::Gen => BuilderOption {
            root_type: true,
            multiple_desc: true,
            lod: true,
            sort_by_lod: true,
            group: Some(|ctx| Override {
                name: Some(ctx.group_name.to_string()).filter(|n| !n.is_empty()),
                layers: Some(vec![ctx.group_name.to_string()]),
                ..Default::default()
            }),
            item: Some(|ctx| {
                let name = ctx
                    .description
                    .overrides
                    .name
                    .clone()
                    .unwrap_or_else(|| ctx.group_name.to_string());
                ItemOverride {
                    name: Some(name).filter(|n| !n.is_empty()),
                    layers: Some(vec![ctx.group_name.to_string()]),
                }
            }),
            group_by: Some(|an, _| an.gen_name.clone()),
            ..BuilderOption::new("汎用都市オブジェクトモデル", "gen")
        },
        // Extra datasets keep their upload order.
        FeatureType::Extra => BuilderOption {
            multiple_desc: true,
            lod: true,
            sort_by_lod: false,
            group_by: Some(|an, _| an.feature_ex.join("-")),
            ..BuilderOption::new("その他のデータセット", "ex")
        },
    }
}

fn flood_name_option(type_name: &'static str, type_en: &'static str) -> BuilderOption {
    BuilderOption {
        root_type: true,
        multiple_desc: true,
        group: Some(|ctx| {
            let subname = match ctx.dic_entry {
                Some(e) => e.description.clone(),
                None => ctx.asset_name.fld_name.clone(),
            };
            Override {
                subname: Some(subname).filter(|s| !s.is_empty()),
                ..Default::default()
            }
        }),
        group_by: Some(|an, _| an.fld_name.clone()),
        ..BuilderOption::new(type_name, type_en)
    }
}

fn urf_group_override(ctx: &ItemContext<'_>) -> Override {
    let ft = normalize_urf_feature_type(&ctx.asset_name.urf_feature_type);
    let (name, type2) = match urf_feature_type_name(ft) {
        Some(urf_name) => (format!("{}モデル", urf_name), urf_name.to_string()),
        None => (ft.to_string(), ft.to_string()),
    };

    Override {
        name: Some(name).filter(|n| !n.is_empty()),
        type2: Some(type2).filter(|t| !t.is_empty()),
        type2_en: Some(ft.to_string()).filter(|t| !t.is_empty()),
        layers: Some(vec![ctx.group_name.to_string()]),
        ..Default::default()
    }
}

/// Flood groups are keyed by admin and river name plus the smallest scale
/// among the assets of the same river. A scale-less asset makes the scale
/// part empty.
fn fld_group_key(an: &AssetName, all: &[AssetName]) -> String {
    let scale = all
        .iter()
        .filter(|a| a.fld_name == an.fld_name && a.fld_admin == an.fld_admin)
        .map(|a| a.fld_scale.as_str())
        .min()
        .unwrap_or("l1");
    format!("{}_{}", an.fld_admin_and_name(), scale)
}
