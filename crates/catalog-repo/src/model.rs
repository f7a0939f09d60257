//! Snapshot node types.
//!
//! Every node carries a global ID of the form `<kind prefix>_<local id>`:
//! `p_13` for a prefecture, `c_13201` for a city, `d_13201_bldg` for a
//! dataset and so on. [`NodeKind::parse`] recovers the kind from an ID.

use serde::{Deserialize, Serialize};

/// Year every converted dataset is registered under.
pub const REGISTRATION_YEAR: i32 = 2022;

/// Kinds of addressable nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Prefecture,
    City,
    Ward,
    DatasetType,
    Dataset,
    DatasetItem,
    CityGml,
    PlateauSpec,
}

impl NodeKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            NodeKind::Prefecture => "p",
            NodeKind::City => "c",
            NodeKind::Ward => "w",
            NodeKind::DatasetType => "dt",
            NodeKind::Dataset => "d",
            NodeKind::DatasetItem => "di",
            NodeKind::CityGml => "cg",
            NodeKind::PlateauSpec => "ps",
        }
    }

    /// Build a global ID from a local one.
    pub fn id(&self, local: &str) -> String {
        format!("{}_{}", self.prefix(), local)
    }

    /// Split a global ID into its kind and local part.
    pub fn parse(id: &str) -> Option<(NodeKind, &str)> {
        let (prefix, local) = id.split_once('_')?;
        let kind = match prefix {
            "p" => NodeKind::Prefecture,
            "c" => NodeKind::City,
            "w" => NodeKind::Ward,
            "dt" => NodeKind::DatasetType,
            "d" => NodeKind::Dataset,
            "di" => NodeKind::DatasetItem,
            "cg" => NodeKind::CityGml,
            "ps" => NodeKind::PlateauSpec,
            _ => return None,
        };
        if local.is_empty() {
            return None;
        }
        Some((kind, local))
    }
}

// ============================================================================
// Areas
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Prefecture,
    City,
    Ward,
}

impl AreaType {
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prefecture" => Some(AreaType::Prefecture),
            "city" => Some(AreaType::City),
            "ward" => Some(AreaType::Ward),
            _ => None,
        }
    }
}

/// A prefecture, city or ward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    pub id: String,
    #[serde(rename = "type")]
    pub area_type: AreaType,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefecture_code: Option<String>,
    /// Parent city of a ward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_code: Option<String>,
    /// CityGML dataset of a city.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citygml_id: Option<String>,
}

impl Area {
    pub fn parent_code(&self) -> Option<&str> {
        match self.area_type {
            AreaType::Prefecture => None,
            AreaType::City => self.prefecture_code.as_deref(),
            AreaType::Ward => self.city_code.as_deref(),
        }
    }
}

// ============================================================================
// Dataset types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetTypeCategory {
    Plateau,
    Related,
    Generic,
}

impl DatasetTypeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetTypeCategory::Plateau => "plateau",
            DatasetTypeCategory::Related => "related",
            DatasetTypeCategory::Generic => "generic",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plateau" => Some(DatasetTypeCategory::Plateau),
            "related" => Some(DatasetTypeCategory::Related),
            "generic" => Some(DatasetTypeCategory::Generic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetType {
    pub id: String,
    pub code: String,
    pub name: String,
    pub category: DatasetTypeCategory,
    /// Edition year; plateau types only.
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "is_false")]
    pub flood: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plateau_spec_id: Option<String>,
}

// ============================================================================
// Datasets
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFormat {
    Geojson,
    Cesium3dtiles,
    Czml,
    GtfsRealtime,
    Gltf,
    Mvt,
    Tiles,
    Tms,
    Wms,
    Csv,
}

impl DatasetFormat {
    /// Map a legacy format label. Unknown labels have no format.
    pub fn from_legacy(format: &str) -> Option<Self> {
        match format.to_lowercase().as_str() {
            "geojson" => Some(DatasetFormat::Geojson),
            "3dtiles" | "3d tiles" => Some(DatasetFormat::Cesium3dtiles),
            "czml" => Some(DatasetFormat::Czml),
            "gtfs" | "gtfs-realtime" => Some(DatasetFormat::GtfsRealtime),
            "gltf" => Some(DatasetFormat::Gltf),
            "mvt" => Some(DatasetFormat::Mvt),
            "tiles" => Some(DatasetFormat::Tiles),
            "tms" => Some(DatasetFormat::Tms),
            "wms" => Some(DatasetFormat::Wms),
            "csv" => Some(DatasetFormat::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Texture {
    None,
    Texture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloodingScale {
    /// L1
    Planned,
    /// L2
    ExpectedMaximum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiverAdmin {
    National,
    Prefecture,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct River {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<RiverAdmin>,
}

/// One downloadable file of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetItem {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<DatasetFormat>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<String>,
    pub parent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lod: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<Texture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flooding_scale: Option<FloodingScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_format: Option<DatasetFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcode: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_data_url: Option<String>,
    pub category: DatasetTypeCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefecture_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ward_code: Option<String>,
    pub year: i32,
    pub registration_year: i32,
    pub type_id: String,
    pub type_code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plateau_spec_minor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub river: Option<River>,
    pub items: Vec<DatasetItem>,
}

impl Dataset {
    /// Ward, city or prefecture code, whichever is most detailed.
    pub fn area_code(&self) -> Option<&str> {
        self.ward_code
            .as_deref()
            .or(self.city_code.as_deref())
            .or(self.prefecture_code.as_deref())
    }

    /// Every area code the dataset belongs to.
    pub fn area_codes(&self) -> impl Iterator<Item = &str> {
        [&self.prefecture_code, &self.city_code, &self.ward_code]
            .into_iter()
            .filter_map(|c| c.as_deref())
    }

    /// Identity shared by plateau datasets of the same area and type across
    /// data generations.
    pub fn vague_id(&self) -> Option<String> {
        if self.category != DatasetTypeCategory::Plateau {
            return None;
        }
        Some(NodeKind::Dataset.id(&format!(
            "{}_{}",
            self.area_code().unwrap_or_default(),
            self.type_code
        )))
    }

    pub fn item(&self, id: &str) -> Option<&DatasetItem> {
        self.items.iter().find(|i| i.id == id)
    }
}

// ============================================================================
// CityGML and specifications
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityGmlAdmin {
    pub maxlod: Vec<String>,
    pub citygml_url: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub citygml_asset_id: String,
}

/// The CityGML package of one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityGmlDataset {
    pub id: String,
    pub year: i32,
    pub registration_year: i32,
    pub prefecture_code: String,
    pub city_code: String,
    pub city_name: String,
    pub plateau_spec_minor_id: String,
    pub url: String,
    pub feature_types: Vec<String>,
    pub admin: CityGmlAdmin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateauSpecMinor {
    pub id: String,
    pub version: String,
    pub name: String,
    pub major_version: i32,
    pub year: i32,
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateauSpec {
    pub id: String,
    pub major_version: i32,
    pub year: i32,
    pub minor_versions: Vec<PlateauSpecMinor>,
}

// ============================================================================
// Node
// ============================================================================

/// Any node addressable by its global ID.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Area(Area),
    DatasetType(DatasetType),
    Dataset(Dataset),
    DatasetItem(DatasetItem),
    CityGml(CityGmlDataset),
    PlateauSpec(PlateauSpec),
    PlateauSpecMinor(PlateauSpecMinor),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Area(n) => &n.id,
            Node::DatasetType(n) => &n.id,
            Node::Dataset(n) => &n.id,
            Node::DatasetItem(n) => &n.id,
            Node::CityGml(n) => &n.id,
            Node::PlateauSpec(n) => &n.id,
            Node::PlateauSpecMinor(n) => &n.id,
        }
    }
}

/// Nodes that belong to a data generation.
///
/// The merger groups nodes by [`Versioned::merge_key`] (the ID unless a
/// node overrides it) and keeps the latest year of each group.
pub trait Versioned {
    fn node_id(&self) -> &str;

    fn year(&self) -> i32 {
        0
    }

    fn merge_key(&self) -> String {
        self.node_id().to_string()
    }
}

impl Versioned for Area {
    fn node_id(&self) -> &str {
        &self.id
    }
}

impl Versioned for DatasetType {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn year(&self) -> i32 {
        self.year
    }
}

impl Versioned for Dataset {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn merge_key(&self) -> String {
        self.vague_id().unwrap_or_else(|| self.id.clone())
    }
}

impl Versioned for DatasetItem {
    fn node_id(&self) -> &str {
        &self.id
    }
}

impl Versioned for CityGmlDataset {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn year(&self) -> i32 {
        self.year
    }
}

impl Versioned for PlateauSpec {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn year(&self) -> i32 {
        self.year
    }
}

impl Versioned for Node {
    fn node_id(&self) -> &str {
        self.id()
    }

    fn year(&self) -> i32 {
        match self {
            Node::Area(n) => n.year(),
            Node::DatasetType(n) => n.year(),
            Node::Dataset(n) => n.year(),
            Node::DatasetItem(n) => n.year(),
            Node::CityGml(n) => n.year(),
            Node::PlateauSpec(n) => n.year(),
            Node::PlateauSpecMinor(n) => n.year,
        }
    }
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_round_trip() {
        let id = NodeKind::CityGml.id("13100");
        assert_eq!(id, "cg_13100");
        assert_eq!(NodeKind::parse(&id), Some((NodeKind::CityGml, "13100")));

        let id = NodeKind::Dataset.id("13101_bldg");
        assert_eq!(NodeKind::parse(&id), Some((NodeKind::Dataset, "13101_bldg")));
    }

    #[test]
    fn test_parse_rejects_unknown_ids() {
        assert_eq!(NodeKind::parse("x_1"), None);
        assert_eq!(NodeKind::parse("d_"), None);
        assert_eq!(NodeKind::parse("nounderscore"), None);
    }

    #[test]
    fn test_dataset_format_from_legacy() {
        assert_eq!(DatasetFormat::from_legacy("3D Tiles"), Some(DatasetFormat::Cesium3dtiles));
        assert_eq!(DatasetFormat::from_legacy("GTFS"), Some(DatasetFormat::GtfsRealtime));
        assert_eq!(DatasetFormat::from_legacy("GeoJSON"), Some(DatasetFormat::Geojson));
        assert_eq!(DatasetFormat::from_legacy("zip"), None);
    }

    #[test]
    fn test_area_parent_code() {
        let ward = Area {
            id: NodeKind::Ward.id("13101"),
            area_type: AreaType::Ward,
            code: "13101".to_string(),
            name: "千代田区".to_string(),
            prefecture_code: Some("13".to_string()),
            city_code: Some("13100".to_string()),
            citygml_id: None,
        };
        assert_eq!(ward.parent_code(), Some("13100"));
    }
}
