//! Override tags embedded in free-text descriptions.
//!
//! A description may start with a block of `@key: value` lines that correct
//! the metadata synthesized for a catalog item:
//!
//! ```text
//! @name: 建築物モデル（テクスチャ付き）
//! @layers: Building, BuildingPart
//!
//! 本文...
//! ```
//!
//! Blank lines inside the block are tolerated; the first line that is not a
//! tag ends it. Malformed tags are ignored.

use catalog_common::split_comma_list;

use crate::asset_name::AssetName;

/// Sparse metadata correction. Unset fields defer to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Override {
    pub name: Option<String>,
    pub subname: Option<String>,
    pub type_name: Option<String>,
    pub type_en: Option<String>,
    pub type2: Option<String>,
    pub type2_en: Option<String>,
    pub area: Option<String>,
    pub item_name: Option<String>,
    pub group: Option<String>,
    pub layers: Option<Vec<String>>,
    pub root: Option<bool>,
    pub order: Option<i32>,
    pub dataset_order: Option<i32>,
}

/// Override of one config entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemOverride {
    pub name: Option<String>,
    pub layers: Option<Vec<String>>,
}

/// One parsed `@key: value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideTag {
    Name(String),
    Subname(String),
    Type(String),
    TypeEn(String),
    Type2(String),
    Type2En(String),
    Area(String),
    ItemName(String),
    Group(String),
    Layers(Vec<String>),
    Root(bool),
    Order(i32),
    DatasetOrder(i32),
}

impl OverrideTag {
    /// Parse a tag from its key and raw value. Unknown keys and values that
    /// do not fit the field's type yield `None`.
    pub fn parse(key: &str, value: &str) -> Option<Self> {
        let key = key.trim().to_lowercase().replace('-', "_");
        let value = value.trim();
        let text = || Some(value.to_string()).filter(|v| !v.is_empty());

        let tag = match key.as_str() {
            "name" => OverrideTag::Name(text()?),
            "subname" | "sub_name" => OverrideTag::Subname(text()?),
            "type" => OverrideTag::Type(text()?),
            "type_en" => OverrideTag::TypeEn(text()?),
            "type2" => OverrideTag::Type2(text()?),
            "type2_en" => OverrideTag::Type2En(text()?),
            "area" => OverrideTag::Area(text()?),
            "item_name" => OverrideTag::ItemName(text()?),
            "group" => OverrideTag::Group(text()?),
            "layer" | "layers" => OverrideTag::Layers(split_comma_list(value)),
            "root" => OverrideTag::Root(value.parse().ok()?),
            "order" => OverrideTag::Order(value.parse().ok()?),
            "dataset_order" => OverrideTag::DatasetOrder(value.parse().ok()?),
            _ => return None,
        };
        Some(tag)
    }

    /// Parse a whole `@key: value` line.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (key, value) = line.trim().strip_prefix('@')?.split_once(':')?;
        Self::parse(key, value)
    }
}

impl Override {
    pub fn apply(&mut self, tag: OverrideTag) {
        match tag {
            OverrideTag::Name(v) => self.name = Some(v),
            OverrideTag::Subname(v) => self.subname = Some(v),
            OverrideTag::Type(v) => self.type_name = Some(v),
            OverrideTag::TypeEn(v) => self.type_en = Some(v),
            OverrideTag::Type2(v) => self.type2 = Some(v),
            OverrideTag::Type2En(v) => self.type2_en = Some(v),
            OverrideTag::Area(v) => self.area = Some(v),
            OverrideTag::ItemName(v) => self.item_name = Some(v),
            OverrideTag::Group(v) => self.group = Some(v),
            OverrideTag::Layers(v) => self.layers = Some(v),
            OverrideTag::Root(v) => self.root = Some(v),
            OverrideTag::Order(v) => self.order = Some(v),
            OverrideTag::DatasetOrder(v) => self.dataset_order = Some(v),
        }
    }

    pub fn from_tags(tags: impl IntoIterator<Item = OverrideTag>) -> Self {
        let mut o = Override::default();
        for tag in tags {
            o.apply(tag);
        }
        o
    }

    /// Left-biased merge: every field set in `self` wins over `other`.
    pub fn merge(self, other: Override) -> Override {
        Override {
            name: self.name.or(other.name),
            subname: self.subname.or(other.subname),
            type_name: self.type_name.or(other.type_name),
            type_en: self.type_en.or(other.type_en),
            type2: self.type2.or(other.type2),
            type2_en: self.type2_en.or(other.type2_en),
            area: self.area.or(other.area),
            item_name: self.item_name.or(other.item_name),
            group: self.group.or(other.group),
            layers: self.layers.or(other.layers),
            root: self.root.or(other.root),
            order: self.order.or(other.order),
            dataset_order: self.dataset_order.or(other.dataset_order),
        }
    }

    /// The part of this override that applies to config entries.
    pub fn item(&self) -> ItemOverride {
        ItemOverride {
            name: self.item_name.clone(),
            layers: self.layers.clone(),
        }
    }
}

impl ItemOverride {
    /// Left-biased merge: every field set in `self` wins over `other`.
    pub fn merge(self, other: ItemOverride) -> ItemOverride {
        ItemOverride {
            name: self.name.or(other.name),
            layers: self.layers.or(other.layers),
        }
    }

    pub fn layers_if_supported(&self, format: &str) -> Vec<String> {
        layers_if_supported(self.layers.as_deref(), format)
    }
}

pub(crate) fn layers_if_supported(layers: Option<&[String]>, format: &str) -> Vec<String> {
    match layers {
        Some(layers) if catalog_common::is_layer_supported(format) => layers.to_vec(),
        _ => Vec::new(),
    }
}

/// Split a description into its leading tags and the remaining text.
pub fn parse_tags(text: &str) -> (Vec<OverrideTag>, String) {
    let mut tags = Vec::new();
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            offset += line.len();
            continue;
        }
        if !(trimmed.starts_with('@') && trimmed.contains(':')) {
            break;
        }
        if let Some(tag) = OverrideTag::parse_line(trimmed) {
            tags.push(tag);
        }
        offset += line.len();
    }

    (tags, text[offset..].trim().to_string())
}

/// A description with its override tags extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub desc: String,
    pub overrides: Override,
}

impl Description {
    pub fn parse(text: &str) -> Self {
        let (tags, desc) = parse_tags(text);
        Description {
            desc,
            overrides: Override::from_tags(tags),
        }
    }

    /// Resolve the description that applies to one asset.
    ///
    /// With `single` the first description applies to every asset. Otherwise
    /// the first description whose header line names the asset applies, with
    /// the header removed before parsing.
    pub fn for_asset(path: &str, name: &AssetName, descriptions: &[String], single: bool) -> Self {
        if single {
            return descriptions
                .first()
                .map(|d| Description::parse(d))
                .unwrap_or_default();
        }

        descriptions
            .iter()
            .find_map(|d| {
                let (header, body) = d.trim_start().split_once('\n').unwrap_or((d.trim(), ""));
                header_names_asset(header.trim(), path, name).then(|| Description::parse(body))
            })
            .unwrap_or_default()
    }
}

fn header_names_asset(header: &str, path: &str, name: &AssetName) -> bool {
    if header.is_empty() {
        return false;
    }

    let header_name = AssetName::parse(header);
    let header_stem = header_name.stem();
    let stem = name.stem();
    if !stem.is_empty() && header_stem == stem {
        return true;
    }

    let raw = path.rsplit('/').next().unwrap_or(path);
    let raw_stem = raw.rsplit_once('.').map_or(raw, |(s, _)| s);
    let header_raw = header.rsplit_once('.').map_or(header, |(s, _)| s);
    !raw_stem.is_empty() && (header == raw || header_raw == raw_stem)
}
