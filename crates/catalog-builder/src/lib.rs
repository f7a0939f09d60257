//! Catalog item synthesis: asset name decoding, override tags, the per-feature
//! builder policies and the content records they are applied to.

pub mod asset_name;
pub mod builder;
pub mod description;
pub mod dic;
pub mod options;
pub mod plateau;
pub mod related;
pub mod response;
pub mod structured;

use catalog_common::CatalogItem;

pub use asset_name::AssetName;
pub use builder::{CatalogItemBuilder, CityContext, ItemContext, NO_TEXTURE_LABEL};
pub use description::{parse_tags, Description, ItemOverride, Override, OverrideTag};
pub use dic::{Dic, DicEntry};
pub use options::{BuilderOption, FeatureType};
pub use plateau::{PlateauItem, PublicAsset};
pub use related::{dataset_type_en, DatasetItem, UsecaseItem};
pub use response::ResponseAll;
pub use structured::{AssetRef, CityItem, FeatureItem, FeatureItemDatum, StructuredItems};

/// A content record that expands into catalog items.
pub trait CatalogSource {
    fn city_name(&self) -> &str;
    fn catalog_items(&self) -> Vec<CatalogItem>;
}
