//! Common types and utilities shared across the catalog crates and services.

pub mod area;
pub mod asset;
pub mod error;
pub mod item;

pub use area::{format_pref_code, normalize_pref, pref_code, NATIONWIDE};
pub use asset::{
    asset_root_path, asset_url_from_format, clean_bom, format_type_en, is_layer_supported,
    split_comma_list, year_int,
};
pub use error::{CatalogError, CatalogResult};
pub use item::{CatalogConfig, CatalogItem, ConfigItem, Family};
