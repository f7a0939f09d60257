//! Per-city dictionary of display names.
//!
//! The dictionary is a JSON object keyed by category (`admin`, `fld`, `htd`,
//! `tnm`, `ifld`, `urf`, `gen`) whose values are lists of entries. It is read
//! once per source item and never modified.

use std::collections::HashMap;
use std::fmt;

use catalog_common::clean_bom;
use serde::Deserialize;
use tracing::debug;

use crate::asset_name::AssetName;

const ADMIN_KEY: &str = "admin";

/// Dictionary values may be written either as strings or as numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl fmt::Display for StringOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringOrNumber::String(s) => f.write_str(s),
            StringOrNumber::Number(n) => write!(f, "{}", n),
        }
    }
}

impl StringOrNumber {
    fn matches(&self, value: &str) -> bool {
        match self {
            StringOrNumber::String(s) => s == value,
            StringOrNumber::Number(n) => n.to_string() == value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DicEntry {
    pub name: Option<StringOrNumber>,
    pub code: Option<StringOrNumber>,
    pub description: String,
    /// River administrator (flood entries only).
    pub admin: String,
    /// Flood scale label (flood entries only).
    pub scale: String,
    pub order: Option<i32>,
}

impl DicEntry {
    fn matches(&self, key: &str) -> bool {
        self.name.as_ref().is_some_and(|n| n.matches(key))
            || self.code.as_ref().is_some_and(|c| c.matches(key))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Dic(HashMap<String, Vec<DicEntry>>);

impl Dic {
    /// Parse a dictionary, tolerating a byte order mark. Malformed input
    /// yields an empty dictionary.
    pub fn parse(text: &str) -> Self {
        let text = clean_bom(text).trim();
        if text.is_empty() {
            return Dic::default();
        }

        match serde_json::from_str(text) {
            Ok(dic) => dic,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed dictionary");
                Dic::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries of one category.
    pub fn entries(&self, key: &str) -> &[DicEntry] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Find an entry of a category by name or code.
    pub fn find(&self, key: &str, name: &str) -> Option<&DicEntry> {
        if name.is_empty() {
            return None;
        }
        self.entries(key).iter().find(|e| e.matches(name))
    }

    /// The entry describing the dataset an asset belongs to.
    pub fn find_by_asset(&self, an: &AssetName) -> Option<&DicEntry> {
        match an.feature.as_str() {
            "fld" => self.find_flood(&an.fld_name_and_scale(), &an.fld_admin),
            "htd" | "tnm" | "ifld" => self.find(&an.feature, &an.fld_name),
            "urf" => self.find("urf", &an.urf_feature_type),
            "gen" => self.find("gen", &an.gen_name),
            _ => None,
        }
    }

    /// Flood entries share river names across administrators, so the
    /// admin has to agree as well. An unknown admin on either side matches.
    fn find_flood(&self, name: &str, admin: &str) -> Option<&DicEntry> {
        if name.is_empty() {
            return None;
        }
        let admin = river_admin(admin);
        self.entries("fld").iter().find(|e| {
            e.matches(name)
                && match (admin, river_admin(&e.admin)) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                }
        })
    }

    /// Display name of a ward from the `admin` category.
    ///
    /// Admin descriptions read `<city> <ward>`; only the ward part is kept.
    pub fn ward_name(&self, ward_code: &str) -> Option<String> {
        let entry = self
            .entries(ADMIN_KEY)
            .iter()
            .find(|e| e.code.as_ref().is_some_and(|c| c.matches(ward_code)))
            .filter(|_| !ward_code.is_empty())?;

        let name = match entry.description.split_once(' ') {
            Some((_, ward)) if !ward.is_empty() => ward.to_string(),
            _ => entry.description.clone(),
        };
        Some(name).filter(|n| !n.is_empty())
    }
}

/// Canonical river administrator label for asset codes and dictionary
/// values.
fn river_admin(admin: &str) -> Option<&'static str> {
    match admin {
        "natl" | "国" => Some("国"),
        "pref" | "都道府県" => Some("都道府県"),
        _ => None,
    }
}
