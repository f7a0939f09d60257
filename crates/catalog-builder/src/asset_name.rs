//! Decoding of asset file names.
//!
//! Every uploaded asset follows the naming convention
//! `<citycode>_<cityEn>_<year>_<format>_<op>_<feature>[_nodem][_<extra>]<.ext>`
//! where `<extra>` optionally carries a ward, free text, an LOD marker and a
//! texture variant. Decoding never fails: a name that does not follow the
//! convention yields a record holding only its extension.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static RE_ASSET_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([0-9]+?)_(.+?)_(.+?)_(.+?)_((?:[0-9]+?_)*(?:op)?[0-9]*(?:_[0-9]+?)*)(_nodem)?(?:_(.+?)(?:_(.+))?)?$",
    )
    .unwrap()
});
static RE_LOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|.*_)lod([0-9]+?)").unwrap());
static RE_WARD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]+?)_([a-zA-Z].+)").unwrap());
static RE_FLD_SCALE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^l[0-9]+$").unwrap());

const LOW_TEXTURE_SUFFIX: &str = "_low_texture";
const NO_TEXTURE: &str = "no_texture";
const NO_TEXTURE_SUFFIX: &str = "_no_texture";

/// Structured identity of one asset decoded from its file name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AssetName {
    pub city_code: String,
    pub city_en: String,
    pub year: String,
    pub format: String,
    pub op: String,
    pub no_dem: bool,
    pub feature: String,
    /// Extension codes of `ex-a-b` features (`["a", "b"]`).
    pub feature_ex: Vec<String>,
    /// Free text left over after all known parts were taken.
    pub ex: String,
    /// File extension including the leading dot.
    pub ext: String,
    pub ward_code: String,
    pub ward_en: String,
    pub lod: String,
    pub low_texture: bool,
    pub no_texture: bool,
    pub fld_admin: String,
    pub fld_name: String,
    pub fld_scale: String,
    pub urf_feature_type: String,
    pub gen_name: String,
}

/// Split `path` into (stem of the last segment, extension).
fn split_base_and_ext(path: &str) -> (&str, &str) {
    let base = path.trim_end_matches('/');
    let base = base.rsplit('/').next().unwrap_or(base);
    match base.rfind('.') {
        Some(dot) => (&base[..dot], &base[dot..]),
        None => (base, ""),
    }
}

impl AssetName {
    /// Decode an asset path or URL.
    pub fn parse(path: &str) -> Self {
        let (base, ext) = split_base_and_ext(path);
        let mut a = AssetName {
            ext: ext.to_string(),
            ..Default::default()
        };

        let Some(m) = RE_ASSET_NAME.captures(base) else {
            return a;
        };
        let group = |i: usize| m.get(i).map_or("", |g| g.as_str());

        a.city_code = group(1).to_string();
        a.city_en = group(2).to_string();
        a.year = group(3).to_string();
        a.format = group(4).replace(' ', "").replace("%20", "").replace('+', "");
        a.op = group(5).to_string();
        a.no_dem = !group(6).is_empty();
        a.feature = group(7).to_string();
        a.ex = group(8).to_string();

        if let Some(ex) = a.feature.strip_prefix("ex-") {
            a.feature_ex = ex.split('-').map(String::from).collect();
            a.feature = "ex".to_string();
        }

        if let Some(ex) = a.ex.strip_suffix(LOW_TEXTURE_SUFFIX) {
            a.low_texture = true;
            a.ex = ex.to_string();
        }

        if a.ex == NO_TEXTURE {
            a.no_texture = true;
            a.ex.clear();
        } else if let Some(ex) = a.ex.strip_suffix(NO_TEXTURE_SUFFIX) {
            a.no_texture = true;
            a.ex = ex.to_string();
        }

        if let Some(lod) = RE_LOD.captures(&a.ex) {
            let prefix = lod[1].trim_end_matches('_').to_string();
            a.lod = lod[2].to_string();
            a.ex = prefix;
        }

        if let Some(ward) = RE_WARD.captures(&a.ex) {
            let code = ward[1].to_string();
            let (ward_en, rest) = ward[2].split_once('_').unwrap_or((&ward[2], ""));
            let (ward_en, rest) = (ward_en.to_string(), rest.to_string());
            a.ward_code = code;
            a.ward_en = ward_en;
            a.ex = rest;
        }

        a.decode_feature_specific();
        a
    }

    fn decode_feature_specific(&mut self) {
        match self.feature.as_str() {
            "fld" => {
                let elements: Vec<&str> = self.ex.split('_').collect();
                if elements.len() > 1 {
                    self.fld_admin = elements[0].to_string();
                    let last = elements[elements.len() - 1];
                    if RE_FLD_SCALE.is_match(last) {
                        self.fld_scale = last.to_string();
                        self.fld_name = elements[1..elements.len() - 1].join("_");
                    } else {
                        self.fld_name = elements[1..].join("_");
                    }
                } else {
                    self.fld_name = self.ex.clone();
                }
                self.ex.clear();
            }
            "htd" | "ifld" | "tnm" => {
                self.fld_name = std::mem::take(&mut self.ex);
            }
            "urf" => {
                self.urf_feature_type = std::mem::take(&mut self.ex);
            }
            "gen" => {
                self.gen_name = std::mem::take(&mut self.ex);
            }
            _ => {}
        }
    }

    pub fn lod_int(&self) -> i32 {
        self.lod.parse().unwrap_or(0)
    }

    pub fn ward_code_int(&self) -> i64 {
        self.ward_code.parse().unwrap_or(0)
    }

    pub fn fld_full_name(&self) -> String {
        join_non_empty(&[&self.fld_admin, &self.fld_name, &self.fld_scale], "_")
    }

    pub fn fld_admin_and_name(&self) -> String {
        join_non_empty(&[&self.fld_admin, &self.fld_name], "_")
    }

    pub fn fld_name_and_scale(&self) -> String {
        join_non_empty(&[&self.fld_name, &self.fld_scale], "_")
    }

    pub fn is_ward(&self) -> bool {
        !self.ward_code.is_empty()
    }

    pub fn city_or_ward_code(&self) -> &str {
        if self.is_ward() {
            &self.ward_code
        } else {
            &self.city_code
        }
    }

    /// Canonical name without the extension.
    pub fn stem(&self) -> String {
        let s = self.to_string();
        s.strip_suffix(self.ext.as_str()).unwrap_or(&s).to_string()
    }
}

impl From<&str> for AssetName {
    fn from(path: &str) -> Self {
        AssetName::parse(path)
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let feature = if self.feature_ex.is_empty() {
            self.feature.clone()
        } else {
            format!("{}-{}", self.feature, self.feature_ex.join("-"))
        };
        let nodem = if self.no_dem { "nodem" } else { "" };
        let lod = if self.lod.is_empty() {
            String::new()
        } else {
            format!("lod{}", self.lod)
        };
        let texture = if self.low_texture {
            "low_texture"
        } else if self.no_texture {
            NO_TEXTURE
        } else {
            ""
        };

        let name = join_non_empty(
            &[
                &self.city_code,
                &self.city_en,
                &self.year,
                &self.format,
                &self.op,
                nodem,
                &feature,
                &self.ward_code,
                &self.ward_en,
                &self.fld_admin,
                &self.fld_name,
                &self.fld_scale,
                &self.urf_feature_type,
                &self.gen_name,
                &self.ex,
                &lod,
                texture,
            ],
            "_",
        );
        write!(f, "{}{}", name, self.ext)
    }
}

pub(crate) fn join_non_empty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}
