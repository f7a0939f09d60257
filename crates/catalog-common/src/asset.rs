//! Asset URL and field helpers shared by the builders.

use once_cell::sync::Lazy;
use regex::Regex;

/// Formats whose datasets expose selectable layers.
const LAYER_SUPPORTED_FORMATS: [&str; 2] = ["mvt", "wms"];

static RE_REIWA: Lazy<Regex> = Lazy::new(|| Regex::new(r"令和([0-9]+?)年度?").unwrap());

/// Split a URL into the part before any query/fragment and the rest.
fn split_query(url: &str) -> (&str, &str) {
    match url.find(['?', '#']) {
        Some(i) => url.split_at(i),
        None => (url, ""),
    }
}

/// Strip the extension of the last path segment.
pub fn asset_root_path(path: &str) -> String {
    let (base, _) = split_query(path);
    let file_start = base.rfind('/').map(|i| i + 1).unwrap_or(0);
    match base[file_start..].rfind('.') {
        Some(dot) => base[..file_start + dot].to_string(),
        None => base.to_string(),
    }
}

/// URL of the entry point of an uploaded archive for the given format.
///
/// Zipped 3D Tiles resolve to their `tileset.json`, zipped vector tiles to a
/// tile template. Anything else is returned as is.
pub fn asset_url_from_format(url: &str, format: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    let (base, rest) = split_query(url);
    if !base.ends_with(".zip") {
        return url.to_string();
    }

    let root = asset_root_path(base);
    match format {
        "3dtiles" => format!("{}/tileset.json{}", root, rest),
        "mvt" => format!("{}/{{z}}/{{x}}/{{y}}.mvt{}", root, rest),
        _ => url.to_string(),
    }
}

pub fn is_layer_supported(format: &str) -> bool {
    LAYER_SUPPORTED_FORMATS.contains(&format)
}

/// Normalize a human readable format name to its short code.
pub fn format_type_en(format: &str) -> String {
    let f = format.trim().to_lowercase();
    let compact: String = f.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.as_str() {
        "3dtiles" | "cesium3dtiles" => "3dtiles".to_string(),
        "geojson" => "geojson".to_string(),
        "czml" => "czml".to_string(),
        "gtfs" | "gtfs-realtime" | "gtfsrealtime" => "gtfs".to_string(),
        "gltf" | "glb" => "gltf".to_string(),
        "mvt" | "vectortiles" => "mvt".to_string(),
        "wms" => "wms".to_string(),
        "tms" => "tms".to_string(),
        "tiles" | "rastertiles" => "tiles".to_string(),
        "csv" => "csv".to_string(),
        _ => compact,
    }
}

/// Parse a year field, accepting Reiwa era years and 年/年度 suffixes.
pub fn year_int(year: &str) -> i32 {
    let year = year.trim();
    if let Some(caps) = RE_REIWA.captures(year) {
        let reiwa: i32 = caps[1].parse().unwrap_or(0);
        return if reiwa > 0 { reiwa + 2018 } else { 0 };
    }

    year.trim_end_matches('度')
        .trim_end_matches('年')
        .parse()
        .unwrap_or(0)
}

/// Remove a leading UTF-8 byte order mark.
pub fn clean_bom(s: &str) -> &str {
    s.strip_prefix('\u{feff}').unwrap_or(s)
}

/// Split a comma separated list, trimming entries and dropping empties.
pub fn split_comma_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_root_path() {
        assert_eq!(
            asset_root_path("https://example.com/assets/aa/13100_tokyo_2022_3dtiles_1_op_bldg.zip"),
            "https://example.com/assets/aa/13100_tokyo_2022_3dtiles_1_op_bldg"
        );
        assert_eq!(asset_root_path("/a.b/c"), "/a.b/c");
    }

    #[test]
    fn test_asset_url_from_format() {
        assert_eq!(
            asset_url_from_format("https://example.com/a/bldg.zip", "3dtiles"),
            "https://example.com/a/bldg/tileset.json"
        );
        assert_eq!(
            asset_url_from_format("https://example.com/a/luse.zip", "mvt"),
            "https://example.com/a/luse/{z}/{x}/{y}.mvt"
        );
        assert_eq!(
            asset_url_from_format("https://example.com/a/park.geojson", "geojson"),
            "https://example.com/a/park.geojson"
        );
        assert_eq!(asset_url_from_format("", "3dtiles"), "");
    }

    #[test]
    fn test_format_type_en() {
        assert_eq!(format_type_en("3D Tiles"), "3dtiles");
        assert_eq!(format_type_en("GeoJSON"), "geojson");
        assert_eq!(format_type_en("MVT"), "mvt");
        assert_eq!(format_type_en("Shapefile"), "shapefile");
    }

    #[test]
    fn test_year_int() {
        assert_eq!(year_int("2022"), 2022);
        assert_eq!(year_int("2022年度"), 2022);
        assert_eq!(year_int("令和4年度"), 2022);
        assert_eq!(year_int(""), 0);
        assert_eq!(year_int("unknown"), 0);
    }

    #[test]
    fn test_split_comma_list() {
        assert_eq!(split_comma_list(" a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_comma_list("").is_empty());
    }

    #[test]
    fn test_clean_bom() {
        assert_eq!(clean_bom("\u{feff}{}"), "{}");
        assert_eq!(clean_bom("{}"), "{}");
    }
}
