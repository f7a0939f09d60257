//! Prefecture name and code tables.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Prefecture value used for datasets that cover the whole country.
pub const NATIONWIDE: &str = "全国";

/// Prefecture names in JIS X 0401 order; the code is the index plus one.
const PREFECTURES: [&str; 47] = [
    "北海道",
    "青森県",
    "岩手県",
    "宮城県",
    "秋田県",
    "山形県",
    "福島県",
    "茨城県",
    "栃木県",
    "群馬県",
    "埼玉県",
    "千葉県",
    "東京都",
    "神奈川県",
    "新潟県",
    "富山県",
    "石川県",
    "福井県",
    "山梨県",
    "長野県",
    "岐阜県",
    "静岡県",
    "愛知県",
    "三重県",
    "滋賀県",
    "京都府",
    "大阪府",
    "兵庫県",
    "奈良県",
    "和歌山県",
    "鳥取県",
    "島根県",
    "岡山県",
    "広島県",
    "山口県",
    "徳島県",
    "香川県",
    "愛媛県",
    "高知県",
    "福岡県",
    "佐賀県",
    "長崎県",
    "熊本県",
    "大分県",
    "宮崎県",
    "鹿児島県",
    "沖縄県",
];

static PREFECTURE_CODES: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    PREFECTURES
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, (i + 1) as u8))
        .collect()
});

/// Numeric prefecture code for a prefecture name (0 when unknown).
pub fn pref_code(name: &str) -> u8 {
    PREFECTURE_CODES.get(name.trim()).copied().unwrap_or(0)
}

/// Two-digit prefecture code, or an empty string for unknown prefectures.
pub fn format_pref_code(code: u8) -> String {
    if code == 0 || code as usize > PREFECTURES.len() {
        return String::new();
    }
    format!("{:02}", code)
}

/// Normalize a prefecture name and resolve its code.
///
/// Names without the trailing 都/道/府/県 are accepted. The nationwide
/// pseudo-prefecture keeps its name and has no code.
pub fn normalize_pref(name: &str) -> (String, u8) {
    let name = name.trim();
    if name.is_empty() || name == NATIONWIDE {
        return (name.to_string(), 0);
    }

    let code = pref_code(name);
    if code > 0 {
        return (name.to_string(), code);
    }

    for suffix in ["都", "道", "府", "県"] {
        let candidate = format!("{}{}", name, suffix);
        let code = pref_code(&candidate);
        if code > 0 {
            return (candidate, code);
        }
    }

    (name.to_string(), 0)
}
