use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::taxonomy::match_room_type;

/// Semantic category of a text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCategory {
    RoomName,
    Area,
    Dimension,
    Label,
    Unknown,
}

// 3.3㎡, 10.5평, 12.3m²
static AREA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+\.?\d*)\s*(㎡|m²|m2|평|py)").expect("literal area pattern")
});

// 3,600 / 2400 / 2400mm
static DIMENSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}[,.]?\d{3}|\d{3,5})\s*(mm)?").expect("literal dimension pattern")
});

static DIMENSION_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3,5}$").expect("literal dimension value pattern"));

/// Classify raw text when no upstream recognizer supplied a category.
pub fn classify_text(text: &str) -> TextCategory {
    let text = text.trim();
    if text.is_empty() {
        return TextCategory::Unknown;
    }
    if match_room_type(text).is_some() {
        return TextCategory::RoomName;
    }
    if AREA_PATTERN.is_match(text) {
        return TextCategory::Area;
    }
    if DIMENSION_PATTERN.is_match(text) {
        return TextCategory::Dimension;
    }
    let digits = text.replace([',', '.'], "");
    if digits.len() >= 3 && digits.chars().all(|c| c.is_ascii_digit()) {
        return TextCategory::Dimension;
    }
    TextCategory::Unknown
}

/// Strip thousands separators and spaces the way dimension strings are written.
pub fn clean_numeric(text: &str) -> String {
    text.replace([',', ' '], "").trim().to_string()
}

/// Millimeter value of a dimension string: the cleaned text must be a bare
/// 3-5 digit integer.
pub fn dimension_value(text: &str) -> Option<u32> {
    let cleaned = clean_numeric(text);
    if !DIMENSION_VALUE.is_match(&cleaned) {
        return None;
    }
    cleaned.parse().ok()
}

/// Area in square meters written as `84㎡`, `12.5m2`; `평` values are converted.
pub fn area_value(text: &str) -> Option<f64> {
    const SQM_PER_PYEONG: f64 = 3.305_785;
    let caps = AREA_PATTERN.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    if unit == "평" || unit == "py" {
        Some(value * SQM_PER_PYEONG)
    } else {
        Some(value)
    }
}
