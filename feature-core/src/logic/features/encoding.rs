//! Encoding Tables - Categorical lookups shared by training and serving
//!
//! Tables are frozen constants, never re-derived from a batch. Any change
//! here MUST bump ENCODING_VERSION (it feeds the layout hash).

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use regex::Regex;

use super::error::FeatureError;

/// Current encoding table version
pub const ENCODING_VERSION: u8 = 1;

/// Sex → binary code
pub const SEX_CODES: &[(&str, f64)] = &[("male", 0.0), ("female", 1.0)];

/// Port of embarkation → category code (alphabetical order of the ports)
pub const EMBARKED_CODES: &[(&str, f64)] = &[("C", 0.0), ("Q", 1.0), ("S", 2.0)];

/// Title → bucket code
pub const TITLE_CODES: &[(&str, f64)] = &[
    ("Mr", 0.0),
    ("Miss", 1.0),
    ("Mrs", 2.0),
    ("Master", 3.0),
];

/// Bucket for every title not in TITLE_CODES, and for names without one
pub const RARE_TITLE_CODE: f64 = 4.0;

static TITLE_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r" ([A-Za-z]+)\.").ok());

// ============================================================================
// ENCODERS
// ============================================================================

fn lookup(table: &[(&str, f64)], key: &str) -> Option<f64> {
    table.iter().find(|(k, _)| *k == key).map(|(_, code)| *code)
}

/// Encode sex, case-insensitive
pub fn encode_sex(value: &str) -> Result<f64, FeatureError> {
    lookup(SEX_CODES, &value.trim().to_ascii_lowercase()).ok_or_else(|| {
        FeatureError::UnknownCategory {
            field: "Sex".to_string(),
            value: value.to_string(),
        }
    })
}

/// Normalize a port code the way both paths must see it
pub fn normalize_embarked(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// Encode port of embarkation
pub fn encode_embarked(value: &str) -> Result<f64, FeatureError> {
    lookup(EMBARKED_CODES, &normalize_embarked(value)).ok_or_else(|| {
        FeatureError::UnknownCategory {
            field: "Embarked".to_string(),
            value: value.to_string(),
        }
    })
}

/// Extract the title word, e.g. "Braund, Mr. Owen Harris" → "Mr"
pub fn extract_title(name: &str) -> Option<&str> {
    TITLE_PATTERN
        .as_ref()?
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Encode the title bucket, falling back to the rare bucket
pub fn encode_title(name: &str) -> f64 {
    extract_title(name)
        .and_then(|title| lookup(TITLE_CODES, title))
        .unwrap_or(RARE_TITLE_CODE)
}

/// A cabin counts as recorded when it has any non-blank text
pub fn has_cabin(cabin: Option<&str>) -> bool {
    cabin.is_some_and(|c| !c.trim().is_empty())
}

/// Feed every table into the layout hash
pub(crate) fn hash_tables(hasher: &mut Hasher) {
    for table in [SEX_CODES, EMBARKED_CODES, TITLE_CODES] {
        for (key, code) in table {
            hasher.update(key.as_bytes());
            hasher.update(&code.to_le_bytes());
        }
        hasher.update(&[0xff]);
    }
    hasher.update(&RARE_TITLE_CODE.to_le_bytes());
}
