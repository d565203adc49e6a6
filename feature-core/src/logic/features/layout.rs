//! Feature Layout - Centralized Feature Definition
//!
//! **This file controls the feature schema**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//! 4. Change an encoding table → increment `encoding::ENCODING_VERSION`
//!
//! Store writes, reference fitting, training and request-time assembly
//! all read the layout from here. The layout hash is recorded in every
//! model artifact and checked again when serving starts.

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::encoding;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the vector
/// This is the SINGLE SOURCE OF TRUTH for feature layout
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Base (0-4) ===
    "Age",          // 0: years, training-median imputed
    "Fare",         // 1: ticket fare, training-median imputed
    "Pclass",       // 2: passenger class 1..=3
    "Sex",          // 3: male=0, female=1
    "Embarked",     // 4: C=0, Q=1, S=2

    // === Derived (5-8) ===
    "Familysize",   // 5: SibSp + Parch + 1
    "Isalone",      // 6: Familysize == 1
    "HasCabin",     // 7: cabin recorded
    "Title",        // 8: title bucket from the name

    // === Interactions (9-10) ===
    "Pclass_Fare",  // 9: Pclass * Fare
    "Age_Fare",     // 10: Age * Fare
];

/// Total number of features
pub const FEATURE_COUNT: usize = 11;

const _: () = assert!(FEATURE_LAYOUT.len() == FEATURE_COUNT);

/// Target column stored next to the features, never part of the vector
pub const LABEL_FIELD: &str = "Survived";

// ============================================================================
// LAYOUT HASH
// ============================================================================

static LAYOUT_HASH: Lazy<u32> = Lazy::new(compute_layout_hash);

/// Compute CRC32 hash of the feature layout and its encoding tables
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION, encoding::ENCODING_VERSION]);

    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }

    encoding::hash_tables(&mut hasher);

    hasher.finalize()
}

/// Get layout hash (computed once per process)
pub fn layout_hash() -> u32 {
    *LAYOUT_HASH
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for artifacts and health output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub encoding_version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            encoding_version: encoding::ENCODING_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Check a recorded layout against the compiled one
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.hash)?;

        if self.feature_names.iter().map(String::as_str).ne(FEATURE_LAYOUT.iter().copied()) {
            return Err(LayoutMismatchError {
                expected_version: FEATURE_VERSION,
                expected_hash: layout_hash(),
                actual_version: self.version,
                actual_hash: self.hash,
            });
        }

        Ok(())
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when feature layout doesn't match expected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), \
     got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Validate that incoming data matches current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_COUNT, 11);
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_label_not_in_layout() {
        assert_eq!(feature_index(LABEL_FIELD), None);
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(compute_layout_hash(), compute_layout_hash());
        assert_eq!(layout_hash(), compute_layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());
        assert!(validate_layout(FEATURE_VERSION + 1, layout_hash()).is_err());
        assert!(validate_layout(FEATURE_VERSION, layout_hash().wrapping_add(1)).is_err());
    }

    #[test]
    fn test_feature_index() {
        assert_eq!(feature_index("Age"), Some(0));
        assert_eq!(feature_index("Title"), Some(8));
        assert_eq!(feature_index("Age_Fare"), Some(10));
        assert_eq!(feature_index("nonexistent"), None);
    }

    #[test]
    fn test_layout_info_roundtrip() {
        let info = LayoutInfo::current();
        assert!(info.validate().is_ok());

        let json = serde_json::to_string(&info).unwrap();
        let back: LayoutInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_layout_info_rejects_reordered_names() {
        let mut info = LayoutInfo::current();
        info.feature_names.swap(0, 1);
        assert!(info.validate().is_err());
    }
}
