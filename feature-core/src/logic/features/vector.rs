//! Feature Vector - Core data structure for model input
//!
//! **Versioned feature vector with layout validation**
//!
//! Uses centralized layout from `layout.rs` for:
//! - Consistent feature ordering
//! - Version tracking
//! - Layout hash for compatibility checks
//!
//! The store holds the named form (`FeatureMap`); the scaler, drift
//! detector and classifier consume `values` in layout order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::FeatureError;
use super::layout::{
    feature_index, layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT,
    FEATURE_LAYOUT, FEATURE_VERSION,
};

/// Named scalar features as stored per entity (may also carry the label)
pub type FeatureMap = BTreeMap<String, f64>;

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned Feature Vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Create a new zeroed feature vector with current version
    pub fn new() -> Self {
        Self::from_values([0.0; FEATURE_COUNT])
    }

    /// Create from raw values with current version
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Assemble from a stored mapping; extra keys (the label) are dropped
    pub fn from_feature_map(map: &FeatureMap) -> Result<Self, FeatureError> {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_LAYOUT) {
            let value = *map
                .get(*name)
                .ok_or_else(|| FeatureError::MissingField(name.to_string()))?;
            if !value.is_finite() {
                return Err(FeatureError::NonFinite { field: name.to_string() });
            }
            *slot = value;
        }
        Ok(Self::from_values(values))
    }

    /// Named form for the store
    pub fn to_feature_map(&self) -> FeatureMap {
        FEATURE_LAYOUT
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    /// Get values as slice
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        feature_index(name).and_then(|i| self.get(i))
    }

    /// Set feature by name
    pub fn set_by_name(&mut self, name: &str, value: f64) -> bool {
        match feature_index(name) {
            Some(index) => {
                self.values[index] = value;
                true
            }
            None => false,
        }
    }

    /// Validate that this vector is compatible with current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    /// First feature that is NaN or infinite, if any
    pub fn first_non_finite(&self) -> Option<&'static str> {
        FEATURE_LAYOUT
            .iter()
            .zip(self.values.iter())
            .find(|(_, v)| !v.is_finite())
            .map(|(name, _)| *name)
    }

    /// Canonical byte encoding (layout metadata + little-endian values)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(5 + FEATURE_COUNT * 8);
        bytes.push(self.version);
        bytes.extend_from_slice(&self.layout_hash.to_le_bytes());
        for value in &self.values {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "values": self.values,
            "named_values": self.to_feature_map(),
        })
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}

// ============================================================================
// TESTS
// ============================================================================
