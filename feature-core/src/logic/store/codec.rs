//! Key and value encoding shared by every backend
//!
//! Key:   `entity:<id>:features`
//! Value: JSON object, feature name → number

use crate::constants::{ENTITY_KEY_PREFIX, ENTITY_KEY_SUFFIX, KEY_DELIMITER};
use crate::logic::features::FeatureMap;

use super::error::StoreError;

/// Store key for one entity
pub fn entity_key(entity_id: &str) -> Result<String, StoreError> {
    if entity_id.trim().is_empty() {
        return Err(StoreError::InvalidEntityId(entity_id.to_string()));
    }
    Ok(format!(
        "{ENTITY_KEY_PREFIX}{KEY_DELIMITER}{entity_id}{KEY_DELIMITER}{ENTITY_KEY_SUFFIX}"
    ))
}

/// Reverse of `entity_key`; `None` for keys outside the namespace
pub fn parse_entity_key(key: &str) -> Option<&str> {
    let id = key
        .strip_prefix(ENTITY_KEY_PREFIX)?
        .strip_prefix(KEY_DELIMITER)?
        .strip_suffix(ENTITY_KEY_SUFFIX)?
        .strip_suffix(KEY_DELIMITER)?;

    if id.trim().is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Glob pattern matching every entity key
pub fn key_pattern() -> String {
    format!("{ENTITY_KEY_PREFIX}{KEY_DELIMITER}*{KEY_DELIMITER}{ENTITY_KEY_SUFFIX}")
}

/// Serialize a feature mapping, rejecting NaN and infinities
pub fn encode_features(entity_id: &str, features: &FeatureMap) -> Result<String, StoreError> {
    if let Some((name, _)) = features.iter().find(|(_, v)| !v.is_finite()) {
        return Err(StoreError::NonFinite {
            entity: entity_id.to_string(),
            feature: name.clone(),
        });
    }

    serde_json::to_string(features).map_err(|e| StoreError::Corrupt {
        key: entity_id.to_string(),
        reason: e.to_string(),
    })
}

pub fn decode_features(key: &str, raw: &str) -> Result<FeatureMap, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
