//! In-process backend
//!
//! Holds the same encoded keys and values a Redis backend would, so the
//! codec is exercised identically. Selected with `memory://`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::logic::features::FeatureMap;

use super::codec::{decode_features, encode_features, entity_key, parse_entity_key};
use super::error::StoreError;
use super::{EntityId, FeatureStore};

#[derive(Debug, Default)]
pub struct InMemoryFeatureStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Write an already-encoded value under a raw key
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().insert(key.into(), value.into());
    }
}

#[async_trait]
impl FeatureStore for InMemoryFeatureStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn set(&self, entity_id: &str, features: &FeatureMap) -> Result<(), StoreError> {
        let key = entity_key(entity_id)?;
        let value = encode_features(entity_id, features)?;
        self.entries.write().insert(key, value);
        Ok(())
    }

    async fn get(&self, entity_id: &str) -> Result<Option<FeatureMap>, StoreError> {
        let key = entity_key(entity_id)?;
        let entries = self.entries.read();
        entries
            .get(&key)
            .map(|raw| decode_features(&key, raw))
            .transpose()
    }

    async fn set_batch(&self, batch: &BTreeMap<EntityId, FeatureMap>) -> Result<(), StoreError> {
        // Encode everything first so a bad entry leaves the map untouched
        let encoded = batch
            .iter()
            .map(|(id, features)| Ok((entity_key(id)?, encode_features(id, features)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;

        self.entries.write().extend(encoded);
        Ok(())
    }

    async fn get_batch(
        &self,
        entity_ids: &[EntityId],
    ) -> Result<BTreeMap<EntityId, Option<FeatureMap>>, StoreError> {
        let entries = self.entries.read();
        let mut result = BTreeMap::new();
        for id in entity_ids {
            let key = entity_key(id)?;
            let features = entries
                .get(&key)
                .map(|raw| decode_features(&key, raw))
                .transpose()?;
            result.insert(id.clone(), features);
        }
        Ok(result)
    }

    async fn list_all_entity_ids(&self) -> Result<BTreeSet<EntityId>, StoreError> {
        Ok(self
            .entries
            .read()
            .keys()
            .filter_map(|key| parse_entity_key(key))
            .map(str::to_string)
            .collect())
    }
}
