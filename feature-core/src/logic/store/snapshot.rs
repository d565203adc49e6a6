//! Store Snapshot - the full stored population at one point in time
//!
//! Training and serving both fit the reference from a snapshot; the
//! fingerprint ties a model artifact to the exact population it saw.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::constants::STORE_BATCH_SIZE;
use crate::logic::features::FeatureMap;

use super::error::StoreError;
use super::{EntityId, FeatureStore};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: BTreeMap<EntityId, FeatureMap>,
}

impl Snapshot {
    pub fn from_entries(entries: BTreeMap<EntityId, FeatureMap>) -> Self {
        Self { entries }
    }

    /// Enumerate then fetch every entity
    ///
    /// Entities deleted between the SCAN and the read are skipped.
    pub async fn load(store: &dyn FeatureStore) -> Result<Self, StoreError> {
        let ids: Vec<EntityId> = store.list_all_entity_ids().await?.into_iter().collect();

        let mut entries = BTreeMap::new();
        let mut vanished = 0usize;
        for chunk in ids.chunks(STORE_BATCH_SIZE) {
            for (id, features) in store.get_batch(chunk).await? {
                match features {
                    Some(features) => {
                        entries.insert(id, features);
                    }
                    None => vanished += 1,
                }
            }
        }

        if vanished > 0 {
            log::warn!("[Snapshot] {} entities vanished between enumeration and read", vanished);
        }
        log::info!(
            "[Snapshot] Loaded {} entities from {} store",
            entries.len(),
            store.backend()
        );

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, entity_id: &str) -> Option<&FeatureMap> {
        self.entries.get(entity_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &FeatureMap)> {
        self.entries.iter()
    }

    /// SHA-256 over ids, names and value bits in sorted order
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.entries.len() as u64).to_le_bytes());

        for (id, features) in &self.entries {
            hasher.update(id.as_bytes());
            hasher.update([0u8]);
            for (name, value) in features {
                hasher.update(name.as_bytes());
                hasher.update([0u8]);
                hasher.update(value.to_bits().to_le_bytes());
            }
            hasher.update([0xffu8]);
        }

        hex::encode(hasher.finalize())
    }
}
