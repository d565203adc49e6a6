//! Store Module - Entity-keyed feature store
//!
//! ```text
//! entity id ──► entity:<id>:features ──► {"Age": 22.0, "Fare": 7.25, ...}
//! ```
//!
//! Lookups distinguish "absent" (`Ok(None)`) from failure (`Err`).

pub mod codec;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod retry;
pub mod snapshot;


use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_OPERATION_TIMEOUT_MS, DEFAULT_STORE_URL, MEMORY_STORE_URL,
    STORE_BATCH_SIZE,
};
use crate::logic::features::FeatureMap;

pub use self::error::StoreError;
pub use self::memory::InMemoryFeatureStore;
pub use self::redis_store::RedisFeatureStore;
pub use self::retry::RetryPolicy;
pub use self::snapshot::Snapshot;

/// Stable identifier of one record's feature set
pub type EntityId = String;

/// Entity-keyed store of named feature mappings
///
/// Implementations must be safe for concurrent use through `&self`.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Store or overwrite the full mapping for one entity
    async fn set(&self, entity_id: &str, features: &FeatureMap) -> Result<(), StoreError>;

    /// `Ok(None)` when the entity was never stored
    async fn get(&self, entity_id: &str) -> Result<Option<FeatureMap>, StoreError>;

    /// Not atomic across entities
    async fn set_batch(&self, batch: &BTreeMap<EntityId, FeatureMap>) -> Result<(), StoreError>;

    /// Every requested id appears in the result; missing ones map to `None`
    async fn get_batch(
        &self,
        entity_ids: &[EntityId],
    ) -> Result<BTreeMap<EntityId, Option<FeatureMap>>, StoreError>;

    async fn list_all_entity_ids(&self) -> Result<BTreeSet<EntityId>, StoreError>;
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// `redis://...`, `rediss://...` or `memory://`
    pub url: String,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    pub retry: RetryPolicy,
    pub batch_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORE_URL.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MS),
            retry: RetryPolicy::default(),
            batch_size: STORE_BATCH_SIZE,
        }
    }
}

impl StoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Open the backend named by the URL scheme
///
/// Fails fast when the backend does not answer; callers at startup should
/// treat the error as fatal.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn FeatureStore>, StoreError> {
    if config.url.starts_with(MEMORY_STORE_URL) {
        log::info!("[Store] Using in-memory feature store");
        return Ok(Arc::new(InMemoryFeatureStore::new()));
    }

    if config.url.starts_with("redis://") || config.url.starts_with("rediss://") {
        let store = RedisFeatureStore::connect(config).await?;
        return Ok(Arc::new(store));
    }

    Err(StoreError::UnsupportedUrl(redact_url(&config.url)))
}

/// Hide the password part of a connection URL
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((userinfo, host)) => {
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}
