//! Redis backend
//!
//! - One `ConnectionManager` shared by all callers (it reconnects itself)
//! - Every command bounded by the operation timeout, then retried on
//!   transient failures
//! - `SCAN MATCH` for enumeration, `MGET` for batch reads, non-atomic
//!   pipelines for batch writes

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};

use crate::logic::features::FeatureMap;

use super::codec::{decode_features, encode_features, entity_key, key_pattern, parse_entity_key};
use super::error::StoreError;
use super::retry::RetryPolicy;
use super::{redact_url, EntityId, FeatureStore, StoreConfig};

pub struct RedisFeatureStore {
    conn: ConnectionManager,
    operation_timeout: Duration,
    retry: RetryPolicy,
    batch_size: usize,
}

impl RedisFeatureStore {
    /// Connect and PING within the connect timeout; any failure is fatal
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let url = redact_url(&config.url);
        let unreachable = |reason: String| StoreError::Unreachable {
            url: url.clone(),
            reason,
        };

        let client = Client::open(config.url.as_str()).map_err(|e| unreachable(e.to_string()))?;

        let conn = tokio::time::timeout(config.connect_timeout, async {
            let mut conn = ConnectionManager::new(client).await?;
            ping(&mut conn).await?;
            Ok::<_, redis::RedisError>(conn)
        })
        .await
        .map_err(|_| unreachable(format!("no answer within {:?}", config.connect_timeout)))?
        .map_err(|e| unreachable(e.to_string()))?;

        log::info!("[Store] Connected to Redis at {}", url);

        Ok(Self {
            conn,
            operation_timeout: config.operation_timeout,
            retry: config.retry,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Run one command with timeout + retry on a fresh handle
    async fn call<T, F, Fut>(&self, op: &'static str, command: F) -> Result<T, StoreError>
    where
        F: Fn(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let budget = self.operation_timeout;
        self.retry
            .run(op, || {
                let fut = command(self.conn.clone());
                async move {
                    match tokio::time::timeout(budget, fut).await {
                        Ok(result) => result.map_err(StoreError::from),
                        Err(_) => Err(StoreError::Timeout {
                            op,
                            after_ms: budget.as_millis() as u64,
                        }),
                    }
                }
            })
            .await
    }
}

// ============================================================================
// RAW COMMANDS
// ============================================================================

async fn ping(conn: &mut ConnectionManager) -> RedisResult<String> {
    redis::cmd("PING").query_async(conn).await
}

async fn get_raw(mut conn: ConnectionManager, key: String) -> RedisResult<Option<String>> {
    redis::cmd("GET").arg(key).query_async(&mut conn).await
}

async fn set_raw(mut conn: ConnectionManager, key: String, value: String) -> RedisResult<()> {
    redis::cmd("SET").arg(key).arg(value).query_async(&mut conn).await
}

/// MGET even for one key, so the reply is always an array
async fn mget_raw(mut conn: ConnectionManager, keys: Vec<String>) -> RedisResult<Vec<Option<String>>> {
    redis::cmd("MGET").arg(&keys).query_async(&mut conn).await
}

async fn pipeline_set_raw(mut conn: ConnectionManager, pairs: Vec<(String, String)>) -> RedisResult<()> {
    let mut pipe = redis::pipe();
    for (key, value) in &pairs {
        pipe.cmd("SET").arg(key).arg(value).ignore();
    }
    pipe.query_async(&mut conn).await
}

async fn scan_page(
    mut conn: ConnectionManager,
    cursor: u64,
    pattern: String,
    count: usize,
) -> RedisResult<(u64, Vec<String>)> {
    redis::cmd("SCAN")
        .arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(count)
        .query_async(&mut conn)
        .await
}

// ============================================================================
// FEATURE STORE
// ============================================================================

#[async_trait]
impl FeatureStore for RedisFeatureStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.call("PING", |mut conn| async move { ping(&mut conn).await })
            .await
            .map(|_| ())
    }

    async fn set(&self, entity_id: &str, features: &FeatureMap) -> Result<(), StoreError> {
        let key = entity_key(entity_id)?;
        let value = encode_features(entity_id, features)?;
        self.call("SET", |conn| set_raw(conn, key.clone(), value.clone()))
            .await
    }

    async fn get(&self, entity_id: &str) -> Result<Option<FeatureMap>, StoreError> {
        let key = entity_key(entity_id)?;
        let raw = self.call("GET", |conn| get_raw(conn, key.clone())).await?;
        raw.map(|raw| decode_features(&key, &raw)).transpose()
    }

    async fn set_batch(&self, batch: &BTreeMap<EntityId, FeatureMap>) -> Result<(), StoreError> {
        let encoded = batch
            .iter()
            .map(|(id, features)| Ok((entity_key(id)?, encode_features(id, features)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;

        // Chunks are applied independently; a failure leaves earlier chunks written
        for chunk in encoded.chunks(self.batch_size) {
            self.call("PIPELINE SET", |conn| pipeline_set_raw(conn, chunk.to_vec()))
                .await?;
        }

        log::debug!("[Store] Wrote {} entities", batch.len());
        Ok(())
    }

    async fn get_batch(
        &self,
        entity_ids: &[EntityId],
    ) -> Result<BTreeMap<EntityId, Option<FeatureMap>>, StoreError> {
        let mut result = BTreeMap::new();

        for ids in entity_ids.chunks(self.batch_size) {
            let keys = ids
                .iter()
                .map(|id| entity_key(id))
                .collect::<Result<Vec<_>, _>>()?;

            let values = self.call("MGET", |conn| mget_raw(conn, keys.clone())).await?;
            if values.len() != keys.len() {
                return Err(StoreError::Command(format!(
                    "MGET returned {} values for {} keys",
                    values.len(),
                    keys.len()
                )));
            }

            for ((id, key), raw) in ids.iter().zip(&keys).zip(values) {
                let features = raw.map(|raw| decode_features(key, &raw)).transpose()?;
                result.insert(id.clone(), features);
            }
        }

        Ok(result)
    }

    async fn list_all_entity_ids(&self) -> Result<BTreeSet<EntityId>, StoreError> {
        let pattern = key_pattern();
        let mut ids = BTreeSet::new();
        let mut cursor = 0u64;

        loop {
            let (next, keys) = self
                .call("SCAN", |conn| scan_page(conn, cursor, pattern.clone(), self.batch_size))
                .await?;

            for key in &keys {
                match parse_entity_key(key) {
                    Some(id) => {
                        ids.insert(id.to_string());
                    }
                    None => log::warn!("[Store] Ignoring key outside the entity namespace: {}", key),
                }
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use crate::logic::features::{FeatureVector, FEATURE_COUNT};

    fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn fast_config(port: u16) -> StoreConfig {
        StoreConfig {
            url: format!("redis://127.0.0.1:{port}"),
            connect_timeout: Duration::from_millis(300),
            operation_timeout: Duration::from_millis(100),
            retry: RetryPolicy {
                max_attempts: 3,
                base_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(20),
            },
            batch_size: 2,
        }
    }

    /// Accepts connections, reads everything, answers nothing
    async fn mute_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
                });
            }
        });
        port
    }

    /// Completes the connection handshake (CLIENT replies, first PING),
    /// then goes silent while counting the GETs it receives
    async fn stalling_server(gets: Arc<AtomicUsize>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(stall(socket, Arc::clone(&gets)));
            }
        });
        port
    }

    async fn stall(mut socket: TcpStream, gets: Arc<AtomicUsize>) {
        let mut seen = Vec::new();
        let mut client_replies = 0;
        let mut ponged = false;
        let mut buf = [0u8; 1024];

        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
            seen.extend_from_slice(&buf[..n]);

            let clients = occurrences(&seen, b"\r\nCLIENT\r\n");
            while client_replies < clients {
                let _ = socket.write_all(b"+OK\r\n").await;
                client_replies += 1;
            }
            if !ponged && occurrences(&seen, b"\r\nPING\r\n") > 0 {
                let _ = socket.write_all(b"+PONG\r\n").await;
                ponged = true;
            }
            gets.store(occurrences(&seen, b"\r\nGET\r\n"), Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_connect_gives_up_within_connect_timeout() {
        let port = mute_server().await;
        let config = fast_config(port);

        let started = Instant::now();
        let result = RedisFeatureStore::connect(&config).await;

        assert!(matches!(result, Err(StoreError::Unreachable { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_stalled_command_times_out_after_every_attempt() {
        let gets = Arc::new(AtomicUsize::new(0));
        let port = stalling_server(Arc::clone(&gets)).await;
        let config = fast_config(port);

        let store = RedisFeatureStore::connect(&config).await.unwrap();

        let started = Instant::now();
        let err = store.get("1").await.unwrap_err();

        assert_eq!(err, StoreError::Timeout { op: "GET", after_ms: 100 });
        assert!(started.elapsed() >= Duration::from_millis(300));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(gets.load(Ordering::SeqCst), 3);
    }

    /// Needs a live server: `REDIS_URL=redis://127.0.0.1:6379/15 cargo test -- --ignored`
    #[tokio::test]
    #[ignore = "needs a running Redis at REDIS_URL"]
    async fn test_live_redis_roundtrip() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".to_string());
        let config = StoreConfig {
            batch_size: 2,
            ..StoreConfig::new(url)
        };
        let store = RedisFeatureStore::connect(&config).await.unwrap();

        let ids: Vec<EntityId> = (0..5).map(|i| format!("roundtrip-{i}")).collect();
        let batch: BTreeMap<EntityId, FeatureMap> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let features = FeatureVector::from_values([i as f64 + 0.1; FEATURE_COUNT]).to_feature_map();
                (id.clone(), features)
            })
            .collect();

        // Five entities over chunks of two
        store.set_batch(&batch).await.unwrap();

        let single = FeatureVector::from_values([7.25; FEATURE_COUNT]).to_feature_map();
        store.set("roundtrip-single", &single).await.unwrap();
        assert_eq!(store.get("roundtrip-single").await.unwrap(), Some(single));
        assert_eq!(store.get("roundtrip-never-stored").await.unwrap(), None);

        let mut wanted = ids.clone();
        wanted.push("roundtrip-never-stored".to_string());
        let fetched = store.get_batch(&wanted).await.unwrap();
        assert_eq!(fetched.len(), wanted.len());
        for id in &ids {
            assert_eq!(fetched[id].as_ref(), batch.get(id));
        }
        assert_eq!(fetched["roundtrip-never-stored"], None);

        // SCAN pages of two keys
        let listed = store.list_all_entity_ids().await.unwrap();
        for id in &ids {
            assert!(listed.contains(id), "{id} missing from SCAN");
        }
        assert!(listed.contains("roundtrip-single"));
    }
}
