use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::entity_type::EntityType;

/// Injected read-through cache capability.
///
/// Repositories hold a reference to this rather than a process singleton
/// so tests can substitute an in-memory map. Writes invalidate the
/// affected key synchronously before the pipeline call returns; reads
/// repopulate lazily on miss.
///
/// Reads are monotonic per key: a populate racing an invalidation must
/// not re-install the pre-invalidation value. `epoch` and the epoch
/// argument on `set` carry that handshake; `invalidate` bumps the key's
/// epoch, and a `set` whose captured epoch is stale is dropped.
#[async_trait]
pub trait EntityCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Current invalidation epoch for the key. Capture before loading
    /// from the persistence port; pass to `set`.
    async fn epoch(&self, key: &str) -> u64;

    /// Install a value, unless the key was invalidated after `epoch`
    /// was captured.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration, epoch: u64);

    async fn invalidate(&self, key: &str);

    async fn flush(&self);
}

/// Cache key for a single entity.
pub fn entity_cache_key(entity_type: EntityType, id: i64) -> String {
    format!("{entity_type}:{id}")
}

/// Read-through helper shared by the entity repositories.
///
/// Serves a hit from the cache, otherwise loads from the persistence
/// port and repopulates the key before returning. The epoch is captured
/// before the load so a write that lands mid-load cannot be shadowed by
/// the stale populate. A cached value that no longer deserializes to
/// `T` is treated as a miss.
pub async fn read_through<T, F, Fut>(
    cache: &dyn EntityCache,
    key: &str,
    ttl: Duration,
    load: F,
) -> civic_core_api::CoreResult<Option<T>>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = civic_core_api::CoreResult<Option<T>>>,
{
    let epoch = cache.epoch(key).await;
    if let Some(value) = cache.get(key).await {
        if let Ok(entity) = serde_json::from_value::<T>(value) {
            return Ok(Some(entity));
        }
    }
    let loaded = load().await?;
    if let Some(entity) = &loaded {
        if let Ok(value) = serde_json::to_value(entity) {
            cache.set(key, value, ttl, epoch).await;
        }
    }
    Ok(loaded)
}

type Entry = (serde_json::Value, Duration);

struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.1)
    }
}

/// Moka-backed cache with a per-entry time-to-live.
pub struct MokaCache {
    inner: Cache<String, Entry>,
    epochs: Mutex<HashMap<String, u64>>,
}

impl MokaCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(PerEntryTtl)
                .build(),
            epochs: Mutex::new(HashMap::new()),
        }
    }

    fn current_epoch(&self, key: &str) -> u64 {
        let epochs = self.epochs.lock().unwrap_or_else(|e| e.into_inner());
        epochs.get(key).copied().unwrap_or(0)
    }

    fn bump_epoch(&self, key: &str) {
        let mut epochs = self.epochs.lock().unwrap_or_else(|e| e.into_inner());
        *epochs.entry(key.to_string()).or_insert(0) += 1;
    }
}

#[async_trait]
impl EntityCache for MokaCache {
    async fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.get(key).await.map(|(value, _)| value)
    }

    async fn epoch(&self, key: &str) -> u64 {
        self.current_epoch(key)
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration, epoch: u64) {
        if self.current_epoch(key) != epoch {
            return;
        }
        self.inner.insert(key.to_string(), (value, ttl)).await;
        // An invalidation may have raced the insert; its inner
        // invalidate can land before our insert did, so re-check and
        // undo rather than leave the stale entry behind.
        if self.current_epoch(key) != epoch {
            self.inner.invalidate(key).await;
        }
    }

    async fn invalidate(&self, key: &str) {
        self.bump_epoch(key);
        self.inner.invalidate(key).await;
    }

    async fn flush(&self) {
        let keys: Vec<String> = {
            let epochs = self.epochs.lock().unwrap_or_else(|e| e.into_inner());
            epochs.keys().cloned().collect()
        };
        for key in keys {
            self.bump_epoch(&key);
        }
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let cache = MokaCache::new(100);
        let key = entity_cache_key(EntityType::CitizenRequest, 1);
        let epoch = cache.epoch(&key).await;
        cache.set(&key, json!({"id": 1}), TTL, epoch).await;
        assert_eq!(cache.get(&key).await, Some(json!({"id": 1})));
    }

    #[tokio::test]
    async fn invalidate_removes_the_key() {
        let cache = MokaCache::new(100);
        let key = entity_cache_key(EntityType::CitizenRequest, 2);
        let epoch = cache.epoch(&key).await;
        cache.set(&key, json!({"id": 2}), TTL, epoch).await;
        cache.invalidate(&key).await;
        assert_eq!(cache.get(&key).await, None);
    }

    #[tokio::test]
    async fn keys_are_namespaced_by_entity_type() {
        let cache = MokaCache::new(100);
        let request_key = entity_cache_key(EntityType::CitizenRequest, 3);
        let agent_key = entity_cache_key(EntityType::Agent, 3);
        let epoch = cache.epoch(&request_key).await;
        cache.set(&request_key, json!({"id": 3}), TTL, epoch).await;
        assert_eq!(cache.get(&agent_key).await, None);
    }

    #[tokio::test]
    async fn stale_populate_after_invalidation_is_dropped() {
        let cache = MokaCache::new(100);
        let key = entity_cache_key(EntityType::CitizenRequest, 4);

        // A reader captures the epoch, then a write invalidates the key
        // before the reader's populate lands.
        let epoch = cache.epoch(&key).await;
        cache.invalidate(&key).await;
        cache.set(&key, json!({"subject": "old"}), TTL, epoch).await;

        assert_eq!(cache.get(&key).await, None);
    }
}
