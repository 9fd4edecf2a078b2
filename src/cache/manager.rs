//! Cache Manager Module
//!
//! Shared, clonable handle over a [`CacheStore`] with a typed API, fetch
//! strategies and ownership of the periodic expiry sweep.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{CacheOptions, CacheStats, CacheStore, Strategy};
use crate::config::{Config, Provider};
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Cache Manager ==
/// Handle to one cache instance. Clones share the same store.
#[derive(Debug, Clone)]
pub struct CacheManager {
    store: Arc<RwLock<CacheStore>>,
    /// Keys with a background revalidation running
    in_flight: Arc<Mutex<HashSet<String>>>,
    sweeper: Arc<Mutex<Option<SweepHandle>>>,
    sweep_interval: Duration,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager for the configured provider.
    ///
    /// Only the in-memory provider is implemented; `redis` and `memcached`
    /// are rejected with [`CacheError::UnsupportedProvider`].
    pub fn new(config: &Config) -> Result<Self> {
        match config.provider {
            Provider::Memory => {}
            other => return Err(CacheError::UnsupportedProvider(other.to_string())),
        }

        info!(
            max_memory = ?config.max_memory,
            default_ttl_secs = config.ttl.medium.as_secs(),
            "cache manager initialized"
        );

        Ok(Self::from_store(
            CacheStore::from_config(config),
            config.sweep_interval,
        ))
    }

    /// Wraps an existing store.
    pub fn from_store(store: CacheStore, sweep_interval: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            sweeper: Arc::new(Mutex::new(None)),
            sweep_interval,
        }
    }

    // == Get ==
    /// Reads and deserializes a live value.
    ///
    /// A value that no longer deserializes into `T` is logged and treated as
    /// absent. Use [`CacheManager::try_get`] to observe the decode error.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key).await {
            Ok(decoded) => decoded,
            Err(error) => {
                warn!(key = %key, %error, "cached value has unexpected shape");
                None
            }
        }
    }

    /// Reads a live value, failing with [`CacheError::Serialization`] when it
    /// does not deserialize into `T`. The read still counts as a hit.
    pub async fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_value(key).await {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Reads a live value as raw JSON.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        self.store.write().await.get(key)
    }

    // == Set ==
    /// Serializes and stores a value. Serialization failures are logged and
    /// the call becomes a no-op.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: impl Into<String>,
        value: &T,
        options: &CacheOptions,
    ) {
        let key = key.into();
        if let Some(json) = encode(&key, value) {
            self.set_value(key, json, options).await;
        }
    }

    /// Stores a raw JSON value.
    pub async fn set_value(&self, key: impl Into<String>, value: Value, options: &CacheOptions) {
        self.store.write().await.set(key.into(), value, options);
    }

    // == Delete ==
    pub async fn delete(&self, key: &str) {
        self.store.write().await.delete(key);
    }

    /// Removes every item tagged `tag`, returning how many were removed.
    pub async fn delete_by_tag(&self, tag: &str) -> usize {
        self.store.write().await.delete_by_tag(tag)
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    // == Read Accessors ==
    /// Checks for a live item without affecting access counters or stats.
    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys()
    }

    /// Total stored size in bytes.
    pub async fn size(&self) -> u64 {
        self.store.read().await.size()
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Snapshot of the statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    pub async fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        self.store.read().await.ttl_remaining(key)
    }

    /// Runs one expiry sweep immediately.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    // == Strategies ==
    /// Resolves `key` according to `strategy`, calling `fetch` when fresh
    /// data is needed.
    ///
    /// Fetch failures propagate as [`CacheError::Fetch`] except under
    /// `NetworkFirst` with a cached fallback, and in the background refresh
    /// of `StaleWhileRevalidate`, where they are only logged. `CacheOnly`
    /// fails with [`CacheError::NotFound`] when nothing is cached.
    pub async fn with_strategy<T, F, Fut>(
        &self,
        key: &str,
        strategy: Strategy,
        fetch: F,
        options: CacheOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let started = Instant::now();

        let result = match strategy {
            Strategy::CacheFirst => self.cache_first(key, fetch, &options).await,
            Strategy::NetworkFirst => self.network_first(key, fetch, &options).await,
            Strategy::StaleWhileRevalidate => match self.get::<T>(key).await {
                Some(cached) => {
                    self.revalidate(key.to_string(), fetch, options);
                    Ok(cached)
                }
                None => self.fetch_and_store(key, fetch, &options).await,
            },
            Strategy::NetworkOnly => fetch().await.map_err(CacheError::Fetch),
            Strategy::CacheOnly => self
                .get::<T>(key)
                .await
                .ok_or_else(|| CacheError::NotFound(key.to_string())),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(key = %key, %strategy, elapsed_ms, "cache strategy completed"),
            Err(error) => {
                warn!(key = %key, %strategy, elapsed_ms, %error, "cache strategy failed")
            }
        }

        result
    }

    async fn cache_first<T, F, Fut>(&self, key: &str, fetch: F, options: &CacheOptions) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(cached) = self.get::<T>(key).await {
            return Ok(cached);
        }

        self.fetch_and_store(key, fetch, options).await
    }

    /// Fetches without consulting the cache and stores a successful result.
    async fn fetch_and_store<T, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        options: &CacheOptions,
    ) -> Result<T>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let value = fetch().await?;
        if let Some(json) = encode(key, &value) {
            self.set_value(key, json, options).await;
        }
        Ok(value)
    }

    async fn network_first<T, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        options: &CacheOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match fetch().await {
            Ok(value) => {
                if let Some(json) = encode(key, &value) {
                    self.set_value(key, json, options).await;
                }
                Ok(value)
            }
            Err(error) => match self.get::<T>(key).await {
                Some(cached) => {
                    warn!(key = %key, %error, "fetch failed, serving cached value");
                    Ok(cached)
                }
                None => Err(CacheError::Fetch(error)),
            },
        }
    }

    /// Refreshes `key` on a detached task.
    ///
    /// At most one refresh per key runs at a time; a request arriving while
    /// one is in flight is skipped.
    fn revalidate<T, F, Fut>(&self, key: String, fetch: F, options: CacheOptions)
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let Some(guard) = InFlightGuard::acquire(&self.in_flight, &key) else {
            debug!(key = %key, "revalidation already in flight");
            return;
        };

        let manager = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            match fetch().await {
                Ok(value) => {
                    if let Some(json) = encode(&key, &value) {
                        manager.set_value(key.as_str(), json, &options).await;
                        debug!(key = %key, "background revalidation stored");
                    }
                }
                Err(error) => {
                    warn!(key = %key, %error, "background revalidation failed");
                }
            }
        });
    }

    /// Number of background refreshes currently running.
    pub fn revalidations_in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    // == Sweep ==
    /// Starts the periodic expiry sweep. Calling it again while the sweep is
    /// running has no effect. Must be called within a tokio runtime.
    pub fn start_sweep(&self) {
        let mut slot = lock(&self.sweeper);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        *slot = Some(spawn_sweep_task(
            Arc::clone(&self.store),
            self.sweep_interval,
        ));
    }

    /// Stops the periodic sweep if it is running.
    pub fn stop_sweep(&self) {
        if let Some(handle) = lock(&self.sweeper).take() {
            handle.stop();
        }
    }

    pub fn is_sweeping(&self) -> bool {
        lock(&self.sweeper)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Marks a key as having a refresh in flight until dropped.
struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    fn acquire(keys: &Arc<Mutex<HashSet<String>>>, key: &str) -> Option<Self> {
        if !lock(keys).insert(key.to_string()) {
            return None;
        }
        Some(Self {
            keys: Arc::clone(keys),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(json) => Some(json),
        Err(error) => {
            warn!(key = %key, %error, "failed to serialize cache value");
            None
        }
    }
}
