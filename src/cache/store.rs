//! Cache Store Module
//!
//! Main cache engine: item map, memory accounting, compression, eviction and
//! TTL expiration. All operations are synchronous; sharing is done by
//! [`CacheManager`](crate::cache::CacheManager).

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::eviction::select_victim;
use crate::cache::item::current_timestamp_ms;
use crate::cache::{
    CacheItem, CacheOptions, CacheStats, Compressor, StoredValue, COMPRESSION_LEVEL,
    COMPRESSION_THRESHOLD,
};
use crate::config::{Config, TtlTiers};

// == Cache Store ==
/// Memory-bounded item store with importance-scored eviction.
#[derive(Debug)]
pub struct CacheStore {
    /// Live items by key
    items: HashMap<String, CacheItem>,
    /// Performance statistics and memory accounting
    stats: CacheStats,
    compressor: Compressor,
    /// Memory bound in bytes, None = unbounded
    max_memory: Option<u64>,
    ttl: TtlTiers,
    /// Next insertion sequence number
    next_seq: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore.
    ///
    /// # Arguments
    /// * `max_memory` - Memory bound in bytes, None disables eviction
    /// * `ttl` - Tiers used to resolve TTLs; medium is the default lifetime
    pub fn new(max_memory: Option<u64>, ttl: TtlTiers) -> Self {
        Self {
            items: HashMap::new(),
            stats: CacheStats::new(),
            compressor: Compressor::new(COMPRESSION_LEVEL),
            max_memory,
            ttl,
            next_seq: 0,
        }
    }

    /// Creates a store from application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_memory, config.ttl)
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired items are removed and counted as misses. Hits bump the item's
    /// access counter and last-access time. Exactly one of hit or miss is
    /// recorded per call.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = current_timestamp_ms();

        let Some(item) = self.items.get_mut(key) else {
            self.stats.record_miss();
            return None;
        };

        if item.is_expired_at(now) {
            self.remove_entry(key);
            self.stats.record_miss();
            debug!(key = %key, "cache miss (expired)");
            return None;
        }

        let decoded = match &item.value {
            StoredValue::Plain(value) => Ok(value.clone()),
            StoredValue::Compressed(bytes) => self
                .compressor
                .decompress(bytes)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_slice(&raw).map_err(|e| e.to_string())),
        };

        match decoded {
            Ok(value) => {
                item.touch(now);
                self.stats.record_hit();
                Some(value)
            }
            Err(error) => {
                warn!(key = %key, %error, "dropping undecodable cache item");
                self.remove_entry(key);
                self.stats.record_miss();
                None
            }
        }
    }

    // == Set ==
    /// Stores a value.
    ///
    /// Payloads larger than [`COMPRESSION_THRESHOLD`] are gzip-compressed when
    /// `options.compress` is set; a compression failure stores the plain value.
    /// Space is made before the previous item under `key`, if any, is replaced.
    /// Replacement resets creation time and access counters.
    pub fn set(&mut self, key: String, value: Value, options: &CacheOptions) {
        let encoded = match serde_json::to_vec(&value) {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(key = %key, %error, "failed to serialize cache value, skipping set");
                return;
            }
        };
        let original_size = encoded.len() as u64;

        let (stored, size) = if options.compress && encoded.len() > COMPRESSION_THRESHOLD {
            match self.compressor.compress(&encoded) {
                Ok(compressed) => {
                    let compressed_size = compressed.len() as u64;
                    self.stats.record_compression(original_size, compressed_size);
                    debug!(
                        key = %key,
                        original_size,
                        compressed_size,
                        "compressed cache value"
                    );
                    (StoredValue::Compressed(compressed), compressed_size)
                }
                Err(error) => {
                    warn!(key = %key, %error, "compression failed, storing uncompressed");
                    (StoredValue::Plain(value), original_size)
                }
            }
        } else {
            (StoredValue::Plain(value), original_size)
        };

        self.ensure_space(size);

        if self.remove_entry(&key).is_some() {
            debug!(key = %key, "replacing existing cache item");
        }

        let ttl = options.resolved_ttl(&self.ttl);
        let mut item = CacheItem::new(
            key.clone(),
            stored,
            size,
            ttl,
            options.tags.clone(),
            options.metadata.clone(),
            current_timestamp_ms(),
        );
        item.seq = self.next_seq;
        self.next_seq += 1;

        self.stats.add_item(size);
        self.items.insert(key.clone(), item);

        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        debug!(key = %key, size, ttl_ms, "cache set");
        self.check_invariants();
    }

    // == Delete ==
    /// Removes an item by key. Absent keys are a silent no-op.
    pub fn delete(&mut self, key: &str) {
        if self.remove_entry(key).is_some() {
            debug!(key = %key, "cache delete");
        }
        self.check_invariants();
    }

    // == Delete By Tag ==
    /// Removes every item carrying `tag`, returning how many were removed.
    pub fn delete_by_tag(&mut self, tag: &str) -> usize {
        let tagged: Vec<String> = self
            .items
            .values()
            .filter(|item| item.has_tag(tag))
            .map(|item| item.key.clone())
            .collect();

        for key in &tagged {
            self.delete(key);
        }

        info!(tag = %tag, removed = tagged.len(), "cache invalidated by tag");
        tagged.len()
    }

    // == Clear ==
    /// Drops all items. Hit, miss, eviction and compression history is kept.
    pub fn clear(&mut self) {
        let removed = self.items.len();
        self.items.clear();
        self.stats.reset_items();
        info!(removed, "cache cleared");
    }

    // == Has ==
    /// Checks for a live item without touching access counters or stats.
    pub fn has(&mut self, key: &str) -> bool {
        let now = current_timestamp_ms();
        match self.items.get(key) {
            Some(item) if item.is_expired_at(now) => {
                self.remove_entry(key);
                debug!(key = %key, "removed expired item on has");
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    // == Keys ==
    /// Returns all stored keys, including expired items not yet discovered.
    pub fn keys(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    // == Size ==
    /// Returns the total stored size in bytes.
    pub fn size(&self) -> u64 {
        self.stats.total_size
    }

    // == Stats ==
    /// Returns a snapshot of current statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    /// Returns a stored item without touching counters.
    pub fn peek(&self, key: &str) -> Option<&CacheItem> {
        self.items.get(key)
    }

    /// Remaining lifetime of a live item.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = current_timestamp_ms();
        self.items
            .get(key)
            .filter(|item| !item.is_expired_at(now))
            .map(|item| item.ttl_remaining(now))
    }

    // == Length ==
    /// Returns the current number of items in the cache.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // == Cleanup Expired ==
    /// Removes all expired items.
    ///
    /// Returns the number of items removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .items
            .values()
            .filter(|item| item.is_expired_at(now))
            .map(|item| item.key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.check_invariants();
        expired_keys.len()
    }

    // == Ensure Space ==
    /// Evicts items until `required` more bytes fit under the memory bound.
    ///
    /// Stops early when nothing is left to evict, in which case the caller's
    /// insert may exceed the bound.
    pub fn ensure_space(&mut self, required: u64) {
        let Some(limit) = self.max_memory else {
            return;
        };

        while self.stats.total_size + required > limit {
            if !self.evict_item() {
                debug!(required, limit, "no eviction candidate left");
                break;
            }
        }
    }

    // == Evict Item ==
    /// Evicts the lowest-scoring item. Returns false on an empty store.
    pub fn evict_item(&mut self) -> bool {
        let now = current_timestamp_ms();
        let Some((key, score)) =
            select_victim(self.items.values(), now).map(|(item, score)| (item.key.clone(), score))
        else {
            return false;
        };

        self.remove_entry(&key);
        self.stats.record_eviction();
        info!(key = %key, score, "evicted cache item");
        true
    }

    fn remove_entry(&mut self, key: &str) -> Option<CacheItem> {
        let removed = self.items.remove(key)?;
        self.stats.remove_item(removed.size);
        Some(removed)
    }

    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        let live: u64 = self.items.values().map(|item| item.size).sum();
        debug_assert_eq!(live, self.stats.total_size, "total_size drifted from items");
        debug_assert_eq!(self.items.len(), self.stats.total_items, "total_items drifted");
    }

    #[cfg(not(debug_assertions))]
    fn check_invariants(&self) {}
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    fn store() -> CacheStore {
        CacheStore::new(None, TtlTiers::default())
    }

    fn plain() -> CacheOptions {
        CacheOptions::new().compress(false)
    }

    /// Payload whose compact JSON encoding is exactly `len` bytes.
    fn payload(len: usize) -> Value {
        Value::String("x".repeat(len - 2))
    }

    #[test]
    fn test_store_new() {
        let store = store();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store();

        store.set("event:1".to_string(), json!({"name": "Summit"}), &plain());
        let value = store.get("event:1").unwrap();

        assert_eq!(value, json!({"name": "Summit"}));
        assert_eq!(store.len(), 1);
        assert_eq!(store.size(), r#"{"name":"Summit"}"#.len() as u64);
    }

    #[test]
    fn test_get_updates_access_counters_only() {
        let mut store = store();
        store.set("k".to_string(), json!(1), &plain());

        store.get("k");
        store.get("k");
        assert!(store.has("k"));

        let item = store.peek("k").unwrap();
        assert_eq!(item.access_count, 2);
        assert_eq!(store.stats().hit_count, 2);
    }

    #[test]
    fn test_hit_miss_accounting() {
        let mut store = store();

        assert!(store.get("k").is_none());
        store.set("k".to_string(), json!("v"), &plain());
        assert!(store.get("k").is_some());

        let stats = store.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn test_has_does_not_affect_stats() {
        let mut store = store();
        store.set("k".to_string(), json!("v"), &plain());

        assert!(store.has("k"));
        assert!(!store.has("missing"));

        let stats = store.stats();
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.miss_count, 0);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut store = store();
        store.set("k".to_string(), json!("v"), &plain());

        store.delete("missing");
        assert_eq!(store.len(), 1);

        store.delete("k");
        assert!(store.is_empty());
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_replacement_resets_item() {
        let mut store = store();
        store.set("k".to_string(), json!("old"), &plain());
        store.get("k");

        store.set("k".to_string(), json!("new"), &plain());

        let item = store.peek("k").unwrap();
        assert_eq!(item.access_count, 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.size(), 5);
        assert_eq!(store.get("k"), Some(json!("new")));
    }

    #[test]
    fn test_identical_set_is_zero_delta() {
        let mut store = store();
        let options = CacheOptions::new().tag("events");

        store.set("k".to_string(), json!({"seats": 120}), &options);
        let before = store.stats();
        store.set("k".to_string(), json!({"seats": 120}), &options);
        let after = store.stats();

        assert_eq!(before.total_items, after.total_items);
        assert_eq!(before.total_size, after.total_size);
    }

    #[test]
    fn test_ttl_expiration() {
        let mut store = store();
        store.set(
            "k".to_string(),
            json!("v"),
            &plain().ttl(Duration::from_millis(10)),
        );

        assert!(store.has("k"));
        sleep(Duration::from_millis(30));

        assert!(!store.has("k"));
        assert!(store.get("k").is_none());
        assert!(!store.keys().contains(&"k".to_string()));
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_expired_get_counts_miss() {
        let mut store = store();
        store.set(
            "k".to_string(),
            json!("v"),
            &plain().ttl(Duration::from_millis(5)),
        );
        sleep(Duration::from_millis(20));

        assert!(store.get("k").is_none());
        assert_eq!(store.stats().miss_count, 1);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_delete_by_tag() {
        let mut store = store();
        store.set("a".to_string(), json!(1), &plain().tag("t"));
        store.set("b".to_string(), json!(2), &plain().tag("t"));
        store.set("c".to_string(), json!(3), &plain());

        assert_eq!(store.delete_by_tag("t"), 2);
        assert_eq!(store.keys(), vec!["c".to_string()]);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_clear_keeps_history() {
        let mut store = CacheStore::new(Some(20), TtlTiers::default());
        store.set("a".to_string(), payload(15), &plain());
        store.set("b".to_string(), payload(15), &plain());
        store.get("b");
        store.get("missing");

        store.clear();

        let stats = store.stats();
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.eviction_count, 1);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_compression_above_threshold() {
        let mut store = store();
        let value = json!({"description": "seat ".repeat(600)});
        let original = serde_json::to_vec(&value).unwrap().len() as u64;

        store.set("big".to_string(), value.clone(), &CacheOptions::new());

        let item = store.peek("big").unwrap();
        assert!(item.value.is_compressed());
        assert!(item.size < original);
        assert_eq!(store.size(), item.size);

        let stats = store.stats();
        assert!(stats.compression_ratio > 0.0 && stats.compression_ratio < 1.0);

        assert_eq!(store.get("big"), Some(value));
    }

    #[test]
    fn test_compression_disabled_or_below_threshold() {
        let mut store = store();
        let big = json!("y".repeat(4096));

        store.set("opt_out".to_string(), big, &plain());
        store.set("small".to_string(), json!("tiny"), &CacheOptions::new());

        assert!(!store.peek("opt_out").unwrap().value.is_compressed());
        assert!(!store.peek("small").unwrap().value.is_compressed());
        assert_eq!(store.stats().compression_ratio, 0.0);
    }

    #[test]
    fn test_corrupt_compressed_item_is_dropped() {
        let mut store = store();
        store.set("k".to_string(), json!("v"), &plain());
        if let Some(item) = store.items.get_mut("k") {
            item.value = StoredValue::Compressed(b"garbage".to_vec());
        }

        assert!(store.get("k").is_none());
        assert_eq!(store.stats().miss_count, 1);
        assert!(store.is_empty());
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_eviction_keeps_total_under_bound() {
        let mut store = CacheStore::new(Some(100), TtlTiers::default());

        for i in 0..10 {
            store.set(format!("k{}", i), payload(30), &plain());
            assert!(store.size() <= 100);
        }

        assert_eq!(store.len(), 3);
        assert_eq!(store.stats().eviction_count, 7);
    }

    #[test]
    fn test_eviction_prefers_unread_items() {
        let mut store = CacheStore::new(Some(100), TtlTiers::default());
        store.set("read".to_string(), payload(40), &plain());
        store.set("unread".to_string(), payload(40), &plain());
        store.get("read");

        store.set("new".to_string(), payload(40), &plain());

        assert!(store.has("read"));
        assert!(!store.has("unread"));
        assert!(store.has("new"));
    }

    #[test]
    fn test_eviction_tie_breaks_by_insertion() {
        let mut store = CacheStore::new(Some(60), TtlTiers::default());
        store.set("first".to_string(), payload(20), &plain());
        store.set("second".to_string(), payload(20), &plain());
        store.set("third".to_string(), payload(20), &plain());

        store.set("fourth".to_string(), payload(20), &plain());

        assert!(!store.has("first"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_oversized_item_still_inserted() {
        let mut store = CacheStore::new(Some(10), TtlTiers::default());
        store.set("small".to_string(), payload(5), &plain());

        store.set("huge".to_string(), payload(50), &plain());

        // Nothing left to evict, bound is exceeded by the new item
        assert_eq!(store.keys(), vec!["huge".to_string()]);
        assert_eq!(store.size(), 50);
        assert_eq!(store.stats().eviction_count, 1);
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let mut store = store();
        for i in 0..50 {
            store.set(format!("k{}", i), payload(1000), &plain());
        }
        assert_eq!(store.len(), 50);
        assert_eq!(store.stats().eviction_count, 0);
    }

    #[test]
    fn test_cleanup_expired() {
        let mut store = store();
        store.set(
            "short".to_string(),
            json!(1),
            &plain().ttl(Duration::from_millis(10)),
        );
        store.set("long".to_string(), json!(2), &plain());

        sleep(Duration::from_millis(30));

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.size(), 1);
        assert!(store.has("long"));
    }

    #[test]
    fn test_ttl_remaining() {
        let mut store = store();
        store.set(
            "k".to_string(),
            json!(1),
            &plain().ttl(Duration::from_secs(10)),
        );

        let remaining = store.ttl_remaining("k").unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));
        assert!(store.ttl_remaining("missing").is_none());
    }

    #[test]
    fn test_metadata_is_kept_verbatim() {
        let mut store = store();
        let options = plain().metadata(json!({"tenant": 7}));
        store.set("k".to_string(), json!(1), &options);

        assert_eq!(store.peek("k").unwrap().metadata, Some(json!({"tenant": 7})));
    }
}
