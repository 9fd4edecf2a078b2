//! Cache Item Module
//!
//! Defines the record stored for every live key.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;

// == Stored Value ==
/// The payload as it sits in the store, after any compression.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Uncompressed JSON value
    Plain(Value),
    /// Gzip-compressed JSON encoding
    Compressed(Vec<u8>),
}

impl StoredValue {
    /// Returns true if the payload was compressed on the way in.
    pub fn is_compressed(&self) -> bool {
        matches!(self, StoredValue::Compressed(_))
    }
}

// == Cache Item ==
/// Represents a single live key with its payload and bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheItem {
    pub key: String,
    pub value: StoredValue,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read (Unix milliseconds)
    pub last_accessed: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Successful reads since insertion
    pub access_count: u64,
    /// Byte size of `value` as stored
    pub size: u64,
    pub tags: HashSet<String>,
    /// Opaque side-channel data, never interpreted
    pub metadata: Option<Value>,
    /// Insertion sequence, used as iteration order for tie-breaks
    pub(crate) seq: u64,
}

impl CacheItem {
    // == Constructor ==
    /// Creates a new item expiring `ttl` from `now`.
    ///
    /// TTLs below one millisecond are clamped so that `expires_at` is always
    /// strictly after `created_at`.
    pub fn new(
        key: String,
        value: StoredValue,
        size: u64,
        ttl: Duration,
        tags: HashSet<String>,
        metadata: Option<Value>,
        now: u64,
    ) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        Self {
            key,
            value,
            created_at: now,
            last_accessed: now,
            expires_at: now.saturating_add(ttl_ms),
            access_count: 0,
            size,
            tags,
            metadata,
            seq: 0,
        }
    }

    // == Is Expired ==
    /// An item is logically absent once `now` is past `expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }

    /// Records a successful read.
    pub fn touch(&mut self, now: u64) {
        self.access_count += 1;
        self.last_accessed = now;
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self, now: u64) -> Duration {
        Duration::from_millis(self.expires_at.saturating_sub(now))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(ttl: Duration, now: u64) -> CacheItem {
        CacheItem::new(
            "event:1".to_string(),
            StoredValue::Plain(json!({"title": "Launch"})),
            18,
            ttl,
            HashSet::from(["events".to_string()]),
            None,
            now,
        )
    }

    #[test]
    fn test_item_creation() {
        let item = item(Duration::from_secs(60), 1_000);

        assert_eq!(item.created_at, 1_000);
        assert_eq!(item.last_accessed, 1_000);
        assert_eq!(item.expires_at, 61_000);
        assert_eq!(item.access_count, 0);
        assert!(item.has_tag("events"));
        assert!(!item.value.is_compressed());
    }

    #[test]
    fn test_zero_ttl_is_clamped() {
        let item = item(Duration::ZERO, 5_000);
        assert!(item.expires_at > item.created_at);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let item = item(Duration::from_millis(10), 100);

        // Expiry is strictly after expires_at
        assert!(!item.is_expired_at(110));
        assert!(item.is_expired_at(111));
    }

    #[test]
    fn test_touch_updates_counters() {
        let mut item = item(Duration::from_secs(60), 100);
        item.touch(150);
        item.touch(175);

        assert_eq!(item.access_count, 2);
        assert_eq!(item.last_accessed, 175);
        assert_eq!(item.created_at, 100);
    }

    #[test]
    fn test_ttl_remaining() {
        let item = item(Duration::from_secs(10), 0);

        assert_eq!(item.ttl_remaining(4_000), Duration::from_secs(6));
        assert_eq!(item.ttl_remaining(20_000), Duration::ZERO);
    }

    #[test]
    fn test_live_item_not_expired_against_clock() {
        let now = current_timestamp_ms();
        let item = item(Duration::from_secs(60), now);
        assert!(!item.is_expired_at(current_timestamp_ms()));
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_wrapping() {
        // 18446744073709552 s is just over u64::MAX milliseconds
        let now = 1_700_000_000_000;
        let item = item(Duration::from_secs(18_446_744_073_709_552), now);

        assert_eq!(item.expires_at, u64::MAX);
        assert!(!item.is_expired_at(now + 500));
        assert!(item.ttl_remaining(now) > Duration::from_secs(365 * 86_400));
    }
}
