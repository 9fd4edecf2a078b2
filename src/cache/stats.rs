//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions,
//! memory accounting and compression effectiveness.

use serde::Serialize;

// == Cache Stats ==
/// Aggregate counters for one cache instance.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CacheStats {
    /// Current number of live items
    pub total_items: usize,
    /// Sum of stored item sizes in bytes
    pub total_size: u64,
    /// Number of successful retrievals
    pub hit_count: u64,
    /// Number of failed retrievals (absent or expired)
    pub miss_count: u64,
    /// hit_count / (hit_count + miss_count), 0 before any access
    pub hit_rate: f64,
    /// Number of items removed by the eviction policy
    pub eviction_count: u64,
    /// Mean of compressed/original size ratios
    pub compression_ratio: f64,
    /// Number of compressions folded into `compression_ratio`
    #[serde(skip)]
    compressions: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hit_count += 1;
        self.refresh_hit_rate();
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.miss_count += 1;
        self.refresh_hit_rate();
    }

    // == Record Eviction ==
    pub fn record_eviction(&mut self) {
        self.eviction_count += 1;
    }

    // == Record Compression ==
    /// Folds one compressed/original ratio into the running mean.
    pub fn record_compression(&mut self, original: u64, compressed: u64) {
        if original == 0 {
            return;
        }
        let ratio = compressed as f64 / original as f64;
        self.compressions += 1;
        self.compression_ratio += (ratio - self.compression_ratio) / self.compressions as f64;
    }

    // == Item Accounting ==
    /// Accounts for a newly inserted item.
    pub fn add_item(&mut self, size: u64) {
        self.total_items += 1;
        self.total_size += size;
    }

    /// Accounts for a removed item.
    pub fn remove_item(&mut self, size: u64) {
        self.total_items = self.total_items.saturating_sub(1);
        self.total_size = self.total_size.saturating_sub(size);
    }

    /// Drops item accounting; access, eviction and compression history is kept.
    pub fn reset_items(&mut self) {
        self.total_items = 0;
        self.total_size = 0;
    }

    fn refresh_hit_rate(&mut self) {
        let total = self.hit_count + self.miss_count;
        self.hit_rate = if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        };
    }
}
