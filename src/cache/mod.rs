//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, compression, tag
//! invalidation, importance-scored eviction and fetch strategies.

mod compression;
mod eviction;
mod item;
mod manager;
mod options;
mod stats;
mod store;
mod strategy;


// Re-export public types
pub use compression::Compressor;
pub use eviction::{importance_score, select_victim};
pub use item::{current_timestamp_ms, CacheItem, StoredValue};
pub use manager::CacheManager;
pub use options::{CacheOptions, Priority, Ttl, TtlTier};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use strategy::Strategy;

// == Public Constants ==
/// Serialized payloads larger than this many bytes are compressed
pub const COMPRESSION_THRESHOLD: usize = 1024;

/// gzip level used for stored payloads
pub const COMPRESSION_LEVEL: u32 = 6;
