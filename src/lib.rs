//! Cache Manager - An in-process, memory-bounded cache
//!
//! Provides TTL expiration, per-item compression, tag invalidation,
//! importance-scored eviction and cache/network fetch strategies, plus an
//! optional HTTP facade for inspection.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, CacheOptions, CacheStats, Strategy};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::{spawn_sweep_task, SweepHandle};
