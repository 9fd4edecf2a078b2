//! Fetch strategies accepted by `CacheManager::with_strategy`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How much to trust cached data versus a fresh fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Cached value if live, otherwise fetch and store
    #[default]
    CacheFirst,
    /// Fetch and store, falling back to the cached value on failure
    NetworkFirst,
    /// Cached value now, refresh in the background
    StaleWhileRevalidate,
    /// Always fetch, never touch the cache
    NetworkOnly,
    /// Cached value or a not-found error
    CacheOnly,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cacheFirst",
            Strategy::NetworkFirst => "networkFirst",
            Strategy::StaleWhileRevalidate => "staleWhileRevalidate",
            Strategy::NetworkOnly => "networkOnly",
            Strategy::CacheOnly => "cacheOnly",
        }
    }

    /// Parses a strategy name. Unrecognised names fall back to `CacheFirst`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "cacheFirst" | "cache-first" | "cache_first" => Strategy::CacheFirst,
            "networkFirst" | "network-first" | "network_first" => Strategy::NetworkFirst,
            "staleWhileRevalidate" | "stale-while-revalidate" | "stale_while_revalidate" => {
                Strategy::StaleWhileRevalidate
            }
            "networkOnly" | "network-only" | "network_only" => Strategy::NetworkOnly,
            "cacheOnly" | "cache-only" | "cache_only" => Strategy::CacheOnly,
            other => {
                warn!(strategy = %other, "unknown cache strategy, using cacheFirst");
                Strategy::CacheFirst
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Strategy {
    fn from(name: &str) -> Self {
        Strategy::from_name(name)
    }
}
