//! Request DTOs for the cache HTTP facade
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{CacheOptions, Priority, TtlTier};

/// Maximum accepted key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds, takes precedence over `tier`
/// - `tier`: Optional named TTL tier (short, medium, long, day)
/// - `tags`: Tags for bulk invalidation
/// - `compress`: Whether large values may be compressed (default true)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub tier: Option<TtlTier>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub compress: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        if self.ttl == Some(0) {
            return Some("TTL must be at least one second".to_string());
        }
        None
    }

    /// Builds the cache options described by this request.
    pub fn options(&self) -> CacheOptions {
        let mut options = CacheOptions::new()
            .tags(self.tags.iter().cloned())
            .compress(self.compress.unwrap_or(true));

        if let Some(secs) = self.ttl {
            options = options.ttl(Duration::from_secs(secs));
        } else if let Some(tier) = self.tier {
            options = options.ttl(tier);
        }
        if let Some(priority) = self.priority {
            options = options.priority(priority);
        }
        if let Some(metadata) = &self.metadata {
            options = options.metadata(metadata.clone());
        }
        options
    }
}
