//! Per-call options accepted by `set` and the fetch strategies.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::TtlTiers;

/// Named TTL tier resolved against the configured tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtlTier {
    Short,
    Medium,
    Long,
    Day,
}

/// Either an explicit lifetime or a configured tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Exact(Duration),
    Tier(TtlTier),
}

impl Ttl {
    pub fn resolve(self, tiers: &TtlTiers) -> Duration {
        match self {
            Ttl::Exact(duration) => duration,
            Ttl::Tier(TtlTier::Short) => tiers.short,
            Ttl::Tier(TtlTier::Medium) => tiers.medium,
            Ttl::Tier(TtlTier::Long) => tiers.long,
            Ttl::Tier(TtlTier::Day) => tiers.day,
        }
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Exact(duration)
    }
}

impl From<TtlTier> for Ttl {
    fn from(tier: TtlTier) -> Self {
        Ttl::Tier(tier)
    }
}

/// Reserved: accepted but not consumed by eviction scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// Options for a single `set`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
    /// Lifetime; the medium tier when None
    pub ttl: Option<Ttl>,
    pub tags: HashSet<String>,
    /// Compress payloads above the threshold
    pub compress: bool,
    pub priority: Priority,
    /// Reserved: accepted, not enforced per item
    pub max_size: Option<u64>,
    pub metadata: Option<Value>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            tags: HashSet::new(),
            compress: true,
            priority: Priority::default(),
            max_size: None,
            metadata: None,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: impl Into<Ttl>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Lifetime to apply, falling back to the medium tier.
    pub fn resolved_ttl(&self, tiers: &TtlTiers) -> Duration {
        self.ttl
            .unwrap_or(Ttl::Tier(TtlTier::Medium))
            .resolve(tiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CacheOptions::default();
        assert!(options.compress);
        assert!(options.tags.is_empty());
        assert_eq!(options.priority, Priority::Normal);
        assert_eq!(options.resolved_ttl(&TtlTiers::default()), Duration::from_secs(300));
    }

    #[test]
    fn test_tier_resolution() {
        let tiers = TtlTiers::default();
        assert_eq!(
            CacheOptions::new().ttl(TtlTier::Day).resolved_ttl(&tiers),
            Duration::from_secs(86_400)
        );
        assert_eq!(
            CacheOptions::new()
                .ttl(Duration::from_millis(250))
                .resolved_ttl(&tiers),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_tags_are_a_set() {
        let options = CacheOptions::new().tag("events").tags(["events", "tenant:7"]);
        assert_eq!(options.tags.len(), 2);
    }

    #[test]
    fn test_tier_deserialize() {
        let tier: TtlTier = serde_json::from_str(r#""long""#).unwrap();
        assert_eq!(tier, TtlTier::Long);
    }
}
