//! Eviction Policy Module
//!
//! Importance scoring and victim selection for memory-bounded eviction.
//!
//! The score blends frequency, age, size and recency:
//!
//! ```text
//! score = 10 * access_count
//!       + max(0, 1000 - age_ms / 1000)
//!       + max(0, 1000 - size_bytes / 1000)
//!       + max(0, 1000 - idle_ms / 1000)
//! ```
//!
//! Lower scores are evicted first.

use crate::cache::CacheItem;

const ACCESS_WEIGHT: f64 = 10.0;
const COMPONENT_CEILING: f64 = 1000.0;

// == Importance Score ==
/// Computes how much an item is worth keeping at time `now`.
pub fn importance_score(item: &CacheItem, now: u64) -> f64 {
    let age_ms = now.saturating_sub(item.created_at) as f64;
    let idle_ms = now.saturating_sub(item.last_accessed) as f64;

    ACCESS_WEIGHT * item.access_count as f64
        + (COMPONENT_CEILING - age_ms / 1000.0).max(0.0)
        + (COMPONENT_CEILING - item.size as f64 / 1000.0).max(0.0)
        + (COMPONENT_CEILING - idle_ms / 1000.0).max(0.0)
}

// == Select Victim ==
/// Picks the item with the lowest score.
///
/// Ties go to the item inserted first, so the result does not depend on
/// hash map iteration order.
pub fn select_victim<'a, I>(items: I, now: u64) -> Option<(&'a CacheItem, f64)>
where
    I: IntoIterator<Item = &'a CacheItem>,
{
    let mut victim: Option<(&CacheItem, f64)> = None;

    for item in items {
        let score = importance_score(item, now);
        let replace = match victim {
            None => true,
            Some((best, best_score)) => {
                score < best_score || (score == best_score && item.seq < best.seq)
            }
        };
        if replace {
            victim = Some((item, score));
        }
    }

    victim
}
