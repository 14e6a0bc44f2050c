//! # Ranking Policy Contract
//!
//! Every eviction-ranking policy implements [`BatchCache`], so the storage
//! manager that owns embedding values can drive LRU and LFU through the same
//! trait object.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │               BatchCache<K>                  │
//!                    │                                              │
//!                    │  observe_access(&[K])                        │
//!                    │  observe_access_with_meta(&[K], &[i64], &[u64])
//!                    │  evict_candidates(k) → Vec<K>   (destructive)│
//!                    │  cached_keys(k) → Vec<CachedKey<K>>          │
//!                    │  size / contains / stats / reset_stats       │
//!                    │  stats_summary() → String                    │
//!                    └──────────────────────┬───────────────────────┘
//!                                           │
//!                    ┌──────────────────────┴───────────────────────┐
//!                    ▼                                              ▼
//!      ┌────────────────────────────┐             ┌────────────────────────────┐
//!      │  LruBatchCache<K>          │             │  LfuBatchCache<K>          │
//!      │  Mutex<LruCore<K>>         │             │  Mutex<LfuCore<K>>         │
//!      │  recency list + index      │             │  frequency buckets + index │
//!      └────────────────────────────┘             └────────────────────────────┘
//! ```
//!
//! ## Call Pattern
//!
//! | Caller event                  | Operation                     |
//! |-------------------------------|-------------------------------|
//! | Lookup / ingestion batch      | `observe_access`              |
//! | Checkpoint reload / merge     | `observe_access_with_meta`    |
//! | Memory-pressure sweep         | `evict_candidates(k)`         |
//! | Checkpoint                    | `cached_keys(k)`              |
//! | Periodic logging              | `size`, `stats_summary`       |
//!
//! ## Thread Safety
//!
//! All methods take `&self`. Implementations serialize every call, reads
//! included, through one exclusive lock per instance; a batch is applied as
//! a single critical section.
//!
//! ## Example Usage
//!
//! ```
//! use batchcache::builder::{BatchCacheBuilder, CachePolicy};
//! use batchcache::traits::BatchCache;
//!
//! fn sweep(cache: &dyn BatchCache<u64>, budget: usize) -> Vec<u64> {
//!     let excess = cache.size().saturating_sub(budget);
//!     cache.evict_candidates(excess)
//! }
//!
//! let cache = BatchCacheBuilder::new().build::<u64>(CachePolicy::Lru);
//! cache.observe_access(&[1, 2, 3, 4]);
//! assert_eq!(sweep(cache.as_ref(), 2), vec![1, 2]);
//! assert_eq!(cache.size(), 2);
//! ```

use crate::builder::CachePolicy;
use crate::stats::HitStats;

/// One entry of a working-set snapshot returned by
/// [`BatchCache::cached_keys`].
///
/// `freq` is `0` and `version` is `None` for policies that do not track them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CachedKey<K> {
    pub key: K,
    pub freq: u64,
    pub version: Option<i64>,
}

impl<K> CachedKey<K> {
    /// Snapshot entry that carries no frequency or version.
    pub fn bare(key: K) -> Self {
        Self {
            key,
            freq: 0,
            version: None,
        }
    }
}

/// Batch-oriented eviction ranking over keys of type `K`.
///
/// Implementations are internally synchronized and may be shared across
/// threads behind an `Arc`.
pub trait BatchCache<K>: Send + Sync {
    /// Which policy ranks this instance.
    fn policy(&self) -> CachePolicy;

    /// Marks every key in `keys` as just accessed, in batch order.
    ///
    /// Tracked keys count as hits, new keys as misses. An empty batch is a
    /// no-op.
    fn observe_access(&self, keys: &[K]);

    /// Replays keys together with externally recorded versions and
    /// frequency deltas, e.g. after a checkpoint reload.
    ///
    /// `keys`, `versions` and `freqs` are parallel slices; only their common
    /// prefix is applied. Versions never influence ranking.
    fn observe_access_with_meta(&self, keys: &[K], versions: &[i64], freqs: &[u64]);

    /// Removes up to `k` of the least valuable keys and returns them, most
    /// evictable first.
    fn evict_candidates(&self, k: usize) -> Vec<K>;

    /// Returns up to `k` tracked keys from most to least valuable without
    /// changing ranking or counters.
    fn cached_keys(&self, k: usize) -> Vec<CachedKey<K>>;

    /// Number of tracked keys.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns `true` if `key` is tracked. Does not count as an access.
    fn contains(&self, key: &K) -> bool;

    /// Copy of the hit/miss counters.
    fn stats(&self) -> HitStats;

    /// Zeroes the hit/miss counters.
    fn reset_stats(&self);

    /// Human-readable hit rate, visit count and hit count.
    fn stats_summary(&self) -> String {
        self.stats().to_string()
    }
}

/// Length of the prefix shared by the parallel meta slices, warning when
/// they differ in length.
pub(crate) fn meta_prefix_len<K>(
    policy: CachePolicy,
    keys: &[K],
    versions: &[i64],
    freqs: &[u64],
) -> usize {
    if keys.len() != versions.len() || keys.len() != freqs.len() {
        tracing::warn!(
            %policy,
            keys = keys.len(),
            versions = versions.len(),
            freqs = freqs.len(),
            "meta slices differ in length; applying common prefix"
        );
    }
    keys.len().min(versions.len()).min(freqs.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_cached_key_has_no_meta() {
        let entry = CachedKey::bare(42u64);
        assert_eq!(entry.key, 42);
        assert_eq!(entry.freq, 0);
        assert_eq!(entry.version, None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn cached_key_serializes_for_checkpoints() {
        let entry = CachedKey {
            key: 7u64,
            freq: 3,
            version: Some(12),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"key":7,"freq":3,"version":12}"#);
        let back: CachedKey<u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn meta_prefix_is_shortest_slice() {
        assert_eq!(meta_prefix_len(CachePolicy::Lru, &[1u64, 2, 3], &[0, 0, 0], &[1, 1, 1]), 3);
        assert_eq!(meta_prefix_len(CachePolicy::Lru, &[1u64, 2, 3], &[0, 0], &[1, 1, 1]), 2);
        assert_eq!(meta_prefix_len(CachePolicy::Lfu, &[1u64], &[0, 0], &[1, 1, 1]), 1);
        assert_eq!(meta_prefix_len::<u64>(CachePolicy::Lfu, &[], &[0], &[]), 0);
    }

    #[test]
    fn trait_is_object_safe() {
        fn assert_object(_: Option<&dyn BatchCache<u64>>) {}
        assert_object(None);
    }
}
