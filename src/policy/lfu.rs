//! # LFU (Least Frequently Used) Ranking
//!
//! Ranks keys by access frequency, breaking ties by recency. Besides the
//! plain "one observation = one access" path, the policy accepts externally
//! recorded frequencies so a working set persisted at checkpoint time can be
//! restored, or merged from another shard, without losing its ranking.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                        LfuBatchCache<K>                                  │
//!   │                                                                          │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │                    Mutex<LfuCore<K>>                               │ │
//!   │   │                                                                    │ │
//!   │   │   FrequencyBuckets<K>                                              │ │
//!   │   │     freq=1: head ──► [k9] ◄──► [k4] ◄── tail  ◄── min_freq        │ │
//!   │   │     freq=2: (empty)                                                │ │
//!   │   │     freq=3: head ──► [k1] ◄── tail            ◄── max_freq        │ │
//!   │   │                                                                    │ │
//!   │   │   stats: HitStats                                                  │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Frequency Lifecycle
//!
//! ```text
//!   observe_access([k])             observe_access_with_meta([k], [v], [f])
//!        │                                   │
//!        ▼                                   ▼
//!   ┌───────────────┐  new key         ┌───────────────┐  new key
//!   │ freq = 1      │◄───────          │ freq = f      │◄───────  (f = 0 → 1)
//!   └───────────────┘                  └───────────────┘
//!        │ tracked key                       │ tracked key
//!        ▼                                   ▼
//!   ┌───────────────┐                  ┌───────────────┐
//!   │ freq += 1     │                  │ freq += f     │  cumulative merge
//!   └───────────────┘                  └───────────────┘
//!        │                                   │
//!        └──────────────┬────────────────────┘
//!                       ▼
//!           evict_candidates(k): back of min_freq bucket first
//! ```
//!
//! ## Operations
//!
//! | Method                        | Complexity   | Notes                        |
//! |-------------------------------|--------------|------------------------------|
//! | `observe_access(keys)`        | O(n)*        | Miss → bucket 1, hit → +1    |
//! | `observe_access_with_meta`    | O(n · Δ)     | Rescans forward for min_freq |
//! | `evict_candidates(k)`         | O(k)*        | Lowest freq, oldest first    |
//! | `cached_keys(k)`              | O(k + table) | Highest freq first           |
//!
//! `*` amortized over bucket table growth.
//!
//! ## Example Usage
//!
//! ```
//! use batchcache::policy::lfu::LfuBatchCache;
//! use batchcache::traits::BatchCache;
//!
//! let cache = LfuBatchCache::new();
//! cache.observe_access(&[1u64]);
//! cache.observe_access(&[2]);
//! cache.observe_access(&[1]);
//!
//! assert_eq!(cache.evict_candidates(1), vec![2]);
//!
//! // Restore a key from a checkpoint with its recorded frequency.
//! cache.observe_access_with_meta(&[7], &[3], &[10]);
//! let top = cache.cached_keys(1);
//! assert_eq!((top[0].key, top[0].freq, top[0].version), (7, 10, Some(3)));
//! ```
//!
//! ## Thread Safety
//!
//! - `LfuCore`: not synchronized, `&mut self` API
//! - `LfuBatchCache`: every operation takes the same `parking_lot::Mutex`

use std::fmt::{self, Debug};
use std::hash::Hash;

use parking_lot::Mutex;

use crate::builder::CachePolicy;
use crate::ds::frequency_buckets::{DEFAULT_BUCKET_PREALLOC, FrequencyBuckets};
use crate::error::InvariantError;
use crate::stats::HitStats;
use crate::traits::{BatchCache, CachedKey, meta_prefix_len};

/// Unsynchronized LFU ranking state.
#[derive(Debug)]
pub struct LfuCore<K>
where
    K: Copy + Eq + Hash,
{
    buckets: FrequencyBuckets<K>,
    stats: HitStats,
}

impl<K> LfuCore<K>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_capacity_and_bucket_hint(0, DEFAULT_BUCKET_PREALLOC)
    }

    /// Creates an empty core with room for `capacity` keys and `bucket_hint`
    /// pre-allocated frequency buckets.
    pub fn with_capacity_and_bucket_hint(capacity: usize, bucket_hint: usize) -> Self {
        Self {
            buckets: FrequencyBuckets::with_capacity_and_bucket_hint(capacity, bucket_hint),
            stats: HitStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.buckets.contains(key)
    }

    /// Current frequency of `key`, if tracked.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.buckets.frequency(key)
    }

    pub fn stats(&self) -> HitStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Counts one access per key: new keys enter at frequency 1, tracked keys
    /// move up one bucket.
    pub fn observe(&mut self, keys: &[K]) {
        for &key in keys {
            if self.buckets.touch(&key).is_some() {
                self.stats.record_hit();
            } else {
                self.buckets.insert(key, 1, None);
                self.stats.record_miss();
            }
        }
    }

    /// Merges externally supplied frequencies: new keys are seeded with
    /// `freq`, tracked keys gain `freq` on top of what they have.
    pub fn observe_with_meta(&mut self, keys: &[K], versions: &[i64], freqs: &[u64]) {
        for ((&key, &version), &freq) in keys.iter().zip(versions).zip(freqs) {
            if self.buckets.add(&key, freq, Some(version)).is_some() {
                self.stats.record_hit();
            } else {
                self.buckets.insert(key, freq, Some(version));
                self.stats.record_miss();
            }
        }
    }

    /// Removes up to `k` keys, lowest frequency first and least recently
    /// touched first within a frequency.
    pub fn evict(&mut self, k: usize) -> Vec<K> {
        let mut evicted = Vec::with_capacity(k.min(self.len()));
        while evicted.len() < k {
            let Some((key, _)) = self.buckets.pop_min() else {
                break;
            };
            evicted.push(key);
        }
        evicted
    }

    /// Up to `k` keys with their frequency and version, highest frequency
    /// first.
    pub fn snapshot(&self, k: usize) -> Vec<CachedKey<K>> {
        self.buckets
            .iter_desc()
            .take(k)
            .map(|meta| CachedKey {
                key: *meta.key,
                freq: meta.freq,
                version: meta.version,
            })
            .collect()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: Debug,
    {
        self.buckets.check_invariants()
    }
}

impl<K> Default for LfuCore<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe LFU ranking policy.
pub struct LfuBatchCache<K>
where
    K: Copy + Eq + Hash,
{
    inner: Mutex<LfuCore<K>>,
}

impl<K> LfuBatchCache<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty policy.
    pub fn new() -> Self {
        Self::with_capacity_and_bucket_hint(0, DEFAULT_BUCKET_PREALLOC)
    }

    /// Creates an empty policy with pre-allocated key and bucket storage.
    pub fn with_capacity_and_bucket_hint(capacity: usize, bucket_hint: usize) -> Self {
        Self {
            inner: Mutex::new(LfuCore::with_capacity_and_bucket_hint(capacity, bucket_hint)),
        }
    }

    /// Current frequency of `key`, if tracked. Does not count as an access.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.inner.lock().frequency(key)
    }

    /// Runs the structural invariant checks under the lock.
    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: Debug,
    {
        self.inner.lock().check_invariants()
    }
}

impl<K> Default for LfuBatchCache<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for LfuBatchCache<K>
where
    K: Copy + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("LfuBatchCache")
            .field("len", &core.len())
            .field("stats", &core.stats())
            .finish_non_exhaustive()
    }
}

impl<K> BatchCache<K> for LfuBatchCache<K>
where
    K: Copy + Eq + Hash + Send,
{
    fn policy(&self) -> CachePolicy {
        CachePolicy::Lfu
    }

    fn observe_access(&self, keys: &[K]) {
        if keys.is_empty() {
            return;
        }
        let mut core = self.inner.lock();
        let before = core.stats();
        core.observe(keys);
        let after = core.stats();
        tracing::trace!(
            policy = "lfu",
            batch = keys.len(),
            hits = after.hits - before.hits,
            misses = after.misses - before.misses,
            "observed batch"
        );
    }

    fn observe_access_with_meta(&self, keys: &[K], versions: &[i64], freqs: &[u64]) {
        let n = meta_prefix_len(CachePolicy::Lfu, keys, versions, freqs);
        if n == 0 {
            return;
        }
        let mut core = self.inner.lock();
        let before = core.stats();
        core.observe_with_meta(&keys[..n], &versions[..n], &freqs[..n]);
        let after = core.stats();
        tracing::trace!(
            policy = "lfu",
            batch = n,
            hits = after.hits - before.hits,
            misses = after.misses - before.misses,
            "merged batch with meta"
        );
    }

    fn evict_candidates(&self, k: usize) -> Vec<K> {
        let mut core = self.inner.lock();
        let evicted = core.evict(k);
        tracing::debug!(
            policy = "lfu",
            requested = k,
            evicted = evicted.len(),
            remaining = core.len(),
            "evicted candidates"
        );
        evicted
    }

    fn cached_keys(&self, k: usize) -> Vec<CachedKey<K>> {
        let core = self.inner.lock();
        let snapshot = core.snapshot(k);
        tracing::debug!(policy = "lfu", requested = k, returned = snapshot.len(), "snapshot");
        snapshot
    }

    fn size(&self) -> usize {
        self.inner.lock().len()
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    fn stats(&self) -> HitStats {
        self.inner.lock().stats()
    }

    fn reset_stats(&self) {
        self.inner.lock().reset_stats();
    }
}
