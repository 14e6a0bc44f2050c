//! # LRU (Least Recently Used) Ranking
//!
//! Ranks keys purely by recency: every observed key moves to the front of a
//! doubly linked list and eviction candidates are taken from the back.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                        LruBatchCache<K>                                  │
//!   │                                                                          │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │                    Mutex<LruCore<K>>                               │ │
//!   │   │                                                                    │ │
//!   │   │   index: FxHashMap<K, SlotId>                                      │ │
//!   │   │                                                                    │ │
//!   │   │   list:  head ──► [3] ◄──► [2] ◄──► [1] ◄── tail                   │ │
//!   │   │                   MRU                LRU (evicted first)           │ │
//!   │   │                                                                    │ │
//!   │   │   stats: HitStats                                                  │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Method                      | Complexity | Notes                            |
//! |-----------------------------|------------|----------------------------------|
//! | `observe_access(keys)`      | O(n)       | Hit: move to front; miss: push   |
//! | `evict_candidates(k)`       | O(k)       | Pops from the back               |
//! | `cached_keys(k)`            | O(k)       | Walks from the front             |
//! | `size()`                    | O(1)       |                                  |
//!
//! Version and frequency hints passed to `observe_access_with_meta` carry no
//! recency information, so this policy applies them as a plain
//! `observe_access`. Snapshot entries report `freq = 0` and no version.
//!
//! ## Example Usage
//!
//! ```
//! use batchcache::policy::lru::LruBatchCache;
//! use batchcache::traits::BatchCache;
//!
//! let cache = LruBatchCache::new();
//! cache.observe_access(&[1u64, 2, 3]);
//!
//! let snapshot: Vec<u64> = cache.cached_keys(3).into_iter().map(|e| e.key).collect();
//! assert_eq!(snapshot, vec![3, 2, 1]);
//! assert_eq!(cache.evict_candidates(1), vec![1]);
//! ```
//!
//! ## Thread Safety
//!
//! - `LruCore`: not synchronized, `&mut self` API
//! - `LruBatchCache`: every operation takes the same `parking_lot::Mutex`

use std::fmt::{self, Debug};
use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::builder::CachePolicy;
use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
use crate::error::InvariantError;
use crate::stats::HitStats;
use crate::traits::{BatchCache, CachedKey, meta_prefix_len};

/// Unsynchronized LRU ranking state.
#[derive(Debug)]
pub struct LruCore<K>
where
    K: Copy + Eq + Hash,
{
    index: FxHashMap<K, SlotId>,
    list: IntrusiveList<K>,
    stats: HitStats,
}

impl<K> LruCore<K>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty core with room for `capacity` keys before the index
    /// or node arena reallocates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            list: IntrusiveList::with_capacity(capacity),
            stats: HitStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn stats(&self) -> HitStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Moves each key to the most-recent position, admitting unknown keys.
    pub fn observe(&mut self, keys: &[K]) {
        for &key in keys {
            match self.index.get(&key) {
                Some(&id) => {
                    self.list.move_to_front(id);
                    self.stats.record_hit();
                },
                None => {
                    let id = self.list.push_front(key);
                    self.index.insert(key, id);
                    self.stats.record_miss();
                },
            }
        }
    }

    /// Removes up to `k` least recently observed keys.
    pub fn evict(&mut self, k: usize) -> Vec<K> {
        let mut evicted = Vec::with_capacity(k.min(self.len()));
        while evicted.len() < k {
            let Some(key) = self.list.pop_back() else {
                break;
            };
            self.index.remove(&key);
            evicted.push(key);
        }
        evicted
    }

    /// Up to `k` keys, most recent first.
    pub fn snapshot(&self, k: usize) -> Vec<CachedKey<K>> {
        self.list.iter().take(k).copied().map(CachedKey::bare).collect()
    }

    /// Checks that the index and the recency list describe the same key set.
    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: Debug,
    {
        self.list.check_invariants()?;
        if self.index.len() != self.list.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys, list holds {}",
                self.index.len(),
                self.list.len()
            )));
        }
        for (key, &id) in &self.index {
            if self.list.get(id) != Some(key) {
                return Err(InvariantError::new(format!(
                    "key {:?} indexed at {:?} but the node holds {:?}",
                    key,
                    id,
                    self.list.get(id)
                )));
            }
        }
        Ok(())
    }
}

impl<K> Default for LruCore<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe LRU ranking policy.
pub struct LruBatchCache<K>
where
    K: Copy + Eq + Hash,
{
    inner: Mutex<LruCore<K>>,
}

impl<K> LruBatchCache<K>
where
    K: Copy + Eq + Hash,
{
    /// Creates an empty policy.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty policy with pre-allocated room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCore::with_capacity(capacity)),
        }
    }

    /// Runs the structural invariant checks under the lock.
    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: Debug,
    {
        self.inner.lock().check_invariants()
    }
}

impl<K> Default for LruBatchCache<K>
where
    K: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for LruBatchCache<K>
where
    K: Copy + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("LruBatchCache")
            .field("len", &core.len())
            .field("stats", &core.stats())
            .finish_non_exhaustive()
    }
}

impl<K> BatchCache<K> for LruBatchCache<K>
where
    K: Copy + Eq + Hash + Send,
{
    fn policy(&self) -> CachePolicy {
        CachePolicy::Lru
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
            policy = "lru",
            batch = keys.len(),
            hits = after.hits - before.hits,
            misses = after.misses - before.misses,
            "observed batch"
        );
    }

    fn observe_access_with_meta(&self, keys: &[K], versions: &[i64], freqs: &[u64]) {
        let n = meta_prefix_len(CachePolicy::Lru, keys, versions, freqs);
        self.observe_access(&keys[..n]);
    }

    fn evict_candidates(&self, k: usize) -> Vec<K> {
        let mut core = self.inner.lock();
        let evicted = core.evict(k);
        tracing::debug!(
            policy = "lru",
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
        tracing::debug!(policy = "lru", requested = k, returned = snapshot.len(), "snapshot");
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
