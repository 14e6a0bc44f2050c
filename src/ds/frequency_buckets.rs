//! Frequency bucket table for O(1) LFU ranking.
//!
//! Keys are grouped by access frequency into buckets. Frequencies up to
//! [`DENSE_BUCKET_LIMIT`] index a growable `Vec` directly, where bucket `i`
//! holds every key whose frequency is `i + 1`. Higher frequencies, which only
//! arrive through externally supplied counts, live in an ordered overflow map
//! with one bucket per populated frequency. Each bucket is a doubly linked
//! list of entries living in a shared [`SlotArena`]; new and refreshed
//! entries go to the front and eviction takes from the back, so ties at the
//! lowest frequency are broken by recency.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                        FrequencyBuckets<K> Layout                        │
//! │                                                                          │
//! │  index: FxHashMap<K, SlotId>        entries: SlotArena<Entry<K>>         │
//! │  ┌───────┬────────┐                 ┌──────┬─────────────────────────┐   │
//! │  │  Key  │ SlotId │                 │ Slot │ Entry                   │   │
//! │  ├───────┼────────┤                 ├──────┼─────────────────────────┤   │
//! │  │  101  │  id_0  │ ──────────────► │ id_0 │ freq:3, version, links  │   │
//! │  │  202  │  id_1  │ ──────────────► │ id_1 │ freq:1, version, links  │   │
//! │  │  303  │  id_2  │ ──────────────► │ id_2 │ freq:1, version, links  │   │
//! │  │  404  │  id_3  │ ──────────────► │ id_3 │ freq:2^40, links        │   │
//! │  └───────┴────────┘                 └──────┴─────────────────────────┘   │
//! │                                                                          │
//! │  buckets: Vec<Bucket>   (index = freq - 1, grown up to the dense limit)  │
//! │                                                                          │
//! │    [0] freq=1: head ──► [id_2] ◄──► [id_1] ◄── tail   ◄── min_freq       │
//! │    [1] freq=2: (empty)                                                   │
//! │    [2] freq=3: head ──► [id_0] ◄── tail                                  │
//! │                                                                          │
//! │  overflow: BTreeMap<u64, Bucket>   (freq > DENSE_BUCKET_LIMIT)           │
//! │                                                                          │
//! │    2^40: head ──► [id_3] ◄── tail                     ◄── max_freq       │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Operation       | Time          | Notes                                  |
//! |-----------------|---------------|----------------------------------------|
//! | `insert`        | O(1)*         | Seeds frequency, grows table if needed |
//! | `touch`         | O(1)*         | Frequency + 1, move to bucket front    |
//! | `add`           | O(Δ)          | Frequency + Δ, rescans for `min_freq`  |
//! | `pop_min`       | O(1) amort.   | Back of the `min_freq` bucket          |
//! | `iter_desc`     | O(n + table)  | Highest frequency first                |
//!
//! `*` amortized over table growth; O(log n) for overflow frequencies. The
//! rescan in `add` is bounded by the dense table plus the overflow map.
//!
//! ## Example Usage
//!
//! ```
//! use batchcache::ds::FrequencyBuckets;
//!
//! let mut freq = FrequencyBuckets::new();
//! freq.insert(1u64, 1, None);
//! freq.insert(2u64, 1, None);
//! freq.touch(&1);
//!
//! assert_eq!(freq.frequency(&1), Some(2));
//! assert_eq!(freq.pop_min(), Some((2, 1)));
//! ```
//!
//! ## Implementation Notes
//!
//! - `min_freq` and `max_freq` are `0` when the table is empty.
//! - The dense table never shrinks; emptied dense buckets stay allocated.
//!   Emptied overflow buckets are dropped.
//! - Frequencies saturate at `u64::MAX`.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

/// Default bucket pre-allocation for typical frequency distributions.
/// Most keys cluster at low frequencies, so 32 buckets covers most tables.
pub const DEFAULT_BUCKET_PREALLOC: usize = 32;

/// Highest frequency stored in the dense `Vec` table. Anything above goes to
/// the overflow map, so a supplied count never sizes an allocation.
pub const DENSE_BUCKET_LIMIT: u64 = 1 << 12;

#[derive(Debug)]
struct Entry<K> {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    freq: u64,
    version: Option<i64>,
    key: K,
}

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

/// Read-only view of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyBucketEntryMeta<'a, K> {
    pub key: &'a K,
    pub freq: u64,
    pub version: Option<i64>,
}

/// O(1) LFU tracker with a `Vec`-indexed bucket table and a sparse overflow
/// for very large frequencies.
///
/// # Example
///
/// ```
/// use batchcache::ds::FrequencyBuckets;
///
/// let mut freq = FrequencyBuckets::new();
/// freq.insert("a", 1, None);
/// freq.insert("b", 4, Some(7));
/// freq.add(&"a", 2, None);
///
/// assert_eq!(freq.frequency(&"a"), Some(3));
/// assert_eq!(freq.min_freq(), Some(3));
/// assert_eq!(freq.max_freq(), Some(4));
///
/// freq.add(&"a", u64::MAX, None);
/// assert_eq!(freq.max_freq(), Some(u64::MAX));
/// ```
#[derive(Debug)]
pub struct FrequencyBuckets<K> {
    entries: SlotArena<Entry<K>>,
    index: FxHashMap<K, SlotId>,
    buckets: Vec<Bucket>,
    overflow: BTreeMap<u64, Bucket>,
    min_freq: u64,
    max_freq: u64,
}

impl<K> FrequencyBuckets<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::with_capacity_and_bucket_hint(0, DEFAULT_BUCKET_PREALLOC)
    }

    /// Creates an empty tracker with reserved entry capacity and `bucket_hint`
    /// pre-allocated buckets (capped at [`DENSE_BUCKET_LIMIT`]).
    ///
    /// ```
    /// use batchcache::ds::FrequencyBuckets;
    ///
    /// let freq: FrequencyBuckets<u64> = FrequencyBuckets::with_capacity_and_bucket_hint(1024, 8);
    /// assert_eq!(freq.bucket_count(), 8);
    /// ```
    pub fn with_capacity_and_bucket_hint(capacity: usize, bucket_hint: usize) -> Self {
        let bucket_hint = bucket_hint.min(DENSE_BUCKET_LIMIT as usize);
        let mut buckets = Vec::with_capacity(bucket_hint);
        buckets.resize_with(bucket_hint, Bucket::default);
        Self {
            entries: SlotArena::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            buckets,
            overflow: BTreeMap::new(),
            min_freq: 0,
            max_freq: 0,
        }
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the current frequency for `key`, if tracked.
    #[inline]
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.entry(key).map(|meta| meta.freq)
    }

    /// Returns the tracked metadata for `key`.
    pub fn entry(&self, key: &K) -> Option<FrequencyBucketEntryMeta<'_, K>> {
        let id = *self.index.get(key)?;
        self.entries.get(id).map(|entry| FrequencyBucketEntryMeta {
            key: &entry.key,
            freq: entry.freq,
            version: entry.version,
        })
    }

    /// Lowest frequency with a nonempty bucket.
    pub fn min_freq(&self) -> Option<u64> {
        (self.min_freq != 0).then_some(self.min_freq)
    }

    /// Highest frequency with a nonempty bucket.
    pub fn max_freq(&self) -> Option<u64> {
        (self.max_freq != 0).then_some(self.max_freq)
    }

    /// Number of allocated dense buckets; grows monotonically.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Starts tracking `key` at frequency `freq` (clamped to at least 1).
    ///
    /// Returns `false` and leaves the table untouched if `key` is already
    /// tracked.
    pub fn insert(&mut self, key: K, freq: u64, version: Option<i64>) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        let freq = freq.max(1);
        self.ensure_bucket(freq);
        let id = self.entries.insert(Entry {
            prev: None,
            next: None,
            freq,
            version,
            key: key.clone(),
        });
        self.index.insert(key, id);

        self.list_push_front(freq, id);
        if self.min_freq == 0 || freq < self.min_freq {
            self.min_freq = freq;
        }
        self.max_freq = self.max_freq.max(freq);
        true
    }

    /// Increments the frequency of `key` by one and returns the new value.
    #[inline]
    pub fn touch(&mut self, key: &K) -> Option<u64> {
        self.add(key, 1, None)
    }

    /// Adds `delta` to the frequency of `key`, moving it to the front of its
    /// new bucket, and returns the new frequency.
    ///
    /// A `delta` of zero, or an addition that saturates at `u64::MAX`,
    /// refreshes the key's position within its bucket. `version`, when
    /// given, replaces the stored version.
    pub fn add(&mut self, key: &K, delta: u64, version: Option<i64>) -> Option<u64> {
        let id = *self.index.get(key)?;
        let old_freq = self.entries.get(id)?.freq;
        let new_freq = old_freq.saturating_add(delta);

        // Target bucket exists before the entry is unlinked from its old one.
        self.ensure_bucket(new_freq);
        self.list_remove(old_freq, id);
        if let Some(entry) = self.entries.get_mut(id) {
            entry.freq = new_freq;
            if version.is_some() {
                entry.version = version;
            }
        }
        self.list_push_front(new_freq, id);
        self.release_bucket(old_freq);
        self.max_freq = self.max_freq.max(new_freq);

        if self.min_freq == old_freq && self.bucket_len(old_freq) == 0 {
            self.min_freq = self.next_nonempty_from(old_freq.saturating_add(1));
        }
        Some(new_freq)
    }

    /// Removes and returns the eviction candidate `(key, freq)`: the back
    /// (least recently touched) entry of the lowest-frequency bucket.
    pub fn pop_min(&mut self) -> Option<(K, u64)> {
        let freq = self.min_freq;
        if freq == 0 {
            return None;
        }
        let id = self.bucket(freq)?.tail?;
        self.list_remove(freq, id);
        self.release_bucket(freq);
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry.key);

        if self.entries.is_empty() {
            self.min_freq = 0;
            self.max_freq = 0;
        } else if self.bucket_len(freq) == 0 {
            self.min_freq = self.next_nonempty_from(freq.saturating_add(1));
        }
        Some((entry.key, entry.freq))
    }

    /// Iterates entries from the highest frequency down, front to back within
    /// each bucket.
    pub fn iter_desc(&self) -> FrequencyBucketsDescIter<'_, K> {
        let current = self.bucket(self.max_freq).and_then(|bucket| bucket.head);
        FrequencyBucketsDescIter {
            buckets: self,
            freq: self.max_freq,
            current,
        }
    }

    #[inline]
    fn is_dense(freq: u64) -> bool {
        freq <= DENSE_BUCKET_LIMIT
    }

    #[inline]
    fn slot(freq: u64) -> usize {
        (freq - 1) as usize
    }

    fn bucket(&self, freq: u64) -> Option<&Bucket> {
        if freq == 0 {
            None
        } else if Self::is_dense(freq) {
            self.buckets.get(Self::slot(freq))
        } else {
            self.overflow.get(&freq)
        }
    }

    fn bucket_mut(&mut self, freq: u64) -> Option<&mut Bucket> {
        if freq == 0 {
            None
        } else if Self::is_dense(freq) {
            self.buckets.get_mut(Self::slot(freq))
        } else {
            self.overflow.get_mut(&freq)
        }
    }

    fn bucket_len(&self, freq: u64) -> usize {
        self.bucket(freq).map_or(0, |bucket| bucket.len)
    }

    fn ensure_bucket(&mut self, freq: u64) {
        if Self::is_dense(freq) {
            let needed = Self::slot(freq) + 1;
            if self.buckets.len() < needed {
                self.buckets.resize_with(needed, Bucket::default);
            }
        } else {
            self.overflow.entry(freq).or_default();
        }
    }

    /// Drops an emptied overflow bucket; dense buckets stay allocated.
    fn release_bucket(&mut self, freq: u64) {
        if !Self::is_dense(freq) && self.bucket_len(freq) == 0 {
            self.overflow.remove(&freq);
        }
    }

    fn next_nonempty_from(&self, from: u64) -> u64 {
        let dense_end = self.max_freq.min(DENSE_BUCKET_LIMIT);
        if let Some(freq) = (from.max(1)..=dense_end).find(|&freq| self.bucket_len(freq) > 0) {
            return freq;
        }
        let start = from.max(DENSE_BUCKET_LIMIT + 1);
        self.overflow
            .range(start..)
            .find(|(_, bucket)| bucket.len > 0)
            .map_or(0, |(&freq, _)| freq)
    }

    fn prev_nonempty_below(&self, below: u64) -> u64 {
        if below > DENSE_BUCKET_LIMIT + 1 {
            let found = self
                .overflow
                .range(..below)
                .rev()
                .find(|(_, bucket)| bucket.len > 0);
            if let Some((&freq, _)) = found {
                return freq;
            }
        }
        let top = below.saturating_sub(1).min(DENSE_BUCKET_LIMIT);
        (self.min_freq.max(1)..=top)
            .rev()
            .find(|&freq| self.bucket_len(freq) > 0)
            .unwrap_or(0)
    }

    fn list_push_front(&mut self, freq: u64, id: SlotId) {
        let Some(old_head) = self.bucket(freq).map(|bucket| bucket.head) else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(head_id) = old_head {
            if let Some(head) = self.entries.get_mut(head_id) {
                head.prev = Some(id);
            }
        }
        if let Some(bucket) = self.bucket_mut(freq) {
            if old_head.is_none() {
                bucket.tail = Some(id);
            }
            bucket.head = Some(id);
            bucket.len += 1;
        }
    }

    fn list_remove(&mut self, freq: u64, id: SlotId) {
        let (prev, next) = match self.entries.get(id) {
            Some(entry) => (entry.prev, entry.next),
            None => return,
        };
        if let Some(prev_id) = prev {
            if let Some(prev_entry) = self.entries.get_mut(prev_id) {
                prev_entry.next = next;
            }
        }
        if let Some(next_id) = next {
            if let Some(next_entry) = self.entries.get_mut(next_id) {
                next_entry.prev = prev;
            }
        }
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = None;
        }
        if let Some(bucket) = self.bucket_mut(freq) {
            if prev.is_none() {
                bucket.head = next;
            }
            if next.is_none() {
                bucket.tail = prev;
            }
            bucket.len = bucket.len.saturating_sub(1);
        }
    }

    /// Verifies bucket membership, link symmetry and the `min_freq`/`max_freq`
    /// bounds.
    pub fn check_invariants(&self) -> Result<(), InvariantError>
    where
        K: Debug,
    {
        if self.index.len() != self.entries.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys, arena holds {} entries",
                self.index.len(),
                self.entries.len()
            )));
        }

        let dense = self
            .buckets
            .iter()
            .enumerate()
            .map(|(slot, bucket)| (slot as u64 + 1, bucket));
        let overflow = self.overflow.iter().map(|(&freq, bucket)| (freq, bucket));

        let mut total = 0usize;
        let mut lowest = 0u64;
        let mut highest = 0u64;
        for (freq, bucket) in dense.chain(overflow) {
            if !Self::is_dense(freq) && bucket.len == 0 {
                return Err(InvariantError::new(format!(
                    "overflow bucket {} is empty but still allocated",
                    freq
                )));
            }
            let count = self.check_bucket(freq, bucket)?;
            if count > 0 {
                if lowest == 0 {
                    lowest = freq;
                }
                highest = freq;
            }
            total += count;
        }

        if total != self.entries.len() {
            return Err(InvariantError::new(format!(
                "buckets hold {} entries, arena holds {}",
                total,
                self.entries.len()
            )));
        }
        if lowest != self.min_freq || highest != self.max_freq {
            return Err(InvariantError::new(format!(
                "min/max freq {}/{} but nonempty buckets span {}/{}",
                self.min_freq, self.max_freq, lowest, highest
            )));
        }
        Ok(())
    }

    fn check_bucket(&self, freq: u64, bucket: &Bucket) -> Result<usize, InvariantError>
    where
        K: Debug,
    {
        let mut count = 0usize;
        let mut prev = None;
        let mut current = bucket.head;
        while let Some(id) = current {
            let entry = self.entries.get(id).ok_or_else(|| {
                InvariantError::new(format!("bucket {}: stale SlotId {:?}", freq, id))
            })?;
            if entry.freq != freq {
                return Err(InvariantError::new(format!(
                    "key {:?} has freq {} but sits in bucket {}",
                    entry.key, entry.freq, freq
                )));
            }
            if entry.prev != prev {
                return Err(InvariantError::new(format!(
                    "bucket {}: key {:?} prev link inconsistent",
                    freq, entry.key
                )));
            }
            if self.index.get(&entry.key) != Some(&id) {
                return Err(InvariantError::new(format!(
                    "key {:?} is not indexed at {:?}",
                    entry.key, id
                )));
            }
            count += 1;
            if count > self.entries.len() {
                return Err(InvariantError::new(format!("bucket {}: cycle detected", freq)));
            }
            prev = Some(id);
            current = entry.next;
        }
        if prev != bucket.tail {
            return Err(InvariantError::new(format!("bucket {}: tail mismatch", freq)));
        }
        if count != bucket.len {
            return Err(InvariantError::new(format!(
                "bucket {}: walked {} entries, len says {}",
                freq, count, bucket.len
            )));
        }
        Ok(count)
    }
}

impl<K> Default for FrequencyBuckets<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over entries from the highest frequency bucket downward.
pub struct FrequencyBucketsDescIter<'a, K> {
    buckets: &'a FrequencyBuckets<K>,
    freq: u64,
    current: Option<SlotId>,
}

impl<'a, K> Iterator for FrequencyBucketsDescIter<'a, K>
where
    K: Eq + Hash + Clone,
{
    type Item = FrequencyBucketEntryMeta<'a, K>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.current {
                let entry = self.buckets.entries.get(id)?;
                self.current = entry.next;
                return Some(FrequencyBucketEntryMeta {
                    key: &entry.key,
                    freq: entry.freq,
                    version: entry.version,
                });
            }
            if self.freq <= self.buckets.min_freq {
                return None;
            }
            self.freq = self.buckets.prev_nonempty_below(self.freq);
            if self.freq == 0 {
                return None;
            }
            self.current = self.buckets.bucket(self.freq).and_then(|bucket| bucket.head);
        }
    }
}
