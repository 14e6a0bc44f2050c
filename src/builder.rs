//! Unified builder for ranking policies.
//!
//! Storage managers usually pick the policy from configuration, so the
//! builder hands back a `BatchCache<K>` trait object and hides which concrete
//! type is underneath.
//!
//! ## Example
//!
//! ```rust
//! use batchcache::builder::{BatchCacheBuilder, CachePolicy};
//!
//! let cache = BatchCacheBuilder::new()
//!     .capacity_hint(1 << 16)
//!     .build::<u64>(CachePolicy::Lfu);
//! cache.observe_access(&[1, 2, 2]);
//! assert_eq!(cache.evict_candidates(1), vec![1]);
//!
//! let named = BatchCacheBuilder::new().try_build_named::<u64>("LRU").unwrap();
//! assert_eq!(named.policy(), CachePolicy::Lru);
//! ```

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use crate::ds::frequency_buckets::DEFAULT_BUCKET_PREALLOC;
use crate::error::ConfigError;
use crate::policy::lfu::LfuBatchCache;
use crate::policy::lru::LruBatchCache;
use crate::traits::BatchCache;

/// Available ranking policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CachePolicy {
    /// Least Recently Used.
    Lru,
    /// Least Frequently Used with recency tie-break and frequency merge.
    Lfu,
}

impl CachePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            CachePolicy::Lru => "lru",
            CachePolicy::Lfu => "lfu",
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CachePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(CachePolicy::Lru),
            "lfu" => Ok(CachePolicy::Lfu),
            other => Err(ConfigError::new(format!(
                "unknown cache policy `{}` (expected `lru` or `lfu`)",
                other
            ))),
        }
    }
}

/// Builder for [`BatchCache`] trait objects.
#[derive(Debug, Clone)]
pub struct BatchCacheBuilder {
    capacity_hint: usize,
    bucket_hint: usize,
}

impl BatchCacheBuilder {
    pub fn new() -> Self {
        Self {
            capacity_hint: 0,
            bucket_hint: DEFAULT_BUCKET_PREALLOC,
        }
    }

    /// Expected number of tracked keys; pre-sizes the index and node arena.
    pub fn capacity_hint(mut self, capacity: usize) -> Self {
        self.capacity_hint = capacity;
        self
    }

    /// Number of frequency buckets the LFU policy allocates up front.
    /// Ignored by LRU.
    pub fn bucket_hint(mut self, buckets: usize) -> Self {
        self.bucket_hint = buckets;
        self
    }

    /// Builds a boxed policy.
    pub fn build<K>(&self, policy: CachePolicy) -> Box<dyn BatchCache<K>>
    where
        K: Copy + Eq + Hash + Send + 'static,
    {
        tracing::debug!(
            %policy,
            capacity_hint = self.capacity_hint,
            bucket_hint = self.bucket_hint,
            "building ranking policy"
        );
        match policy {
            CachePolicy::Lru => Box::new(LruBatchCache::with_capacity(self.capacity_hint)),
            CachePolicy::Lfu => Box::new(LfuBatchCache::with_capacity_and_bucket_hint(
                self.capacity_hint,
                self.bucket_hint,
            )),
        }
    }

    /// Builds a policy that can be shared across threads.
    pub fn build_shared<K>(&self, policy: CachePolicy) -> Arc<dyn BatchCache<K>>
    where
        K: Copy + Eq + Hash + Send + 'static,
    {
        Arc::from(self.build(policy))
    }

    /// Parses `name` as a [`CachePolicy`] and builds it.
    pub fn try_build_named<K>(&self, name: &str) -> Result<Box<dyn BatchCache<K>>, ConfigError>
    where
        K: Copy + Eq + Hash + Send + 'static,
    {
        let policy = name.parse::<CachePolicy>()?;
        Ok(self.build(policy))
    }
}

impl Default for BatchCacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_parse_case_insensitively() {
        assert_eq!("lru".parse::<CachePolicy>(), Ok(CachePolicy::Lru));
        assert_eq!(" LFU ".parse::<CachePolicy>(), Ok(CachePolicy::Lfu));
        assert_eq!(CachePolicy::Lfu.to_string(), "lfu");
    }

    #[test]
    fn unknown_policy_is_config_error() {
        let err = "s3fifo".parse::<CachePolicy>().unwrap_err();
        assert!(err.message().contains("s3fifo"));
        assert!(BatchCacheBuilder::new().try_build_named::<u64>("").is_err());
    }

    #[test]
    fn build_returns_requested_policy() {
        let builder = BatchCacheBuilder::new().capacity_hint(8).bucket_hint(4);
        for policy in [CachePolicy::Lru, CachePolicy::Lfu] {
            let cache = builder.build::<u32>(policy);
            assert_eq!(cache.policy(), policy);
            cache.observe_access(&[1, 2, 3]);
            assert_eq!(cache.size(), 3);
        }
    }

    #[test]
    fn shared_instance_is_usable_from_threads() {
        let cache = BatchCacheBuilder::new().build_shared::<u64>(CachePolicy::Lru);
        let worker = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.observe_access(&[1, 2]))
        };
        worker.join().unwrap();
        assert_eq!(cache.size(), 2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn policy_serializes_lowercase() {
        let json = serde_json::to_string(&CachePolicy::Lfu).unwrap();
        assert_eq!(json, "\"lfu\"");
        let back: CachePolicy = serde_json::from_str("\"lru\"").unwrap();
        assert_eq!(back, CachePolicy::Lru);
    }
}
