pub use crate::builder::{BatchCacheBuilder, CachePolicy};
pub use crate::error::{ConfigError, InvariantError};
pub use crate::policy::lfu::{LfuBatchCache, LfuCore};
pub use crate::policy::lru::{LruBatchCache, LruCore};
pub use crate::stats::HitStats;
pub use crate::traits::{BatchCache, CachedKey};
