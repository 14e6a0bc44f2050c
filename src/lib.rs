//! batchcache: batch-oriented eviction ranking for sparse embedding tables.
//!
//! A storage manager feeds batches of accessed keys into a [`BatchCache`]
//! policy, asks it for eviction candidates under memory pressure and for a
//! ranked snapshot of the working set at checkpoint time. Two policies are
//! provided: [`LruBatchCache`] and [`LfuBatchCache`].
//!
//! [`BatchCache`]: traits::BatchCache
//! [`LruBatchCache`]: policy::lru::LruBatchCache
//! [`LfuBatchCache`]: policy::lfu::LfuBatchCache

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;
pub mod prelude;
pub mod stats;
pub mod traits;
