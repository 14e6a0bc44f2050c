//! Hit/miss accounting shared by every ranking policy.
//!
//! A key observed while already tracked is a hit, a newly admitted key is a
//! miss. Counters only grow until [`HitStats::reset`]. They live inside each
//! policy core and are therefore protected by the same lock as the ranking
//! state, so no atomics are needed.
//!
//! ```
//! use batchcache::stats::HitStats;
//!
//! let mut stats = HitStats::default();
//! stats.record_miss();
//! stats.record_hit();
//! stats.record_hit();
//! stats.record_hit();
//!
//! assert_eq!(stats.visits(), 4);
//! assert_eq!(stats.hit_rate(), 75.0);
//! assert_eq!(
//!     stats.to_string(),
//!     "HitRate = 75 %, visit_count = 4, hit_count = 3"
//! );
//! ```

use std::fmt;

/// Point-in-time hit/miss counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HitStats {
    /// Observations of keys that were already tracked.
    pub hits: u64,
    /// Observations that admitted a new key.
    pub misses: u64,
}

impl HitStats {
    #[inline]
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    #[inline]
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Zeroes both counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Total observations: `hits + misses`.
    pub fn visits(&self) -> u64 {
        self.hits + self.misses
    }

    /// Hit rate in percent, or `0.0` before the first observation.
    pub fn hit_rate(&self) -> f64 {
        match self.visits() {
            0 => 0.0,
            visits => self.hits as f64 * 100.0 / visits as f64,
        }
    }
}

impl fmt::Display for HitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HitRate = {} %, visit_count = {}, hit_count = {}",
            self.hit_rate(),
            self.visits(),
            self.hits
        )
    }
}
