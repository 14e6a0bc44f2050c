// ==============================================
// CROSS-POLICY INVARIANT TESTS (integration)
// ==============================================
//
// Behavior every ranking policy must share, exercised through the
// `BatchCache` trait object exactly as a storage manager would use it.

use batchcache::builder::{BatchCacheBuilder, CachePolicy};
use batchcache::traits::BatchCache;

const POLICIES: [CachePolicy; 2] = [CachePolicy::Lru, CachePolicy::Lfu];

fn build(policy: CachePolicy) -> Box<dyn BatchCache<u64>> {
    BatchCacheBuilder::new().build(policy)
}

// ==============================================
// Size Accounting
// ==============================================

mod size_accounting {
    use super::*;

    #[test]
    fn size_is_inserts_minus_evictions() {
        for policy in POLICIES {
            for (m, e) in [(0usize, 0usize), (10, 3), (10, 10), (10, 25), (1, 0)] {
                let cache = build(policy);
                let batch: Vec<u64> = (0..m as u64).collect();
                cache.observe_access(&batch);
                let evicted = cache.evict_candidates(e);
                assert_eq!(evicted.len(), e.min(m), "{policy}: evicted count");
                assert_eq!(cache.size(), m.saturating_sub(e), "{policy}: m={m} e={e}");
            }
        }
    }

    #[test]
    fn evicted_keys_are_distinct_and_no_longer_tracked() {
        for policy in POLICIES {
            let cache = build(policy);
            cache.observe_access(&[1, 2, 3, 2, 1, 4]);
            let mut evicted = cache.evict_candidates(3);
            for key in &evicted {
                assert!(!cache.contains(key), "{policy}: {key} still tracked");
            }
            evicted.sort_unstable();
            evicted.dedup();
            assert_eq!(evicted.len(), 3, "{policy}: duplicate candidates");
        }
    }

    #[test]
    fn snapshot_never_exceeds_request_or_size() {
        for policy in POLICIES {
            let cache = build(policy);
            cache.observe_access(&[5, 6, 7]);
            assert_eq!(cache.cached_keys(0).len(), 0);
            assert_eq!(cache.cached_keys(2).len(), 2);
            assert_eq!(cache.cached_keys(100).len(), 3);
        }
    }
}

// ==============================================
// Hit/Miss Accounting
// ==============================================

mod hit_miss_accounting {
    use super::*;

    #[test]
    fn fresh_batch_misses_then_repeat_hits() {
        for policy in POLICIES {
            let cache = build(policy);
            let batch: Vec<u64> = (100..164).collect();

            cache.observe_access(&batch);
            let stats = cache.stats();
            assert_eq!((stats.hits, stats.misses), (0, 64), "{policy}");

            cache.observe_access(&batch);
            let stats = cache.stats();
            assert_eq!((stats.hits, stats.misses), (64, 64), "{policy}");
        }
    }

    #[test]
    fn reset_reports_zero_visits() {
        for policy in POLICIES {
            let cache = build(policy);
            cache.observe_access(&[1, 2, 1]);
            cache.reset_stats();
            let summary = cache.stats_summary();
            assert!(summary.contains("visit_count = 0"), "{policy}: {summary}");
            assert!(summary.contains("hit_count = 0"), "{policy}: {summary}");
            // ranking state survives a stats reset
            assert_eq!(cache.size(), 2);
        }
    }

    #[test]
    fn eviction_and_snapshot_do_not_touch_counters() {
        for policy in POLICIES {
            let cache = build(policy);
            cache.observe_access(&[1, 2, 3]);
            let before = cache.stats();
            let _ = cache.cached_keys(3);
            assert_eq!(cache.evict_candidates(1), vec![1], "{policy}");
            assert_eq!(cache.stats(), before, "{policy}");
        }
    }
}

// ==============================================
// Documented Scenarios
// ==============================================

mod scenarios {
    use super::*;

    fn keys(cache: &dyn BatchCache<u64>, k: usize) -> Vec<u64> {
        cache.cached_keys(k).into_iter().map(|e| e.key).collect()
    }

    #[test]
    fn lru_reverse_first_observation_order() {
        let cache = build(CachePolicy::Lru);
        cache.observe_access(&[1, 2, 3]);
        cache.observe_access(&[4, 5]);
        cache.observe_access(&[6]);
        assert_eq!(cache.evict_candidates(6), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn lru_snapshot_evict_snapshot() {
        let cache = build(CachePolicy::Lru);
        cache.observe_access(&[1, 2, 3]);
        assert_eq!(keys(cache.as_ref(), 3), vec![3, 2, 1]);
        assert_eq!(cache.evict_candidates(1), vec![1]);
        assert_eq!(keys(cache.as_ref(), 2), vec![3, 2]);
    }

    #[test]
    fn lfu_frequency_decides_candidate() {
        let cache = build(CachePolicy::Lfu);
        cache.observe_access(&[1]);
        cache.observe_access(&[2]);
        cache.observe_access(&[1]);
        let freqs: Vec<(u64, u64)> = cache
            .cached_keys(2)
            .into_iter()
            .map(|e| (e.key, e.freq))
            .collect();
        assert_eq!(freqs, vec![(1, 2), (2, 1)]);
        assert_eq!(cache.evict_candidates(1), vec![2]);
    }

    #[test]
    fn lfu_meta_merge_visible_in_snapshot() {
        let cache = build(CachePolicy::Lfu);
        cache.observe_access(&[9, 9]);
        cache.observe_access_with_meta(&[9], &[1], &[6]);
        let entry = cache.cached_keys(1)[0];
        assert_eq!((entry.key, entry.freq), (9, 8));
    }

    #[test]
    fn checkpoint_frequencies_of_any_size_are_accepted() {
        for policy in POLICIES {
            let cache = build(policy);
            cache.observe_access(&[1]);
            cache.observe_access_with_meta(&[1, 2, 3], &[0, 0, 0], &[u64::MAX, 1 << 33, u64::MAX]);
            assert_eq!(cache.size(), 3, "{policy}");
            assert_eq!(cache.cached_keys(10).len(), 3, "{policy}");
            assert_eq!(cache.evict_candidates(10).len(), 3, "{policy}");
            assert!(cache.is_empty(), "{policy}");
        }
    }

    #[test]
    fn lru_ignores_meta_hints() {
        let cache = build(CachePolicy::Lru);
        cache.observe_access_with_meta(&[1, 2], &[0, 0], &[1000, 1]);
        // frequency hints do not protect key 1
        assert_eq!(cache.evict_candidates(1), vec![1]);
    }
}
