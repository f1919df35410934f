//! Analysis cache
//!
//! Re-submitting the same profile response (a renderer refresh, a second tab) should not pay
//! for parsing again. Entries are keyed by a SHA-256 of the raw text and the analysis options,
//! expire after a TTL and are evicted oldest-first once the cache is full.

use crate::services::profile_analyzer::{
    AnalysisOptions, ProfileAnalysis, ProfileResult, analyze_profile,
};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Cached Entry
// ============================================================================

#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub analysis: Arc<ProfileAnalysis>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CachedAnalysis {
    /// Check if cache is still valid
    pub fn is_valid(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

// ============================================================================
// Cache Manager
// ============================================================================

/// Content-addressed cache of finished analyses
///
/// `DashMap` shards its locks, so concurrent requests for different profiles do not contend.
pub struct AnalysisCache {
    entries: DashMap<String, CachedAnalysis>,
    capacity: usize,
    ttl: Duration,
    enabled: bool,
}

impl AnalysisCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { entries: DashMap::new(), capacity, ttl, enabled: capacity > 0 }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self { entries: DashMap::new(), capacity: 0, ttl: Duration::ZERO, enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache key for one (input, options) pair, as lowercase hex
    pub fn cache_key(text: &str, options: &AnalysisOptions) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update((options.top_n as u64).to_le_bytes());
        hasher.update((options.slowest_components as u64).to_le_bytes());
        hasher.update([options.include_zero_breakdown as u8]);
        hasher.update((options.limits.max_depth as u64).to_le_bytes());
        hasher.update((options.limits.max_nodes as u64).to_le_bytes());
        hasher.update((options.max_input_bytes as u64).to_le_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Look up a still valid entry; expired entries are dropped on the way
    pub fn get(&self, key: &str) -> Option<Arc<ProfileAnalysis>> {
        if !self.enabled {
            return None;
        }

        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_valid() => return Some(Arc::clone(&entry.analysis)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    /// Store an analysis, evicting until the cache is back within `capacity`
    ///
    /// Concurrent inserts may briefly overshoot; each inserter trims after its own write, so
    /// the cache never stays above capacity once inserts return.
    pub fn insert(&self, key: String, analysis: Arc<ProfileAnalysis>) {
        if !self.enabled {
            return;
        }

        self.entries
            .insert(key, CachedAnalysis { analysis, created_at: Instant::now(), ttl: self.ttl });

        if self.entries.len() > self.capacity {
            self.enforce_capacity();
        }
    }

    /// Return the cached analysis for `text` or compute and store it
    ///
    /// The flag is `true` on a cache hit. Failed analyses are never cached.
    pub fn get_or_analyze(
        &self,
        text: &str,
        options: &AnalysisOptions,
    ) -> ProfileResult<(Arc<ProfileAnalysis>, bool)> {
        if !self.enabled {
            return Ok((Arc::new(analyze_profile(text, options)?), false));
        }

        let key = Self::cache_key(text, options);
        if let Some(analysis) = self.get(&key) {
            tracing::debug!("Analysis cache hit for {}", &key[..12]);
            return Ok((analysis, true));
        }

        let analysis = Arc::new(analyze_profile(text, options)?);
        self.insert(key, Arc::clone(&analysis));
        Ok((analysis, false))
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.clear();
        tracing::info!("Cleared analysis cache");
    }

    /// Purge expired entries, then evict oldest-first until within capacity
    fn enforce_capacity(&self) {
        self.entries.retain(|_, entry| entry.is_valid());

        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().created_at)
                .map(|entry| entry.key().clone());
            let Some(key) = oldest else {
                break;
            };
            if self.entries.remove(&key).is_some() {
                tracing::debug!("Evicted oldest analysis cache entry");
            }
        }
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(128, Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{"profile": {"shards": [{
        "id": "[n1][idx][0]",
        "searches": [{
            "query": [{ "type": "TermQuery", "time_in_nanos": 100 }],
            "rewrite_time": 10,
            "collector": []
        }]
    }]}}"#;

    fn profile_with_time(nanos: u64) -> String {
        PROFILE.replace("100", &nanos.to_string())
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let cache = AnalysisCache::new(4, Duration::from_secs(60));
        let options = AnalysisOptions::default();

        let (first, hit) = cache.get_or_analyze(PROFILE, &options).unwrap();
        assert!(!hit);
        let (second, hit) = cache.get_or_analyze(PROFILE, &options).unwrap();
        assert!(hit);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.phases.overall_total_nanos, 110);
    }

    #[test]
    fn test_options_are_part_of_key() {
        let options = AnalysisOptions::default();
        let other = AnalysisOptions { top_n: 3, ..options };
        assert_ne!(
            AnalysisCache::cache_key(PROFILE, &options),
            AnalysisCache::cache_key(PROFILE, &other)
        );
        assert_eq!(
            AnalysisCache::cache_key(PROFILE, &options),
            AnalysisCache::cache_key(PROFILE, &options)
        );
        assert_eq!(AnalysisCache::cache_key(PROFILE, &options).len(), 64);
    }

    #[test]
    fn test_expired_entries_are_not_returned() {
        let cache = AnalysisCache::new(4, Duration::ZERO);
        let options = AnalysisOptions::default();

        cache.get_or_analyze(PROFILE, &options).unwrap();
        let (_, hit) = cache.get_or_analyze(PROFILE, &options).unwrap();
        assert!(!hit);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = AnalysisCache::new(2, Duration::from_secs(60));
        let options = AnalysisOptions::default();

        for nanos in [100, 200, 300] {
            cache.get_or_analyze(&profile_with_time(nanos), &options).unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }

        assert_eq!(cache.len(), 2);
        let oldest = AnalysisCache::cache_key(&profile_with_time(100), &options);
        assert!(cache.get(&oldest).is_none());
        let newest = AnalysisCache::cache_key(&profile_with_time(300), &options);
        assert!(cache.get(&newest).is_some());
    }

    #[test]
    fn test_concurrent_inserts_stay_within_capacity() {
        let cache = AnalysisCache::new(4, Duration::from_secs(60));
        let analysis = Arc::new(analyze_profile(PROFILE, &AnalysisOptions::default()).unwrap());

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let cache = &cache;
                let analysis = &analysis;
                scope.spawn(move || {
                    for i in 0..50 {
                        cache.insert(format!("{}-{}", worker, i), Arc::clone(analysis));
                    }
                });
            }
        });

        assert!(cache.len() <= 4, "cache grew to {} entries", cache.len());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = AnalysisCache::new(4, Duration::from_secs(60));
        assert!(cache.get_or_analyze("{", &AnalysisOptions::default()).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_always_misses() {
        let cache = AnalysisCache::disabled();
        let options = AnalysisOptions::default();

        cache.get_or_analyze(PROFILE, &options).unwrap();
        let (_, hit) = cache.get_or_analyze(PROFILE, &options).unwrap();
        assert!(!hit);
        assert!(cache.is_empty());
    }
}
