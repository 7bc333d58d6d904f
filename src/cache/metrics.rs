use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks cache lookups and loader outcomes
#[derive(Debug, Default)]
pub struct CacheMetrics {
    load_times: RwLock<HashMap<String, Duration>>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    loads_started: AtomicU64,
    loads_succeeded: AtomicU64,
    loads_failed: AtomicU64,
}

impl CacheMetrics {
    /// Create a new instance of CacheMetrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record how long the loader took for a key
    pub fn record_load_time(&self, key: String, duration: Duration) {
        self.load_times.write().insert(key, duration);
    }

    /// Record a cache hit
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that a loader was started
    pub fn record_load_started(&self) {
        self.loads_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful load
    pub fn record_load_succeeded(&self) {
        self.loads_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed load
    pub fn record_load_failed(&self) {
        self.loads_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the cache hit rate as a percentage
    pub fn cache_hit_rate(&self) -> f32 {
        let hits = self.cache_hits() as f32;
        let misses = self.cache_misses() as f32;

        if hits + misses > 0.0 {
            hits / (hits + misses) * 100.0
        } else {
            0.0
        }
    }

    /// Number of lookups served by an existing entry
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Number of lookups that created an entry
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Number of loader invocations
    pub fn loads_started(&self) -> u64 {
        self.loads_started.load(Ordering::Relaxed)
    }

    /// Number of loads that produced a payload
    pub fn loads_succeeded(&self) -> u64 {
        self.loads_succeeded.load(Ordering::Relaxed)
    }

    /// Number of loads that failed
    pub fn loads_failed(&self) -> u64 {
        self.loads_failed.load(Ordering::Relaxed)
    }

    /// Loads started but not yet finished
    pub fn loads_in_flight(&self) -> u64 {
        self.loads_started()
            .saturating_sub(self.loads_succeeded() + self.loads_failed())
    }

    /// Get the most recent load time for a key
    pub fn load_time(&self, key: &str) -> Option<Duration> {
        self.load_times.read().get(key).cloned()
    }

    /// Get all recorded load times
    pub fn all_load_times(&self) -> HashMap<String, Duration> {
        self.load_times.read().clone()
    }
}

/// A thread-safe wrapper around CacheMetrics
#[derive(Debug, Clone, Default)]
pub struct CacheMetricsHandle(Arc<CacheMetrics>);

impl CacheMetricsHandle {
    /// Create a new metrics handle
    pub fn new() -> Self {
        Self(Arc::new(CacheMetrics::new()))
    }

    /// Get a reference to the underlying metrics
    pub fn inner(&self) -> &CacheMetrics {
        &self.0
    }
}

impl std::ops::Deref for CacheMetricsHandle {
    type Target = CacheMetrics;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
