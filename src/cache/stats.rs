//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions,
//! stale serves and swallowed storage failures.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of reads answered with a fresh entry
    pub hits: u64,
    /// Number of reads with no usable entry
    pub misses: u64,
    /// Number of reads answered with an expired entry (stale-while-revalidate)
    pub stale_serves: u64,
    /// Number of entries evicted by the FIFO policy
    pub evictions: u64,
    /// Number of revalidation fetches triggered
    pub revalidations: u64,
    /// Number of durable-storage failures swallowed at the adapter boundary
    pub storage_failures: u64,
    /// Current number of entries in the namespace
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Stale serves count as hits (the caller got data back).
    /// Returns 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.stale_serves + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.stale_serves) as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Stale Serve ==
    /// Increments the stale-serve counter.
    pub fn record_stale_serve(&mut self) {
        self.stale_serves += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Revalidation ==
    /// Increments the revalidation counter.
    pub fn record_revalidation(&mut self) {
        self.revalidations += 1;
    }

    // == Record Storage Failure ==
    /// Increments the swallowed-storage-failure counter.
    pub fn record_storage_failure(&mut self) {
        self.storage_failures += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }

    // == Snapshot ==
    /// Returns a timestamped snapshot of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            stats: self.clone(),
            hit_rate: self.hit_rate(),
            taken_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// == Stats Snapshot ==
/// Point-in-time view of the counters, suitable for logging or export.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
    pub taken_at: String,
}
