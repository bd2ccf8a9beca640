//! Running performance aggregates for the dispatcher.

use parking_lot::Mutex;
use serde::Serialize;

/// Snapshot of the dispatcher's performance counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_translations: u64,
    pub cache_hits: u64,
    pub rolling_avg_latency_ms: f64,
    pub last_init_duration_ms: u64,
}

impl PerformanceStats {
    /// `cache_hits / max(total_translations, 1)`
    #[allow(clippy::cast_precision_loss)]
    pub fn cache_hit_rate(&self) -> f64 {
        self.cache_hits as f64 / self.total_translations.max(1) as f64
    }
}

/// Owned, lock-protected telemetry aggregate.
///
/// Only the dispatcher records into it; everyone else reads snapshots.
#[derive(Debug, Default)]
pub struct Telemetry {
    stats: Mutex<PerformanceStats>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed translation (cached, translated or fallback).
    ///
    /// The average is updated as `(avg + latency) / total`, a cheap
    /// approximation that drifts from the true mean as the count grows.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_translation(&self, latency_ms: u64, cache_hit: bool) {
        let mut stats = self.stats.lock();
        stats.total_translations += 1;
        if cache_hit {
            stats.cache_hits += 1;
        }
        stats.rolling_avg_latency_ms =
            (stats.rolling_avg_latency_ms + latency_ms as f64) / stats.total_translations as f64;
    }

    pub fn record_init(&self, duration_ms: u64) {
        self.stats.lock().last_init_duration_ms = duration_ms;
    }

    pub fn snapshot(&self) -> PerformanceStats {
        *self.stats.lock()
    }

    pub fn reset(&self) {
        *self.stats.lock() = PerformanceStats::default();
    }
}
