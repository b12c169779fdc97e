// src/pipeline/metrics.rs
//
// Production observability. Tracks per-stage counts and timings across
// the lifetime of a pipeline instance. Export via logs or a hosting
// application's metrics endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub routes_analyzed: Arc<AtomicU64>,
    pub routes_rejected: Arc<AtomicU64>,
    pub polylines_truncated: Arc<AtomicU64>,
    pub intelligence_reports: Arc<AtomicU64>,
    pub intelligence_fallbacks: Arc<AtomicU64>,
    pub decisions_made: Arc<AtomicU64>,
    pub batch_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            routes_analyzed: Arc::new(AtomicU64::new(0)),
            routes_rejected: Arc::new(AtomicU64::new(0)),
            polylines_truncated: Arc::new(AtomicU64::new(0)),
            intelligence_reports: Arc::new(AtomicU64::new(0)),
            intelligence_fallbacks: Arc::new(AtomicU64::new(0)),
            decisions_made: Arc::new(AtomicU64::new(0)),
            batch_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_timing(&self, counter: &AtomicU64, duration_us: u64) {
        counter.store(duration_us, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            routes_analyzed: self.routes_analyzed.load(Ordering::Relaxed),
            routes_rejected: self.routes_rejected.load(Ordering::Relaxed),
            polylines_truncated: self.polylines_truncated.load(Ordering::Relaxed),
            intelligence_reports: self.intelligence_reports.load(Ordering::Relaxed),
            intelligence_fallbacks: self.intelligence_fallbacks.load(Ordering::Relaxed),
            decisions_made: self.decisions_made.load(Ordering::Relaxed),
            last_batch_us: self.batch_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub routes_analyzed: u64,
    pub routes_rejected: u64,
    pub polylines_truncated: u64,
    pub intelligence_reports: u64,
    pub intelligence_fallbacks: u64,
    pub decisions_made: u64,
    pub last_batch_us: u64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = PipelineMetrics::new();
        metrics.inc(&metrics.routes_analyzed);
        metrics.inc(&metrics.routes_analyzed);
        metrics.inc(&metrics.intelligence_fallbacks);
        metrics.set_timing(&metrics.batch_time_us, 1234);

        let summary = metrics.summary();
        assert_eq!(summary.routes_analyzed, 2);
        assert_eq!(summary.intelligence_fallbacks, 1);
        assert_eq!(summary.last_batch_us, 1234);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = PipelineMetrics::new();
        let clone = metrics.clone();
        clone.inc(&clone.routes_analyzed);
        assert_eq!(metrics.summary().routes_analyzed, 1);
    }
}
