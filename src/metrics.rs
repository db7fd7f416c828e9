//! Performance metrics and statistics tracking for the forecasting service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for pipeline performance
pub struct PipelineMetrics {
    /// Total forecast requests completed successfully
    pub requests_processed: AtomicU64,
    /// Decisions with an offer
    pub eligible_decisions: AtomicU64,
    /// Failed requests by error kind
    failures_by_kind: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Sum of offers made, in cents
    offered_cents: AtomicU64,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            eligible_decisions: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            offered_cents: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed forecast
    pub fn record_decision(&self, processing_time: Duration, offer: Option<f64>) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        self.record_time(processing_time);

        if let Some(offer) = offer {
            self.eligible_decisions.fetch_add(1, Ordering::Relaxed);
            let cents = (offer.max(0.0) * 100.0).round() as u64;
            self.offered_cents.fetch_add(cents, Ordering::Relaxed);
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, kind: &str, processing_time: Duration) {
        self.record_time(processing_time);
        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    fn record_time(&self, processing_time: Duration) {
        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Total offered amount
    pub fn get_total_offered(&self) -> f64 {
        self.offered_cents.load(Ordering::Relaxed) as f64 / 100.0
    }

    /// Get failures by error kind
    pub fn get_failures_by_kind(&self) -> HashMap<String, u64> {
        self.failures_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let processed = self.requests_processed.load(Ordering::Relaxed);
        let eligible = self.eligible_decisions.load(Ordering::Relaxed);
        let eligible_rate = if processed > 0 {
            (eligible as f64 / processed as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let failures = self.get_failures_by_kind();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║          CASH ADVANCE FORECASTER - METRICS SUMMARY           ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests Processed:     {:>8}  │  Throughput: {:>6.1} req/s ║",
            processed,
            self.get_throughput()
        );
        info!(
            "║ Eligible Merchants:     {:>8}  │  Rate:       {:>6.1}%      ║",
            eligible, eligible_rate
        );
        info!(
            "║ Total Offered: {:>18.2}                            ║",
            self.get_total_offered()
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        if !failures.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Failures by Kind:                                            ║");
            for (kind, count) in &failures {
                info!("║   {:22}: {:>6}                               ║", kind, count);
            }
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: std::sync::Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: std::sync::Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_decision(Duration::from_micros(100), Some(20869.57));
        metrics.record_decision(Duration::from_micros(200), None);
        metrics.record_failure("insufficient_history", Duration::from_micros(50));
        metrics.record_failure("insufficient_history", Duration::from_micros(70));

        assert_eq!(metrics.requests_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.eligible_decisions.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_total_offered(), 20869.57);
        assert_eq!(
            metrics.get_failures_by_kind().get("insufficient_history"),
            Some(&2)
        );
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_processing_stats().count, 0);

        for us in [100, 200, 300, 400] {
            metrics.record_decision(Duration::from_micros(us), None);
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }
}
