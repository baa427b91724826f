//! Performance metrics and statistics tracking for the screening service.

use crate::types::{Decision, ReplyStatus, ScreeningReply};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for submissions handled by the service
pub struct ScreeningMetrics {
    /// Total submissions handled
    pub submissions: AtomicU64,
    /// Decisions forwarded for review
    pub approved: AtomicU64,
    /// Decisions denied
    pub denied: AtomicU64,
    /// Malformed or out-of-domain submissions
    pub rejected: AtomicU64,
    /// Assessments that could not be completed
    pub failed: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Probability-of-denial distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ScreeningMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            submissions: AtomicU64::new(0),
            approved: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a handled submission from its reply
    pub fn record_reply(&self, reply: &ScreeningReply, processing_time: Duration) {
        self.submissions.fetch_add(1, Ordering::Relaxed);

        match (reply.status, reply.decision) {
            (ReplyStatus::Decided, Some(Decision::Approved)) => {
                self.approved.fetch_add(1, Ordering::Relaxed);
            }
            (ReplyStatus::Decided, Some(Decision::Denied)) => {
                self.denied.fetch_add(1, Ordering::Relaxed);
            }
            (ReplyStatus::Rejected, _) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Some(p) = reply.probability_of_denial {
            let bucket = (p * 10.0).clamp(0.0, 9.0) as usize;
            if let Ok(mut buckets) = self.probability_buckets.write() {
                buckets[bucket] += 1;
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
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (submissions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.submissions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get probability-of-denial distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or([0; 10])
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let submissions = self.submissions.load(Ordering::Relaxed);
        let approved = self.approved.load(Ordering::Relaxed);
        let denied = self.denied.load(Ordering::Relaxed);
        let decided = approved + denied;
        let denial_rate = if decided > 0 {
            (denied as f64 / decided as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let distribution = self.get_probability_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            HELOC SCREENING SERVICE - METRICS SUMMARY         ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Submissions Handled:    {:>8}  │  Throughput: {:>6.1} /s   ║",
            submissions,
            self.get_throughput()
        );
        info!(
            "║ Approved: {:>8}  Denied: {:>8}  │  Denial Rate: {:>5.1}% ║",
            approved, denied, denial_rate
        );
        info!(
            "║ Rejected: {:>8}  Failed: {:>8}                          ║",
            self.rejected.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed)
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Probability of Denial Distribution:                          ║");
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ScreeningMetrics {
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

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<ScreeningMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ScreeningMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick completes immediately
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
    use crate::error::ScreeningError;
    use crate::types::DecisionResult;

    #[test]
    fn test_metrics_recording() {
        let metrics = ScreeningMetrics::new();

        let approved = ScreeningReply::decided("a", &DecisionResult::new(Decision::Approved, 0.15));
        let denied = ScreeningReply::decided("b", &DecisionResult::new(Decision::Denied, 1.0));
        let failed = ScreeningReply::failed("c", &ScreeningError::Inference("x".into()));
        let rejected = ScreeningReply::rejected("d", "bad".into());

        metrics.record_reply(&approved, Duration::from_micros(100));
        metrics.record_reply(&denied, Duration::from_micros(200));
        metrics.record_reply(&failed, Duration::from_micros(50));
        metrics.record_reply(&rejected, Duration::from_micros(10));

        assert_eq!(metrics.submissions.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.approved.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.denied.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.rejected.load(Ordering::Relaxed), 1);

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[1], 1);
        assert_eq!(distribution[9], 1);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = ScreeningMetrics::new();
        assert_eq!(metrics.get_processing_stats().count, 0);

        for us in 1..=100 {
            let reply = ScreeningReply::rejected("x", String::new());
            metrics.record_reply(&reply, Duration::from_micros(us));
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.max_us, 100);
        assert!(stats.p99_us >= 99);
        assert_eq!(stats.mean_us, 50);
    }
}
