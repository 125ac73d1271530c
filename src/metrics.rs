//! Request metrics and periodic summaries for the prediction service.

use crate::models::SubModel;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Counters and samples for one endpoint
#[derive(Default)]
struct EndpointMetrics {
    requests: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    /// Latencies of served predictions (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Predictions by label
    outcomes: RwLock<HashMap<String, u64>>,
    /// Positive-class probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
}

/// Metrics collector shared by the HTTP handlers
pub struct ServiceMetrics {
    endpoints: HashMap<SubModel, EndpointMetrics>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            endpoints: SubModel::ALL
                .into_iter()
                .map(|sub| (sub, EndpointMetrics::default()))
                .collect(),
            start_time: Instant::now(),
        }
    }

    fn endpoint(&self, sub: SubModel) -> &EndpointMetrics {
        // every variant is inserted in `new`
        &self.endpoints[&sub]
    }

    /// Record a served prediction
    pub fn record_prediction(
        &self,
        sub: SubModel,
        latency: Duration,
        label: &str,
        probability: Option<f64>,
    ) {
        let endpoint = self.endpoint(sub);
        endpoint.requests.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = endpoint.latencies.write() {
            times.push(latency.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Ok(mut outcomes) = endpoint.outcomes.write() {
            *outcomes.entry(label.to_string()).or_insert(0) += 1;
        }

        if let Some(p) = probability {
            let bucket = (p.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
            if let Ok(mut buckets) = endpoint.probability_buckets.write() {
                buckets[bucket] += 1;
            }
        }
    }

    /// Record a request rejected at validation or for an unavailable model
    pub fn record_rejection(&self, sub: SubModel) {
        let endpoint = self.endpoint(sub);
        endpoint.requests.fetch_add(1, Ordering::Relaxed);
        endpoint.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request whose inference failed
    pub fn record_failure(&self, sub: SubModel) {
        let endpoint = self.endpoint(sub);
        endpoint.requests.fetch_add(1, Ordering::Relaxed);
        endpoint.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests(&self, sub: SubModel) -> u64 {
        self.endpoint(sub).requests.load(Ordering::Relaxed)
    }

    pub fn rejected(&self, sub: SubModel) -> u64 {
        self.endpoint(sub).rejected.load(Ordering::Relaxed)
    }

    pub fn failed(&self, sub: SubModel) -> u64 {
        self.endpoint(sub).failed.load(Ordering::Relaxed)
    }

    pub fn total_requests(&self) -> u64 {
        SubModel::ALL.iter().map(|&sub| self.requests(sub)).sum()
    }

    /// Latency statistics of served predictions
    pub fn get_latency_stats(&self, sub: SubModel) -> LatencyStats {
        let times = match self.endpoint(sub).latencies.read() {
            Ok(times) => times.clone(),
            Err(_) => return LatencyStats::default(),
        };
        LatencyStats::from_samples(times)
    }

    /// Predictions by label
    pub fn get_outcomes(&self, sub: SubModel) -> HashMap<String, u64> {
        self.endpoint(sub)
            .outcomes
            .read()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    pub fn get_probability_distribution(&self, sub: SubModel) -> [u64; 10] {
        self.endpoint(sub)
            .probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// Current throughput (requests per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_requests() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            ENA HEALTHY PREDICTION API - METRICS SUMMARY      ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests: {:>8}  │  Throughput: {:>8.2} req/s              ║",
            self.total_requests(),
            self.get_throughput()
        );

        for sub in SubModel::ALL {
            let requests = self.requests(sub);
            if requests == 0 {
                continue;
            }

            let latency = self.get_latency_stats(sub);
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!(
                "║ {} {:<15} requests={:>6} rejected={:>5} failed={:>5}",
                sub,
                sub.route(),
                requests,
                self.rejected(sub),
                self.failed(sub)
            );
            info!(
                "║   Latency (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5}",
                latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
            );

            let outcomes = self.get_outcomes(sub);
            let served: u64 = outcomes.values().sum();
            let mut labels: Vec<_> = outcomes.into_iter().collect();
            labels.sort();
            for (label, count) in labels {
                let pct = if served > 0 {
                    (count as f64 / served as f64) * 100.0
                } else {
                    0.0
                };
                info!("║   {:12}: {:>6} ({:>5.1}%)", label, count, pct);
            }

            let dist = self.get_probability_distribution(sub);
            let total: u64 = dist.iter().sum();
            if total == 0 {
                continue;
            }
            for (i, &count) in dist.iter().enumerate() {
                let pct = (count as f64 / total as f64) * 100.0;
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
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency statistics
#[derive(Debug, Default, PartialEq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

impl LatencyStats {
    fn from_samples(mut sorted: Vec<u64>) -> Self {
        if sorted.is_empty() {
            return Self::default();
        }
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        Self {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }
}

/// Periodic reporter that prints metrics summaries
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let period = Duration::from_secs(self.interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        // the first tick completes immediately
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
        let metrics = ServiceMetrics::new();

        metrics.record_prediction(SubModel::Diagnosis, Duration::from_micros(100), "Malignant", Some(0.97));
        metrics.record_prediction(SubModel::Diagnosis, Duration::from_micros(200), "Benign", Some(0.03));
        metrics.record_prediction(SubModel::Diagnosis, Duration::from_micros(300), "Benign", Some(0.5));
        metrics.record_rejection(SubModel::Diagnosis);
        metrics.record_failure(SubModel::Stage);

        assert_eq!(metrics.requests(SubModel::Diagnosis), 4);
        assert_eq!(metrics.rejected(SubModel::Diagnosis), 1);
        assert_eq!(metrics.failed(SubModel::Stage), 1);
        assert_eq!(metrics.requests(SubModel::Risk), 0);
        assert_eq!(metrics.total_requests(), 5);

        let outcomes = metrics.get_outcomes(SubModel::Diagnosis);
        assert_eq!(outcomes["Benign"], 2);
        assert_eq!(outcomes["Malignant"], 1);

        let dist = metrics.get_probability_distribution(SubModel::Diagnosis);
        assert_eq!(dist[0], 1);
        assert_eq!(dist[5], 1);
        assert_eq!(dist[9], 1);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = ServiceMetrics::new();
        for us in [100, 200, 300, 400] {
            metrics.record_prediction(SubModel::Risk, Duration::from_micros(us), "Low", None);
        }

        let stats = metrics.get_latency_stats(SubModel::Risk);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
        assert_eq!(metrics.get_probability_distribution(SubModel::Risk), [0; 10]);
    }

    #[test]
    fn test_empty_latency_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.get_latency_stats(SubModel::Stage), LatencyStats::default());
        metrics.print_summary();
    }
}
