//! Request metrics with Prometheus text exposition and an HTTP health endpoint.
//!
//! Histograms use logarithmic buckets from 1ms to 10s, which covers one upstream
//! HTTP round trip plus one database insert. Atomic counters are rendered
//! directly as Prometheus text.

use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Prometheus histogram with millisecond-resolution buckets
// ---------------------------------------------------------------------------

const NUM_BUCKETS: usize = 13;

/// Upper bounds in milliseconds + Prometheus `le` label strings.
const BUCKETS: [(u64, &str); NUM_BUCKETS] = [
    (1, "0.001"),
    (5, "0.005"),
    (10, "0.01"),
    (25, "0.025"),
    (50, "0.05"),
    (100, "0.1"),
    (250, "0.25"),
    (500, "0.5"),
    (1_000, "1"),
    (2_500, "2.5"),
    (5_000, "5"),
    (7_500, "7.5"),
    (10_000, "10"),
];

pub struct PromHistogram {
    /// Cumulative bucket counters. Index i counts observations <= BUCKETS[i].
    buckets: [AtomicU64; NUM_BUCKETS],
    sum_us: AtomicU64,
    count: AtomicU64,
}

impl Default for PromHistogram {
    fn default() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            sum_us: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }
}

impl PromHistogram {
    /// Record one observation. Values above the last bucket only count
    /// towards `+Inf`, `_sum` and `_count`.
    pub fn record(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        if let Some(first) = BUCKETS
            .iter()
            .position(|&(bound_ms, _)| micros <= bound_ms * 1_000)
        {
            for bucket in &self.buckets[first..] {
                bucket.fetch_add(1, Relaxed);
            }
        }

        self.sum_us.fetch_add(micros, Relaxed);
        self.count.fetch_add(1, Relaxed);
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Relaxed)
    }

    // Writing to a `String` cannot fail, hence the unwraps below.
    fn render(&self, name: &str, out: &mut String) {
        for (i, &(_, le)) in BUCKETS.iter().enumerate() {
            let count = self.buckets[i].load(Relaxed);
            writeln!(out, "{name}_bucket{{le=\"{le}\"}} {count}").unwrap();
        }
        let total = self.count.load(Relaxed);
        writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {total}").unwrap();

        #[allow(clippy::cast_precision_loss)] // Sub-microsecond precision is irrelevant.
        let sum_secs = self.sum_us.load(Relaxed) as f64 / 1_000_000.0;
        writeln!(out, "{name}_sum {sum_secs}").unwrap();
        writeln!(out, "{name}_count {total}").unwrap();
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Failure labels, in render order. Anything else is counted as `other`.
const FAILURE_KINDS: [&str; 6] = [
    "transport",
    "decode",
    "empty_depth",
    "price_parse",
    "persistence",
    "other",
];

pub struct Metrics {
    pub get_rates_requests: AtomicU64,
    pub rates_served: AtomicU64,
    pub health_checks: AtomicU64,
    failures: [AtomicU64; FAILURE_KINDS.len()],
    /// Fetch + persist latency of each `GetRates` call.
    pub pipeline_latency: PromHistogram,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            get_rates_requests: AtomicU64::new(0),
            rates_served: AtomicU64::new(0),
            health_checks: AtomicU64::new(0),
            failures: std::array::from_fn(|_| AtomicU64::new(0)),
            pipeline_latency: PromHistogram::default(),
            start_time: Instant::now(),
        }
    }
}

impl Metrics {
    /// Count a failed `GetRates` call under its error kind.
    pub fn record_failure(&self, kind: &str) {
        let idx = FAILURE_KINDS
            .iter()
            .position(|&k| k == kind)
            .unwrap_or(FAILURE_KINDS.len() - 1);
        self.failures[idx].fetch_add(1, Relaxed);
    }

    #[must_use]
    pub fn failures(&self, kind: &str) -> u64 {
        FAILURE_KINDS
            .iter()
            .position(|&k| k == kind)
            .map_or(0, |i| self.failures[i].load(Relaxed))
    }

    /// Render all metrics in Prometheus text exposition format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let mut out = String::with_capacity(2048);

        // -- Counters --
        writeln!(out, "# HELP rates_get_rates_requests_total GetRates calls received").unwrap();
        writeln!(out, "# TYPE rates_get_rates_requests_total counter").unwrap();
        writeln!(out, "rates_get_rates_requests_total {}", self.get_rates_requests.load(Relaxed)).unwrap();

        writeln!(out, "# HELP rates_served_total Rates fetched, stored and returned").unwrap();
        writeln!(out, "# TYPE rates_served_total counter").unwrap();
        writeln!(out, "rates_served_total {}", self.rates_served.load(Relaxed)).unwrap();

        writeln!(out, "# HELP rates_failures_total Failed GetRates calls by cause").unwrap();
        writeln!(out, "# TYPE rates_failures_total counter").unwrap();
        for (kind, counter) in FAILURE_KINDS.iter().zip(&self.failures) {
            writeln!(out, "rates_failures_total{{kind=\"{kind}\"}} {}", counter.load(Relaxed)).unwrap();
        }

        writeln!(out, "# HELP rates_health_checks_total HealthCheck calls received").unwrap();
        writeln!(out, "# TYPE rates_health_checks_total counter").unwrap();
        writeln!(out, "rates_health_checks_total {}", self.health_checks.load(Relaxed)).unwrap();

        // -- Gauges --
        writeln!(out, "# HELP rates_uptime_seconds Seconds since process start").unwrap();
        writeln!(out, "# TYPE rates_uptime_seconds gauge").unwrap();
        writeln!(out, "rates_uptime_seconds {}", self.start_time.elapsed().as_secs()).unwrap();

        // -- Histograms --
        writeln!(out, "# HELP rates_pipeline_duration_seconds GetRates fetch + persist latency").unwrap();
        writeln!(out, "# TYPE rates_pipeline_duration_seconds histogram").unwrap();
        self.pipeline_latency.render("rates_pipeline_duration_seconds", &mut out);

        out
    }
}

// ---------------------------------------------------------------------------
// HTTP server
// ---------------------------------------------------------------------------

/// Serve `/health` and `/metrics` on a pre-bound listener until cancelled.
pub async fn serve_http(
    listener: TcpListener,
    metrics: Arc<Metrics>,
    cancel: CancellationToken,
) -> Result<()> {
    let app = router(metrics);

    info!(addr = %listener.local_addr()?, "metrics/health HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}

fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prom_metrics))
        .with_state(metrics)
}

/// Liveness only; mirrors the gRPC `HealthCheck`.
async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK\n")
}

async fn prom_metrics(State(m): State<Arc<Metrics>>) -> String {
    m.to_prometheus()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_buckets_are_cumulative() {
        let h = PromHistogram::default();
        h.record(Duration::from_micros(800)); // <= 1ms
        h.record(Duration::from_millis(30)); // <= 50ms
        h.record(Duration::from_secs(60)); // beyond the last bucket

        let mut out = String::new();
        h.render("t", &mut out);

        assert!(out.contains("t_bucket{le=\"0.001\"} 1\n"), "{out}");
        assert!(out.contains("t_bucket{le=\"0.025\"} 1\n"), "{out}");
        assert!(out.contains("t_bucket{le=\"0.05\"} 2\n"), "{out}");
        assert!(out.contains("t_bucket{le=\"10\"} 2\n"), "{out}");
        assert!(out.contains("t_bucket{le=\"+Inf\"} 3\n"), "{out}");
        assert!(out.contains("t_count 3\n"), "{out}");
        assert_eq!(h.count(), 3);
    }

    #[test]
    fn failures_by_kind() {
        let m = Metrics::default();
        m.record_failure("transport");
        m.record_failure("transport");
        m.record_failure("persistence");
        m.record_failure("something_new");

        assert_eq!(m.failures("transport"), 2);
        assert_eq!(m.failures("persistence"), 1);
        assert_eq!(m.failures("other"), 1);
        assert_eq!(m.failures("decode"), 0);

        let text = m.to_prometheus();
        assert!(text.contains("rates_failures_total{kind=\"transport\"} 2\n"));
        assert!(text.contains("rates_failures_total{kind=\"other\"} 1\n"));
        assert!(text.contains("# TYPE rates_pipeline_duration_seconds histogram\n"));
    }

    #[tokio::test]
    async fn http_endpoints() {
        let metrics = Arc::new(Metrics::default());
        metrics.health_checks.fetch_add(4, Relaxed);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let server = tokio::spawn(serve_http(listener, metrics, cancel.clone()));

        let health = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert_eq!(health.status(), reqwest::StatusCode::OK);
        assert_eq!(health.text().await.unwrap(), "OK\n");

        let body = reqwest::get(format!("http://{addr}/metrics"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("rates_health_checks_total 4\n"), "{body}");

        cancel.cancel();
        server.await.unwrap().unwrap();
    }
}
