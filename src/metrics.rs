//! Built-in run metrics.

use crate::checks::{CheckSet, CheckTally};
use crate::http::LoadResponse;
use parking_lot::Mutex;
use serde::Serialize;
use std::borrow::Cow;
use std::time::{Duration, Instant};

/// Distribution of millisecond samples.
#[derive(Debug, Clone, Default)]
pub struct Trend {
    samples: Vec<f64>,
    sorted: bool,
}

impl Trend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.samples.push(value);
        self.sorted = false;
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Copy with samples sorted ascending.
    pub fn into_sorted(mut self) -> Self {
        self.samples.sort_by(f64::total_cmp);
        self.sorted = true;
        self
    }

    fn sorted_samples(&self) -> Cow<'_, [f64]> {
        if self.sorted {
            Cow::Borrowed(&self.samples)
        } else {
            let mut samples = self.samples.clone();
            samples.sort_by(f64::total_cmp);
            Cow::Owned(samples)
        }
    }

    pub fn avg(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.samples.iter().copied().min_by(f64::total_cmp)
    }

    pub fn max(&self) -> Option<f64> {
        self.samples.iter().copied().max_by(f64::total_cmp)
    }

    pub fn med(&self) -> Option<f64> {
        self.percentile(50.0)
    }

    /// Nearest-rank percentile, `p` in `0..=100`.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let samples = self.sorted_samples();
        if samples.is_empty() {
            return None;
        }
        let rank = ((p.clamp(0.0, 100.0) / 100.0) * samples.len() as f64).ceil() as usize;
        Some(samples[rank.saturating_sub(1).min(samples.len() - 1)])
    }

    pub fn summary(&self) -> TrendSummary {
        TrendSummary {
            count: self.count(),
            avg: self.avg(),
            min: self.min(),
            med: self.med(),
            max: self.max(),
            p90: self.percentile(90.0),
            p95: self.percentile(95.0),
        }
    }
}

/// Serializable aggregate of a [`Trend`].
#[derive(Debug, Clone, Serialize)]
pub struct TrendSummary {
    pub count: usize,
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub med: Option<f64>,
    pub max: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
}

/// Fraction of true samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateTally {
    pub trues: u64,
    pub total: u64,
}

impl RateTally {
    pub fn add(&mut self, value: bool) {
        self.total += 1;
        if value {
            self.trues += 1;
        }
    }

    pub fn rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.trues as f64 / self.total as f64)
        }
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    http_reqs: u64,
    http_req_duration: Trend,
    http_req_failed: RateTally,
    iterations: u64,
    iteration_errors: u64,
    iteration_duration: Trend,
}

/// Metrics shared by all virtual users of one run.
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    checks: CheckSet,
    inner: Mutex<MetricsInner>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            checks: CheckSet::new(),
            inner: Mutex::new(MetricsInner::default()),
        }
    }

    /// Check aggregation for this run.
    pub fn checks(&self) -> &CheckSet {
        &self.checks
    }

    /// Record one completed (or failed) HTTP request.
    pub fn record_request(&self, response: &LoadResponse) {
        let mut inner = self.inner.lock();
        inner.http_reqs += 1;
        inner
            .http_req_duration
            .add(response.timings.duration_ms());
        inner.http_req_failed.add(response.failed());
    }

    /// Record one finished iteration.
    pub fn record_iteration(&self, duration: Duration, errored: bool) {
        let mut inner = self.inner.lock();
        inner.iterations += 1;
        if errored {
            inner.iteration_errors += 1;
        }
        inner
            .iteration_duration
            .add(duration.as_nanos() as f64 / 1_000_000.0);
    }

    /// Point-in-time copy of every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (passes, total) = self.checks.totals();
        let inner = self.inner.lock();
        MetricsSnapshot {
            elapsed: self.started.elapsed(),
            checks: RateTally {
                trues: passes,
                total,
            },
            check_tallies: self.checks.tallies(),
            http_reqs: inner.http_reqs,
            http_req_duration: inner.http_req_duration.clone().into_sorted(),
            http_req_failed: inner.http_req_failed,
            iterations: inner.iterations,
            iteration_errors: inner.iteration_errors,
            iteration_duration: inner.iteration_duration.clone().into_sorted(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only values of all built-in metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub elapsed: Duration,
    pub checks: RateTally,
    pub check_tallies: Vec<CheckTally>,
    pub http_reqs: u64,
    pub http_req_duration: Trend,
    pub http_req_failed: RateTally,
    pub iterations: u64,
    pub iteration_errors: u64,
    pub iteration_duration: Trend,
}

impl MetricsSnapshot {
    /// Counter value per second of elapsed run time.
    pub fn per_second(&self, count: u64) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            Some(count as f64 / secs)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_aggregations() {
        let mut trend = Trend::new();
        for v in [40.0, 10.0, 30.0, 20.0, 50.0] {
            trend.add(v);
        }

        assert_eq!(trend.count(), 5);
        assert_eq!(trend.avg(), Some(30.0));
        assert_eq!(trend.min(), Some(10.0));
        assert_eq!(trend.max(), Some(50.0));
        assert_eq!(trend.med(), Some(30.0));
        assert_eq!(trend.percentile(95.0), Some(50.0));
        assert_eq!(trend.percentile(20.0), Some(10.0));
        assert_eq!(trend.percentile(0.0), Some(10.0));
    }

    #[test]
    fn test_empty_trend() {
        let trend = Trend::new();
        assert_eq!(trend.avg(), None);
        assert_eq!(trend.percentile(99.0), None);
    }

    #[test]
    fn test_snapshot_reflects_requests_and_checks() {
        let metrics = Metrics::new();
        metrics.record_request(&LoadResponse::new(200, Duration::from_millis(12)));
        metrics.record_request(&LoadResponse::new(500, Duration::from_millis(30)));
        metrics.checks().record("status was 200", true);
        metrics.checks().record("status was 200", false);
        metrics.record_iteration(Duration::from_millis(110), false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.http_reqs, 2);
        assert_eq!(snapshot.http_req_failed.rate(), Some(0.5));
        assert_eq!(snapshot.checks.rate(), Some(0.5));
        assert_eq!(snapshot.iterations, 1);
        assert_eq!(snapshot.http_req_duration.max(), Some(30.0));
    }
}
