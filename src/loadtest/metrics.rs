//! HdrHistogram-based metrics pipeline with coordinated omission correction.
//!
//! [`MetricsRecorder`] ingests one [`RequestSample`] per executed request and
//! keeps:
//!
//! - separate success and failure latency histograms, so a burst of slow
//!   timeouts does not pollute success percentiles;
//! - logical pass/fail counts (one per request, never inflated by the
//!   synthetic fill-ins `record_correct()` adds to the histograms);
//! - per-method, per-category and per-task breakdowns;
//! - a `(task, reason)` failure table for the end-of-run summary.
//!
//! The recorder is single-owner. Simulated users send samples over an mpsc
//! channel to one aggregator task that owns it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;

use crate::loadtest::catalog::Method;
use crate::loadtest::error::RequestFailure;
use crate::loadtest::executor::CaseOutcome;

/// A single request measurement.
pub struct RequestSample {
    pub method: Method,
    /// Name of the request case that produced this sample.
    pub task: String,
    pub duration: Duration,
    pub result: Result<(), RequestFailure>,
    pub timestamp: Instant,
}

impl RequestSample {
    pub fn success(method: Method, task: impl Into<String>, duration: Duration) -> Self {
        Self {
            method,
            task: task.into(),
            duration,
            result: Ok(()),
            timestamp: Instant::now(),
        }
    }

    pub fn failure(
        method: Method,
        task: impl Into<String>,
        duration: Duration,
        err: RequestFailure,
    ) -> Self {
        Self {
            method,
            task: task.into(),
            duration,
            result: Err(err),
            timestamp: Instant::now(),
        }
    }

    pub fn from_outcome(task: impl Into<String>, outcome: CaseOutcome) -> Self {
        Self {
            method: outcome.method,
            task: task.into(),
            duration: outcome.duration,
            result: outcome.result,
            timestamp: Instant::now(),
        }
    }
}

/// Per-task metrics snapshot, sorted by name in [`MetricsSnapshot::per_task`].
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub name: String,
    pub method: Method,
    /// Success latency P50 (milliseconds).
    pub p50: u64,
    /// Success latency P95 (milliseconds).
    pub p95: u64,
    /// Success latency P99 (milliseconds).
    pub p99: u64,
    /// Minimum latency across passes and failures (milliseconds).
    pub min: u64,
    /// Maximum latency across passes and failures (milliseconds).
    pub max: u64,
    /// Mean latency across passes and failures (milliseconds).
    pub mean: f64,
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Fraction of this task's requests that failed (0.0..=1.0).
    pub error_rate: f64,
    pub error_categories: HashMap<String, u64>,
}

/// One row of the failure table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureCount {
    pub task: String,
    pub reason: String,
    pub count: u64,
}

/// Point-in-time snapshot of all metrics state. Latencies are in milliseconds.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
    pub error_p50: u64,
    pub error_p95: u64,
    pub error_p99: u64,
    /// Requests that passed validation.
    pub success_count: u64,
    /// Requests that failed validation or never got a response.
    pub error_count: u64,
    pub total_requests: u64,
    /// Fraction of requests that failed (0.0..=1.0).
    pub error_rate: f64,
    pub method_counts: HashMap<Method, u64>,
    pub method_errors: HashMap<Method, u64>,
    /// Failure counts by category (http, parse, contract, timeout, connection).
    pub error_category_counts: HashMap<String, u64>,
    /// Per-task metrics, sorted by task name.
    pub per_task: Vec<TaskSnapshot>,
    /// Failures grouped by `(task, reason)`, most frequent first.
    pub failures: Vec<FailureCount>,
}

impl MetricsSnapshot {
    /// Snapshot of a recorder that has seen nothing.
    pub fn empty() -> Self {
        MetricsRecorder::new(1).snapshot()
    }
}

fn latency_histogram() -> Histogram<u64> {
    let mut histogram = Histogram::<u64>::new(3).expect("3 sigfigs is always valid");
    histogram.auto(true);
    histogram
}

fn quantile(histogram: &Histogram<u64>, q: f64) -> u64 {
    if histogram.is_empty() {
        0
    } else {
        histogram.value_at_quantile(q)
    }
}

fn rate(errors: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        errors as f64 / total as f64
    }
}

/// Success/failure histogram pair with logical counts.
struct LatencyBuckets {
    success: Histogram<u64>,
    failure: Histogram<u64>,
    total_success: u64,
    total_errors: u64,
    error_category_counts: HashMap<String, u64>,
}

impl LatencyBuckets {
    fn new() -> Self {
        Self {
            success: latency_histogram(),
            failure: latency_histogram(),
            total_success: 0,
            total_errors: 0,
            error_category_counts: HashMap::new(),
        }
    }

    fn record(&mut self, ms: u64, expected_interval_ms: u64, result: &Result<(), RequestFailure>) {
        match result {
            Ok(()) => {
                let _ = self.success.record_correct(ms, expected_interval_ms);
                self.total_success += 1;
            },
            Err(err) => {
                let _ = self.failure.record_correct(ms, expected_interval_ms);
                self.total_errors += 1;
                *self
                    .error_category_counts
                    .entry(err.error_category().to_owned())
                    .or_insert(0) += 1;
            },
        }
    }

    fn total(&self) -> u64 {
        self.total_success + self.total_errors
    }

    /// Min/max/mean over both histograms.
    fn spread(&self) -> (u64, u64, f64) {
        let (s, f) = (self.success.len(), self.failure.len());
        match (s > 0, f > 0) {
            (true, true) => (
                self.success.min().min(self.failure.min()),
                self.success.max().max(self.failure.max()),
                (self.success.mean() * s as f64 + self.failure.mean() * f as f64) / (s + f) as f64,
            ),
            (true, false) => (self.success.min(), self.success.max(), self.success.mean()),
            (false, true) => (self.failure.min(), self.failure.max(), self.failure.mean()),
            (false, false) => (0, 0, 0.0),
        }
    }
}

struct TaskMetrics {
    method: Method,
    buckets: LatencyBuckets,
}

/// HdrHistogram-backed metrics recorder.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use catalog_loadtest::loadtest::catalog::Method;
/// use catalog_loadtest::loadtest::metrics::{MetricsRecorder, RequestSample};
///
/// let mut recorder = MetricsRecorder::new(100);
/// recorder.record(&RequestSample::success(Method::Get, "GET /health", Duration::from_millis(42)));
///
/// assert_eq!(recorder.success_count(), 1);
/// assert_eq!(recorder.p50(), 42);
/// ```
pub struct MetricsRecorder {
    overall: LatencyBuckets,
    /// Expected interval between requests, for `record_correct()`.
    expected_interval_ms: u64,
    method_counts: HashMap<Method, u64>,
    method_errors: HashMap<Method, u64>,
    per_task: HashMap<String, TaskMetrics>,
    failures: HashMap<(String, String), u64>,
}

impl MetricsRecorder {
    /// Create a recorder with the given expected request interval.
    ///
    /// When a request takes much longer than `expected_interval_ms`,
    /// synthetic samples are filled into the histograms for the requests
    /// that would have been sent during the stall.
    pub fn new(expected_interval_ms: u64) -> Self {
        Self {
            overall: LatencyBuckets::new(),
            expected_interval_ms,
            method_counts: HashMap::new(),
            method_errors: HashMap::new(),
            per_task: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn record(&mut self, sample: &RequestSample) {
        let ms = sample.duration.as_millis() as u64;

        *self.method_counts.entry(sample.method).or_insert(0) += 1;
        self.overall
            .record(ms, self.expected_interval_ms, &sample.result);

        if let Err(ref err) = sample.result {
            *self.method_errors.entry(sample.method).or_insert(0) += 1;
            *self
                .failures
                .entry((sample.task.clone(), err.to_string()))
                .or_insert(0) += 1;
        }

        let task = self
            .per_task
            .entry(sample.task.clone())
            .or_insert_with(|| TaskMetrics {
                method: sample.method,
                buckets: LatencyBuckets::new(),
            });
        task.buckets
            .record(ms, self.expected_interval_ms, &sample.result);
    }

    pub fn p50(&self) -> u64 {
        quantile(&self.overall.success, 0.50)
    }

    pub fn p95(&self) -> u64 {
        quantile(&self.overall.success, 0.95)
    }

    pub fn p99(&self) -> u64 {
        quantile(&self.overall.success, 0.99)
    }

    pub fn error_p50(&self) -> u64 {
        quantile(&self.overall.failure, 0.50)
    }

    pub fn error_p95(&self) -> u64 {
        quantile(&self.overall.failure, 0.95)
    }

    pub fn error_p99(&self) -> u64 {
        quantile(&self.overall.failure, 0.99)
    }

    /// Requests that passed (one per `record()` call).
    pub fn success_count(&self) -> u64 {
        self.overall.total_success
    }

    /// Requests that failed (one per `record()` call).
    pub fn error_count(&self) -> u64 {
        self.overall.total_errors
    }

    pub fn total_requests(&self) -> u64 {
        self.overall.total()
    }

    /// Histogram entries in the success bucket, including synthetic fill-ins.
    pub fn corrected_success_samples(&self) -> u64 {
        self.overall.success.len()
    }

    pub fn error_rate(&self) -> f64 {
        rate(self.error_count(), self.total_requests())
    }

    pub fn method_count(&self, method: Method) -> u64 {
        self.method_counts.get(&method).copied().unwrap_or(0)
    }

    /// Capture a self-contained snapshot that can cross threads.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut per_task: Vec<TaskSnapshot> = self
            .per_task
            .iter()
            .map(|(name, task)| {
                let b = &task.buckets;
                let (min, max, mean) = b.spread();
                TaskSnapshot {
                    name: name.clone(),
                    method: task.method,
                    p50: quantile(&b.success, 0.50),
                    p95: quantile(&b.success, 0.95),
                    p99: quantile(&b.success, 0.99),
                    min,
                    max,
                    mean,
                    total_requests: b.total(),
                    success_count: b.total_success,
                    error_count: b.total_errors,
                    error_rate: rate(b.total_errors, b.total()),
                    error_categories: b.error_category_counts.clone(),
                }
            })
            .collect();
        per_task.sort_by(|a, b| a.name.cmp(&b.name));

        let mut failures: Vec<FailureCount> = self
            .failures
            .iter()
            .map(|((task, reason), count)| FailureCount {
                task: task.clone(),
                reason: reason.clone(),
                count: *count,
            })
            .collect();
        failures.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.task.cmp(&b.task))
                .then_with(|| a.reason.cmp(&b.reason))
        });

        MetricsSnapshot {
            p50: self.p50(),
            p95: self.p95(),
            p99: self.p99(),
            error_p50: self.error_p50(),
            error_p95: self.error_p95(),
            error_p99: self.error_p99(),
            success_count: self.success_count(),
            error_count: self.error_count(),
            total_requests: self.total_requests(),
            error_rate: self.error_rate(),
            method_counts: self.method_counts.clone(),
            method_errors: self.method_errors.clone(),
            error_category_counts: self.overall.error_category_counts.clone(),
            per_task,
            failures,
        }
    }
}
