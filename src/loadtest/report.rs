//! JSON report serialization for load test results.
//!
//! Produces a schema-versioned JSON file with latency percentiles,
//! throughput, failure classification, per-task breakdown and the fully
//! resolved config, for CI consumption and run-to-run comparison.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::loadtest::catalog::{Method, Scenario};
use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::engine::LoadTestResult;

/// Report format version. Bump on breaking changes to the structure.
const SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Serialize)]
pub struct LoadTestReport {
    pub schema_version: String,
    /// RFC 3339 timestamp of report generation.
    pub timestamp: String,
    pub scenario: String,
    pub target_url: String,
    /// Actual test duration in seconds.
    pub duration_secs: f64,
    /// Resolved configuration with CLI overrides applied.
    pub config: serde_json::Value,
    /// Request cases the run drew from.
    pub cases: serde_json::Value,
    pub metrics: ReportMetrics,
    /// Failure counts by category.
    pub errors: BTreeMap<String, u64>,
    pub per_task: BTreeMap<String, TaskReportMetrics>,
    /// Failures grouped by task and reason, most frequent first.
    pub failures: Vec<FailureReport>,
}

#[derive(Debug, Serialize)]
pub struct ReportMetrics {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Failure rate as a fraction (0.0..=1.0).
    pub error_rate: f64,
    pub throughput_rps: f64,
    pub latency: LatencyMetrics,
    /// Request counts keyed by HTTP method.
    pub method_counts: BTreeMap<String, u64>,
    pub method_errors: BTreeMap<String, u64>,
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Serialize)]
pub struct LatencyMetrics {
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub error_p50_ms: u64,
    pub error_p95_ms: u64,
    pub error_p99_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct TaskReportMetrics {
    pub method: String,
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub latency: TaskLatencyMetrics,
    pub errors: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct TaskLatencyMetrics {
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct FailureReport {
    pub task: String,
    pub reason: String,
    pub count: u64,
}

impl LoadTestReport {
    pub fn from_result(
        result: &LoadTestResult,
        config: &LoadTestConfig,
        scenario: &Scenario,
        url: &str,
    ) -> Self {
        let snap = &result.snapshot;
        let elapsed_secs = result.elapsed.as_secs_f64();
        let throughput_rps = if elapsed_secs > 0.0 {
            snap.total_requests as f64 / elapsed_secs
        } else {
            0.0
        };

        let per_task = snap
            .per_task
            .iter()
            .map(|task| {
                (
                    task.name.clone(),
                    TaskReportMetrics {
                        method: task.method.to_string(),
                        total_requests: task.total_requests,
                        success_count: task.success_count,
                        error_count: task.error_count,
                        error_rate: task.error_rate,
                        latency: TaskLatencyMetrics {
                            p50_ms: task.p50,
                            p95_ms: task.p95,
                            p99_ms: task.p99,
                            min_ms: task.min,
                            max_ms: task.max,
                            mean_ms: task.mean,
                        },
                        errors: task.error_categories.clone().into_iter().collect(),
                    },
                )
            })
            .collect();

        let failures = snap
            .failures
            .iter()
            .map(|f| FailureReport {
                task: f.task.clone(),
                reason: f.reason.clone(),
                count: f.count,
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            scenario: config.scenario.to_string(),
            target_url: url.to_string(),
            duration_secs: elapsed_secs,
            config: serde_json::to_value(config).unwrap_or(serde_json::Value::Null),
            cases: serde_json::to_value(&scenario.cases).unwrap_or(serde_json::Value::Null),
            metrics: ReportMetrics {
                total_requests: snap.total_requests,
                success_count: snap.success_count,
                error_count: snap.error_count,
                error_rate: snap.error_rate,
                throughput_rps,
                latency: LatencyMetrics {
                    p50_ms: snap.p50,
                    p95_ms: snap.p95,
                    p99_ms: snap.p99,
                    error_p50_ms: snap.error_p50,
                    error_p95_ms: snap.error_p95,
                    error_p99_ms: snap.error_p99,
                },
                method_counts: by_method(&snap.method_counts),
                method_errors: by_method(&snap.method_errors),
            },
            errors: snap.error_category_counts.clone().into_iter().collect(),
            per_task,
            failures,
        }
    }
}

fn by_method(counts: &HashMap<Method, u64>) -> BTreeMap<String, u64> {
    counts
        .iter()
        .map(|(method, count)| (method.to_string(), *count))
        .collect()
}

/// Write a report to `<base_dir>/.loadtest/reports/`, creating the directory
/// if needed. Returns the path of the written file.
pub fn write_report(report: &LoadTestReport, base_dir: &Path) -> Result<PathBuf, std::io::Error> {
    let reports_dir = base_dir.join(".loadtest").join("reports");
    std::fs::create_dir_all(&reports_dir)?;

    let report_path = reports_dir.join(report_filename(&report.scenario, &chrono::Utc::now()));
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(&report_path, json)?;

    Ok(report_path)
}

/// `loadtest-<scenario>-YYYY-MM-DDTHH-MM-SS.json`; hyphens, not colons, so
/// the name is valid on Windows.
pub fn report_filename(scenario: &str, timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    format!(
        "loadtest-{scenario}-{}.json",
        timestamp.format("%Y-%m-%dT%H-%M-%S")
    )
}
