//! Terminal summary renderer for load test results.
//!
//! [`render_summary`] is a pure function: structured data in, formatted
//! [`String`] out. Colors come from the `colored` crate and respect the
//! global override the CLI sets for `--no-color` or piped stdout.

use colored::Colorize;

use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::engine::LoadTestResult;

/// Width for dotted metric row padding.
const PAD_WIDTH: usize = 40;

/// Width of the task-name column in the per-task and failure tables.
const NAME_WIDTH: usize = 52;

/// Render the end-of-run summary.
///
/// # Layout
///
/// ```text
///   catalog-loadtest: catalog
///
///   target:    http://localhost:8080
///   users:     10
///   duration:  60s
///   cases:     8
///
///   http_req_duration.......................: p50=4ms  p95=12ms  p99=30ms
///   http_req_passed.........................: 950
///   http_req_failed.........................: 50
///   ...
///
///   failures:
///   count  task                                                  reason
///   ───────────────────────────────────────────────────────────────────
///      50  GET /v1/products/:id [500]                            HTTP 200 (expected 500)
/// ```
pub fn render_summary(result: &LoadTestResult, config: &LoadTestConfig, url: &str, cases: usize) -> String {
    let snap = &result.snapshot;
    let mut lines = Vec::new();

    lines.push(render_header(config, url, cases));

    let latency_value = format!("p50={}ms  p95={}ms  p99={}ms", snap.p50, snap.p95, snap.p99);
    let latency_colored = if snap.p99 < 1000 {
        latency_value.green().to_string()
    } else {
        latency_value.yellow().to_string()
    };
    lines.push(format_metric_row("http_req_duration", &latency_colored));

    if snap.error_count > 0 {
        lines.push(format_metric_row(
            "http_req_failed_duration",
            &format!(
                "p50={}ms  p95={}ms  p99={}ms",
                snap.error_p50, snap.error_p95, snap.error_p99
            ),
        ));
    }

    lines.push(format_metric_row(
        "http_req_passed",
        &snap.success_count.to_string().green().to_string(),
    ));

    let failed = if snap.error_count > 0 {
        snap.error_count.to_string().red().to_string()
    } else {
        snap.error_count.to_string()
    };
    lines.push(format_metric_row("http_req_failed", &failed));

    let rate_pct = snap.error_rate * 100.0;
    let rate_str = format!("{rate_pct:.1}%");
    let rate_colored = if rate_pct > 5.0 {
        rate_str.red().to_string()
    } else if rate_pct > 1.0 {
        rate_str.yellow().to_string()
    } else {
        rate_str.green().to_string()
    };
    lines.push(format_metric_row("http_req_failure_rate", &rate_colored));

    let elapsed_secs = result.elapsed.as_secs_f64();
    let throughput = per_second(snap.total_requests, elapsed_secs);
    lines.push(format_metric_row(
        "http_req_throughput",
        &format!("{throughput:.1} req/s").green().to_string(),
    ));
    lines.push(format_metric_row(
        "http_req_total",
        &snap.total_requests.to_string(),
    ));
    lines.push(format_metric_row(
        "http_req_elapsed",
        &format!("{elapsed_secs:.1}s"),
    ));

    if !snap.error_category_counts.is_empty() {
        lines.push(String::new());
        lines.push("  failure categories:".to_string());
        let mut categories: Vec<_> = snap.error_category_counts.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (category, count) in categories {
            lines.push(format_metric_row(
                &format!("    {category}"),
                &count.to_string().red().to_string(),
            ));
        }
    }

    if !snap.per_task.is_empty() {
        lines.push(String::new());
        lines.push("  per-task metrics:".to_string());
        lines.push(String::new());
        lines.push(format!(
            "  {:<NAME_WIDTH$} {:>7} {:>9} {:>7} {:>7} {:>7} {:>7}",
            "task", "reqs", "rate", "fail%", "p50", "p95", "p99"
        ));
        lines.push(format!("  {}", "\u{2500}".repeat(NAME_WIDTH + 51)));

        for task in &snap.per_task {
            let fail_pct = task.error_rate * 100.0;
            let fail_str = format!("{fail_pct:.1}%");
            let fail_colored = if fail_pct > 5.0 {
                fail_str.red().to_string()
            } else if fail_pct > 1.0 {
                fail_str.yellow().to_string()
            } else {
                fail_str.green().to_string()
            };
            lines.push(format!(
                "  {:<NAME_WIDTH$} {:>7} {:>9} {:>7} {:>7} {:>7} {:>7}",
                truncate(&task.name),
                task.total_requests,
                format!("{:.1}/s", per_second(task.total_requests, elapsed_secs)),
                fail_colored,
                format!("{}ms", task.p50),
                format!("{}ms", task.p95),
                format!("{}ms", task.p99),
            ));
        }
    }

    if !snap.failures.is_empty() {
        lines.push(String::new());
        lines.push("  failures:".to_string());
        lines.push(format!("  {:>7}  {:<NAME_WIDTH$}  reason", "count", "task"));
        lines.push(format!("  {}", "\u{2500}".repeat(NAME_WIDTH + 30)));
        for failure in &snap.failures {
            lines.push(format!(
                "  {:>7}  {:<NAME_WIDTH$}  {}",
                failure.count.to_string().red(),
                truncate(&failure.task),
                failure.reason,
            ));
        }
    }

    lines.join("\n")
}

fn render_header(config: &LoadTestConfig, url: &str, cases: usize) -> String {
    format!(
        "\n  {}\n\n  target:    {url}\n  users:     {}\n  duration:  {}s\n  cases:     {cases}\n",
        format!("catalog-loadtest: {}", config.scenario).bold(),
        config.settings.virtual_users,
        config.settings.duration_secs,
    )
}

/// Produces `"  metric_name..................: value"`.
fn format_metric_row(name: &str, value: &str) -> String {
    format!("  {name:.<PAD_WIDTH$}: {value}")
}

fn per_second(count: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        count as f64 / elapsed_secs
    } else {
        0.0
    }
}

fn truncate(name: &str) -> String {
    if name.chars().count() > NAME_WIDTH {
        let head: String = name.chars().take(NAME_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadtest::catalog::Method;
    use crate::loadtest::config::ScenarioKind;
    use crate::loadtest::metrics::{FailureCount, MetricsSnapshot, TaskSnapshot};
    use std::collections::HashMap;
    use std::time::Duration;

    fn setup_no_color() {
        colored::control::set_override(false);
    }

    fn result(snapshot: MetricsSnapshot) -> LoadTestResult {
        LoadTestResult {
            snapshot,
            elapsed: Duration::from_secs(10),
            final_active_vus: 0,
        }
    }

    fn task(name: &str, total: u64, errors: u64) -> TaskSnapshot {
        TaskSnapshot {
            name: name.to_string(),
            method: Method::Get,
            p50: 4,
            p95: 9,
            p99: 12,
            min: 1,
            max: 20,
            mean: 5.0,
            total_requests: total,
            success_count: total - errors,
            error_count: errors,
            error_rate: errors as f64 / total as f64,
            error_categories: HashMap::new(),
        }
    }

    #[test]
    fn test_summary_header_and_rows() {
        setup_no_color();
        let config = LoadTestConfig::preset(ScenarioKind::Catalog);
        let snap = MetricsSnapshot {
            p50: 4,
            p95: 9,
            p99: 12,
            success_count: 100,
            total_requests: 100,
            ..MetricsSnapshot::empty()
        };
        let out = render_summary(&result(snap), &config, "http://localhost:8080", 8);

        assert!(out.contains("catalog-loadtest: catalog"));
        assert!(out.contains("target:    http://localhost:8080"));
        assert!(out.contains("users:     10"));
        assert!(out.contains("cases:     8"));
        assert!(out.contains("p50=4ms  p95=9ms  p99=12ms"));
        assert!(out.contains("http_req_throughput"));
        assert!(out.contains("10.0 req/s"));
        assert!(!out.contains("failures:"));
        assert!(!out.contains("http_req_failed_duration"));
    }

    #[test]
    fn test_metric_row_padding() {
        let row = format_metric_row("http_req_total", "42");
        assert_eq!(row, format!("  http_req_total{}: 42", ".".repeat(PAD_WIDTH - 14)));
    }

    #[test]
    fn test_summary_failure_table() {
        setup_no_color();
        let config = LoadTestConfig::preset(ScenarioKind::Catalog);
        let mut categories = HashMap::new();
        categories.insert("http".to_string(), 7);
        let snap = MetricsSnapshot {
            success_count: 13,
            error_count: 7,
            total_requests: 20,
            error_rate: 0.35,
            error_category_counts: categories,
            per_task: vec![task("GET /v1/products/:id [500]", 20, 7)],
            failures: vec![FailureCount {
                task: "GET /v1/products/:id [500]".to_string(),
                reason: "HTTP 200 (expected 500)".to_string(),
                count: 7,
            }],
            ..MetricsSnapshot::empty()
        };
        let out = render_summary(&result(snap), &config, "http://localhost:8080", 8);

        assert!(out.contains("failure categories:"));
        assert!(out.contains("35.0%"));
        assert!(out.contains("per-task metrics:"));
        assert!(out.contains("failures:"));
        let row = out
            .lines()
            .find(|l| l.contains("HTTP 200 (expected 500)"))
            .expect("failure row");
        assert!(row.contains("GET /v1/products/:id [500]"));
        assert!(row.trim_start().starts_with('7'));
    }

    #[test]
    fn test_truncate_long_names() {
        let long = "x".repeat(NAME_WIDTH + 10);
        let t = truncate(&long);
        assert_eq!(t.chars().count(), NAME_WIDTH);
        assert!(t.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }
}
