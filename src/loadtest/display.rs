//! Live terminal display for load test progress.
//!
//! Renders a single in-place updating line on stderr showing active users,
//! requests per second, P95 latency, failures and elapsed time. Refreshed
//! from a watch channel every 2 seconds, not per request.

use crate::loadtest::engine::DisplayState;
use crate::loadtest::metrics::MetricsSnapshot;
use crate::loadtest::vu::ActiveVuCounter;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Spinner-backed status line.
pub struct LiveDisplay {
    status_bar: ProgressBar,
}

impl LiveDisplay {
    pub fn new() -> Self {
        let status_bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {wide_msg}") {
            status_bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        status_bar.enable_steady_tick(Duration::from_millis(100));
        Self { status_bar }
    }

    /// Format one status line.
    ///
    /// Failures are shown in red once there is at least one, and P95 in
    /// yellow above one second.
    pub fn format_status(
        snap: &MetricsSnapshot,
        elapsed: Duration,
        active_vus: u32,
        target_vus: u32,
        label: &str,
    ) -> String {
        let elapsed_secs = elapsed.as_secs_f64();
        let rps = if elapsed_secs > 0.0 {
            snap.total_requests as f64 / elapsed_secs
        } else {
            0.0
        };

        let vu_display = format!("{active_vus}/{target_vus}").green();
        let rps_display = format!("{rps:.1}").green();
        let p95_str = format!("{}ms", snap.p95);
        let p95_display = if snap.p95 > 1000 {
            p95_str.yellow().to_string()
        } else {
            p95_str.green().to_string()
        };
        let failures = format!("{}", snap.error_count);
        let failure_rate = format!("{:.1}%", snap.error_rate * 100.0);
        let failure_display = if snap.error_count > 0 {
            format!("{} ({})", failures.red(), failure_rate.red())
        } else {
            format!("{failures} ({failure_rate})")
        };

        format!(
            "  [{label}]  users: {vu_display}  |  rps: {rps_display}  |  p95: {p95_display}  |  failures: {failure_display}  |  elapsed: {}s",
            elapsed.as_secs()
        )
    }

    pub fn update(&self, line: String) {
        self.status_bar.set_message(line);
    }

    pub fn finish(&self) {
        self.status_bar.finish_and_clear();
    }
}

impl Default for LiveDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the live display until cancelled or the watch sender is dropped.
pub async fn display_loop(
    mut display_rx: watch::Receiver<DisplayState>,
    active_vus: ActiveVuCounter,
    target_vus: u32,
    cancel: CancellationToken,
    test_start: Instant,
) {
    let display = LiveDisplay::new();

    eprintln!();
    eprintln!("  Running load test...");
    eprintln!();

    let render = |state: &DisplayState| {
        LiveDisplay::format_status(
            &state.snapshot,
            test_start.elapsed(),
            active_vus.get(),
            target_vus,
            &state.label,
        )
    };

    loop {
        tokio::select! {
            result = display_rx.changed() => {
                if result.is_err() {
                    break;
                }
                let state = display_rx.borrow_and_update().clone();
                display.update(render(&state));
            }
            _ = cancel.cancelled() => {
                let state = display_rx.borrow().clone();
                display.update(render(&state));
                break;
            }
        }
    }

    display.finish();
}
