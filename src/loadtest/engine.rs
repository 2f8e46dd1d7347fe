//! Load test execution engine with metrics aggregation and graceful shutdown.
//!
//! [`LoadTestEngine`] is the top-level orchestrator that:
//! - Spawns N virtual user tasks via [`tokio_util::task::TaskTracker`]
//! - Collects metrics through a bounded mpsc channel
//! - Publishes snapshots through a watch channel for live display
//! - Coordinates graceful shutdown via [`CancellationToken`]
//!
//! All users start immediately and run until the first of: duration
//! elapsed, iteration limit reached, or Ctrl+C.

use crate::loadtest::catalog::Scenario;
use crate::loadtest::client::CatalogClient;
use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::display::display_loop;
use crate::loadtest::error::LoadTestError;
use crate::loadtest::metrics::{MetricsRecorder, MetricsSnapshot, RequestSample};
use crate::loadtest::vu::{vu_loop, ActiveVuCounter, IterationBudget};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Compile-time Send bounds verification for channel-transported types.
fn _assert_send<T: Send>() {}
#[allow(dead_code)]
fn _check_send_bounds() {
    _assert_send::<RequestSample>();
    _assert_send::<MetricsSnapshot>();
    _assert_send::<DisplayState>();
}

/// State published through the watch channel to the live display.
#[derive(Debug, Clone)]
pub struct DisplayState {
    pub snapshot: MetricsSnapshot,
    /// Short label shown in front of the status line (the scenario name).
    pub label: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct LoadTestResult {
    pub snapshot: MetricsSnapshot,
    pub elapsed: Duration,
    /// VUs still active at the end; zero after a clean shutdown.
    pub final_active_vus: u32,
}

/// Load test engine configuration and entry point.
pub struct LoadTestEngine {
    config: LoadTestConfig,
    scenario: Arc<Scenario>,
    base_url: String,
    max_iterations: Option<u64>,
    live_display: bool,
}

impl LoadTestEngine {
    /// Creates an engine for `config`, building its scenario.
    pub fn new(config: LoadTestConfig, base_url: String) -> Self {
        let scenario = Arc::new(Scenario::from_config(&config));
        Self {
            config,
            scenario,
            base_url,
            max_iterations: None,
            live_display: true,
        }
    }

    /// Stop after this many requests across all VUs (first-limit-wins with
    /// duration).
    pub fn with_iterations(mut self, n: u64) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Enable or disable the live status line on stderr.
    pub fn with_live_display(mut self, enabled: bool) -> Self {
        self.live_display = enabled;
        self
    }

    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_iterations(&self) -> Option<u64> {
        self.max_iterations
    }

    /// Run the load test and return the final metrics.
    pub async fn run(&self) -> Result<LoadTestResult, LoadTestError> {
        self.config.validate()?;

        let settings = &self.config.settings;
        let vu_count = settings.virtual_users;
        let client = CatalogClient::new(&self.base_url, settings.timeout_as_duration())?;
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let active_vus = ActiveVuCounter::new();
        let budget = self.max_iterations.map(IterationBudget::new);

        let buffer_size = (vu_count as usize) * 100;
        let (sample_tx, sample_rx) = mpsc::channel::<RequestSample>(buffer_size);
        let expected_interval_ms = settings.expected_interval_ms;
        let label = self.config.scenario.to_string();
        let (display_tx, display_rx) = watch::channel(DisplayState {
            snapshot: MetricsSnapshot::empty(),
            label: label.clone(),
        });

        tracing::info!(
            scenario = %label,
            users = vu_count,
            duration_secs = settings.duration_secs,
            iterations = ?self.max_iterations,
            host = %client.base_url(),
            "starting load test"
        );

        let test_start = Instant::now();
        for i in 0..vu_count {
            tracker.spawn(vu_loop(
                i,
                self.scenario.clone(),
                self.config.wait.clone(),
                client.clone(),
                sample_tx.clone(),
                cancel.clone(),
                budget.clone(),
                active_vus.clone(),
            ));
        }

        // VUs hold their own clones; the aggregator ends once they all exit.
        drop(sample_tx);

        let aggregator_handle = tokio::spawn(metrics_aggregator(
            sample_rx,
            display_tx,
            expected_interval_ms,
            label,
        ));

        let display_handle = self.live_display.then(|| {
            tokio::spawn(display_loop(
                display_rx.clone(),
                active_vus.clone(),
                vu_count,
                cancel.clone(),
                test_start,
            ))
        });

        // Spawned so a second Ctrl+C is still seen while VUs drain.
        let ctrl_c_handle = tokio::spawn(handle_ctrl_c(cancel.clone()));

        let duration = Duration::from_secs(settings.duration_secs);
        tokio::select! {
            _ = tokio::time::sleep(duration) => {
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }

        tracker.close();
        tracker.wait().await;

        let _ = aggregator_handle.await;
        if let Some(handle) = display_handle {
            let _ = handle.await;
        }
        ctrl_c_handle.abort();

        let snapshot = display_rx.borrow().snapshot.clone();
        tracing::info!(
            total = snapshot.total_requests,
            failures = snapshot.error_count,
            "load test finished"
        );

        Ok(LoadTestResult {
            snapshot,
            elapsed: test_start.elapsed(),
            final_active_vus: active_vus.get(),
        })
    }
}

/// Consume samples until every sender is dropped, publishing a
/// [`DisplayState`] every 2 seconds and once more at the end.
///
/// `biased;` keeps the tick branch from starving under a busy channel.
async fn metrics_aggregator(
    mut sample_rx: mpsc::Receiver<RequestSample>,
    display_tx: watch::Sender<DisplayState>,
    expected_interval_ms: u64,
    label: String,
) {
    let mut recorder = MetricsRecorder::new(expected_interval_ms);
    let mut tick = tokio::time::interval(Duration::from_secs(2));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = tick.tick() => {
                while let Ok(sample) = sample_rx.try_recv() {
                    recorder.record(&sample);
                }
                let _ = display_tx.send(DisplayState {
                    snapshot: recorder.snapshot(),
                    label: label.clone(),
                });
            }
            sample = sample_rx.recv() => {
                match sample {
                    Some(s) => recorder.record(&s),
                    None => break,
                }
            }
        }
    }

    let _ = display_tx.send(DisplayState {
        snapshot: recorder.snapshot(),
        label,
    });
}

/// Two-phase Ctrl+C: the first cancels gracefully, the second exits.
async fn handle_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; rely on the other stop conditions.
        std::future::pending::<()>().await;
    }
    eprintln!("\nReceived Ctrl+C, stopping gracefully...");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!("\nReceived second Ctrl+C, aborting immediately.");
        std::process::exit(1);
    }
}
