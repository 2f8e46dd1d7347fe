//! Virtual user (VU) task loop.
//!
//! Each VU repeatedly picks a weighted-random [`RequestCase`] from the shared
//! [`Scenario`], executes it, emits a [`RequestSample`] through a bounded
//! mpsc channel, then waits according to the scenario's [`WaitTime`].
//! Failures never stop a VU; only cancellation, the iteration limit, or a
//! closed sample channel do.

use crate::loadtest::catalog::Scenario;
use crate::loadtest::client::CatalogClient;
use crate::loadtest::config::WaitTime;
use crate::loadtest::executor::execute_case;
use crate::loadtest::metrics::RequestSample;

use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Atomic counter tracking the number of currently active virtual users.
#[derive(Clone)]
pub struct ActiveVuCounter(Arc<AtomicU32>);

impl ActiveVuCounter {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0)))
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for ActiveVuCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared iteration budget across all VUs.
///
/// Exactly `max` calls to [`IterationBudget::try_acquire`] succeed; the
/// first call past the budget cancels the run.
#[derive(Clone)]
pub struct IterationBudget {
    used: Arc<AtomicU64>,
    max: u64,
}

impl IterationBudget {
    pub fn new(max: u64) -> Self {
        Self {
            used: Arc::new(AtomicU64::new(0)),
            max,
        }
    }

    pub fn try_acquire(&self, cancel: &CancellationToken) -> bool {
        let prev = self.used.fetch_add(1, Ordering::Relaxed);
        if prev >= self.max {
            cancel.cancel();
            false
        } else {
            true
        }
    }
}

/// Main virtual user task loop.
///
/// The `active_vus` counter is incremented on entry and decremented on all
/// exit paths.
#[allow(clippy::too_many_arguments)]
pub async fn vu_loop(
    vu_id: u32,
    scenario: Arc<Scenario>,
    wait: WaitTime,
    client: CatalogClient,
    sample_tx: mpsc::Sender<RequestSample>,
    cancel: CancellationToken,
    budget: Option<IterationBudget>,
    active_vus: ActiveVuCounter,
) {
    active_vus.increment();

    let result = vu_loop_inner(
        &scenario,
        &wait,
        &client,
        &sample_tx,
        &cancel,
        budget.as_ref(),
    )
    .await;

    if let Err(reason) = result {
        tracing::warn!(vu = vu_id, %reason, "virtual user stopped");
    }

    active_vus.decrement();
}

/// Returns `Ok(())` on normal shutdown, `Err(reason)` if the VU cannot run.
async fn vu_loop_inner(
    scenario: &Scenario,
    wait: &WaitTime,
    client: &CatalogClient,
    sample_tx: &mpsc::Sender<RequestSample>,
    cancel: &CancellationToken,
    budget: Option<&IterationBudget>,
) -> Result<(), String> {
    let weights: Vec<u32> = scenario.cases.iter().map(|c| c.weight).collect();
    let dist = WeightedIndex::new(&weights)
        .map_err(|e| format!("failed to build weighted distribution: {e}"))?;
    let mut rng = StdRng::from_rng(&mut rand::rng());

    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        if let Some(budget) = budget {
            if !budget.try_acquire(cancel) {
                return Ok(());
            }
        }

        // In-flight requests are never cancelled; they complete and are recorded.
        let case = &scenario.cases[dist.sample(&mut rng)];
        let outcome = execute_case(client, case, &mut rng).await;

        if sample_tx
            .send(RequestSample::from_outcome(case.name.as_str(), outcome))
            .await
            .is_err()
        {
            // Aggregator is gone.
            return Ok(());
        }

        let pause = wait.sample(&mut rng);
        if !pause.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(pause) => {},
                _ = cancel.cancelled() => return Ok(()),
            }
        }
    }
}
