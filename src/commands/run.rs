//! `catalog-loadtest run` command implementation.

use anyhow::Result;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::io::IsTerminal;

use catalog_loadtest::loadtest::client::CatalogClient;
use catalog_loadtest::loadtest::config::LoadTestConfig;
use catalog_loadtest::loadtest::engine::LoadTestEngine;
use catalog_loadtest::loadtest::executor::preflight;
use catalog_loadtest::loadtest::report::{write_report, LoadTestReport};
use catalog_loadtest::loadtest::summary::render_summary;

use super::{resolve_config, TargetArgs};

/// Execute the `run` command.
///
/// Request failures never fail the command; only configuration problems,
/// a failed health check, or harness setup errors do.
pub async fn execute_run(
    target: TargetArgs,
    users: Option<u32>,
    duration: Option<u64>,
    iterations: Option<u64>,
    skip_preflight: bool,
    no_report: bool,
    no_color: bool,
) -> Result<()> {
    let mut config = resolve_config(target.scenario, target.config.as_deref())?;
    apply_overrides(&mut config, users, duration);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid settings: {e}"))?;

    if !skip_preflight {
        let client = CatalogClient::new(&target.host, config.settings.timeout_as_duration())?;
        let mut rng = StdRng::from_rng(&mut rand::rng());
        if let Err(failure) = preflight(&client, &mut rng).await {
            anyhow::bail!(
                "Health check failed for {}/health: {failure}\n\
                 Use `--skip-preflight` to run anyway.",
                client.base_url()
            );
        }
    }

    let mut engine = LoadTestEngine::new(config, target.host.clone())
        .with_live_display(std::io::stderr().is_terminal());
    if let Some(n) = iterations {
        engine = engine.with_iterations(n);
    }

    let result = engine
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Load test failed: {}", e))?;

    if no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let summary = render_summary(
        &result,
        engine.config(),
        &target.host,
        engine.scenario().cases.len(),
    );
    println!("{summary}");

    if !no_report {
        let report =
            LoadTestReport::from_result(&result, engine.config(), engine.scenario(), &target.host);
        let cwd = std::env::current_dir()?;
        match write_report(&report, &cwd) {
            Ok(path) => {
                eprintln!();
                eprintln!("Report written to: {}", path.display());
            },
            Err(e) => {
                eprintln!();
                eprintln!("Warning: Failed to write report: {}", e);
            },
        }
    }

    Ok(())
}

/// Apply CLI flag overrides to a resolved config.
fn apply_overrides(config: &mut LoadTestConfig, users: Option<u32>, duration: Option<u64>) {
    if let Some(u) = users {
        config.settings.virtual_users = u;
    }
    if let Some(d) = duration {
        config.settings.duration_secs = d;
    }
}
