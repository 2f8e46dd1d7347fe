//! `catalog-loadtest probe` command implementation.

use anyhow::Result;
use colored::Colorize;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::io::IsTerminal;

use catalog_loadtest::loadtest::catalog::Scenario;
use catalog_loadtest::loadtest::client::CatalogClient;
use catalog_loadtest::loadtest::executor::{probe_scenario, CaseProbe};

use super::{resolve_config, TargetArgs};

pub async fn execute_probe(target: TargetArgs, repeat: u32) -> Result<()> {
    let config = resolve_config(target.scenario, target.config.as_deref())?;
    let scenario = Scenario::from_config(&config);
    let client = CatalogClient::new(&target.host, config.settings.timeout_as_duration())?;

    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    eprintln!(
        "Probing {} ({} cases x {repeat}) against {}",
        scenario.kind,
        scenario.cases.len(),
        client.base_url()
    );

    let mut rng = StdRng::from_rng(&mut rand::rng());
    let probes = probe_scenario(&client, &scenario, repeat, &mut rng).await;

    for probe in &probes {
        println!("{}", format_probe_line(probe));
    }

    let failed = probes.iter().filter(|p| !p.all_passed()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} cases failed", probes.len());
    }
    println!();
    println!("All {} cases passed.", probes.len());
    Ok(())
}

/// One line per case: verdict, name, pass count, and the first failure.
fn format_probe_line(probe: &CaseProbe) -> String {
    let total = probe.outcomes.len();
    let verdict = if probe.all_passed() {
        "PASS".green().to_string()
    } else {
        "FAIL".red().to_string()
    };
    let mut line = format!(
        "  {verdict}  {:<52} {}/{total}",
        probe.name,
        probe.passed()
    );
    if let Some(Err(failure)) = probe.outcomes.iter().find(|r| r.is_err()) {
        line.push_str(&format!("  {failure}"));
    }
    if !probe.is_consistent() {
        line.push_str("  (inconsistent across repeats)");
    }
    line
}
