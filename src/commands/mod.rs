//! CLI subcommands.
//!
//! Provides `run` (execute a load test), `probe` (execute every case a few
//! times and report pass/fail) and `init` (generate a starter config).

mod init;
mod probe;
mod run;

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use catalog_loadtest::loadtest::config::{LoadTestConfig, ScenarioKind};

/// Target host used when neither `--host` nor `LOCUST_HOST` is set.
const DEFAULT_HOST: &str = "http://localhost:8080";

/// Scenario, host and config selection shared by `run` and `probe`.
#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Scenario to run
    #[arg(value_enum)]
    pub scenario: ScenarioKind,

    /// Base URL of the catalog API
    #[arg(long, env = "LOCUST_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Path to config file (default: auto-discover .loadtest/<scenario>.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test against the catalog API
    ///
    /// Uses .loadtest/<scenario>.toml when present (or a custom config
    /// path), otherwise the built-in preset. Prints a summary to stdout and
    /// writes a JSON report to .loadtest/reports/.
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Number of simulated users (overrides config)
        #[arg(long)]
        users: Option<u32>,

        /// Test duration in seconds (overrides config)
        #[arg(long)]
        duration: Option<u64>,

        /// Stop after this many requests in total
        #[arg(long)]
        iterations: Option<u64>,

        /// Do not check /health before starting
        #[arg(long)]
        skip_preflight: bool,

        /// Disable JSON report output
        #[arg(long)]
        no_report: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Execute every request case and report pass/fail per case
    ///
    /// Cases run sequentially. Exits non-zero if any execution failed.
    Probe {
        #[command(flatten)]
        target: TargetArgs,

        /// Executions per case
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        repeat: u32,
    },

    /// Generate a starter config file at .loadtest/<scenario>.toml
    Init {
        /// Scenario to generate a config for
        #[arg(value_enum)]
        scenario: ScenarioKind,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    pub fn execute(self) -> Result<()> {
        match self {
            Command::Run {
                target,
                users,
                duration,
                iterations,
                skip_preflight,
                no_report,
                no_color,
            } => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run::execute_run(
                    target,
                    users,
                    duration,
                    iterations,
                    skip_preflight,
                    no_report,
                    no_color,
                ))
            },
            Command::Probe { target, repeat } => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(probe::execute_probe(target, repeat))
            },
            Command::Init { scenario, force } => init::execute_init(scenario, force),
        }
    }
}

/// Resolve the config for `scenario`: explicit path, discovered file, or
/// the built-in preset.
pub fn resolve_config(scenario: ScenarioKind, explicit: Option<&Path>) -> Result<LoadTestConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: {}\nUse `catalog-loadtest init {scenario}` to create one.",
                    path.display()
                );
            }
            Some(path.to_path_buf())
        },
        None => discover_config(scenario),
    };

    match path {
        Some(path) => {
            eprintln!("Loading config from: {}", path.display());
            LoadTestConfig::load(scenario, &path)
                .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", path.display(), e))
        },
        None => {
            tracing::debug!(%scenario, "no config file found, using preset");
            Ok(LoadTestConfig::preset(scenario))
        },
    }
}

/// Find `.loadtest/<scenario>.toml` by walking up from the current directory.
fn discover_config(scenario: ScenarioKind) -> Option<PathBuf> {
    let dir = std::env::current_dir().ok()?;
    discover_config_from(&dir, scenario)
}

fn discover_config_from(start: &Path, scenario: ScenarioKind) -> Option<PathBuf> {
    let file_name = format!("{scenario}.toml");
    start
        .ancestors()
        .map(|dir| dir.join(".loadtest").join(&file_name))
        .find(|candidate| candidate.is_file())
}
