//! catalog-loadtest: load and contract testing for the product-catalog API.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

/// Load and contract testing for the product-catalog HTTP API
#[derive(Parser)]
#[command(name = "catalog-loadtest")]
#[command(about = "Load and contract testing for the product-catalog HTTP API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> Result<()> {
    // Diagnostics go to stderr; the summary owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.command.execute()
}
