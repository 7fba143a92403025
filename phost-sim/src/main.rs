//! Replays a phost registry scenario and prints the resulting report.
//!
//! # Usage
//!
//! ```bash
//! # Run the scenario in ./phost.toml
//! cargo run -p phost-sim
//!
//! # Run a specific scenario, pretty-printed
//! cargo run -p phost-sim -- --config phost-sim/scenarios/outbid.toml --pretty
//!
//! # Configure logging level
//! RUST_LOG=debug cargo run -p phost-sim
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the scenario file (default: `phost.toml`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use phost_sim::config::{DEFAULT_CONFIG_PATH, SimConfig};
use phost_sim::scenario::Simulation;
use tracing_subscriber::EnvFilter;

/// Replay a pay-to-publish registry scenario.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML scenario file.
    #[arg(long, short, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr so the report on stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        tracing::error!("Simulation failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = SimConfig::load_from(&args.config)?;
    tracing::info!(
        config = %args.config.display(),
        accounts = config.accounts.len(),
        steps = config.steps.len(),
        "Loaded scenario"
    );

    let simulation = Simulation::from_config(&config)?;
    let report = simulation.run(&config.steps);
    let failed = report.steps.iter().filter(|s| !s.ok).count();
    tracing::info!(
        routes = simulation.registry().len(),
        escrowed = %report.escrowed,
        surplus = %report.surplus,
        failed,
        "Scenario complete"
    );

    let mut stdout = std::io::stdout().lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
    } else {
        serde_json::to_writer(&mut stdout, &report)?;
    }
    writeln!(stdout)?;
    Ok(())
}
