#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a tiletrek movement scenario headlessly.

mod render;
mod runner;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

/// Walks entities across a tile map and reports where they ended up.
#[derive(Debug, Parser)]
#[command(name = "tiletrek", version, about)]
struct CliArgs {
    /// Scenario file to run; a generated demo map is used when omitted.
    #[arg(value_name = "SCENARIO")]
    scenario: Option<PathBuf>,

    /// Overrides the terrain generation seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the tick limit.
    #[arg(long, value_name = "TICKS")]
    max_ticks: Option<usize>,

    /// Prints the final map as text before the report.
    #[arg(long)]
    ascii: bool,

    /// Log filter directive, e.g. `debug` or `tiletrek_system_movement=trace`.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log.as_deref())?;

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => {
            info!("no scenario given, running the generated demo");
            Scenario::demo()
        }
    };
    if let Some(seed) = args.seed {
        if scenario.reseed(seed) {
            warn!(seed, "seed override turns on terrain generation");
        }
    }
    if let Some(max_ticks) = args.max_ticks {
        scenario.max_ticks = max_ticks;
    }

    let outcome = runner::run(&scenario).context("scenario run failed")?;
    info!(
        ticks = outcome.report.ticks,
        entities = outcome.report.entities.len(),
        "scenario finished"
    );

    if args.ascii {
        print!("{}", render::render_ascii(&outcome.world));
    }
    let report =
        serde_json::to_string_pretty(&outcome.report).context("failed to encode run report")?;
    println!("{report}");
    Ok(())
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    Ok(())
}
