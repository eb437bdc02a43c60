//! Run a network-on-chip simulation from the command line.
//!
//! Settings come from an optional YAML/JSON configuration file; flags given
//! on the command line override the file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use nocsim::stats::{SimulationStats, Timer};
use nocsim::{init_logging, NocConfig, NocResult, SimulationEngine, TopologyKind};

/// Command-line arguments.
#[derive(Parser)]
#[command(about = "Network-on-chip simulator")]
struct Cli {
    /// Topology to simulate: `grid` or `quadtree`.
    #[arg(long)]
    topo: Option<TopologyKind>,

    /// Configuration file (YAML or JSON, selected by extension).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to run.
    #[arg(long)]
    ticks: Option<u64>,

    /// Seed for the traffic generators.
    #[arg(long)]
    seed: Option<u64>,

    /// Level of log message to display. `RUST_LOG` takes precedence.
    #[arg(long)]
    log_level: Option<String>,

    /// Write the full statistics as JSON to this file.
    #[arg(long)]
    stats_json: Option<PathBuf>,

    /// Write the summary statistics as CSV to this file.
    #[arg(long)]
    stats_csv: Option<PathBuf>,
}

fn load_config(args: &Cli) -> NocResult<NocConfig> {
    let mut config = match &args.config {
        Some(path) => NocConfig::from_file(path)?,
        None => NocConfig::default(),
    };
    if let Some(kind) = args.topo {
        config.topology.kind = kind;
    }
    if let Some(ticks) = args.ticks {
        config.simulation.ticks = ticks;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(level) = &args.log_level {
        config.simulation.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Cli, config: &NocConfig) -> NocResult<SimulationStats> {
    let timer = Timer::start();
    let mut engine = SimulationEngine::from_config(config)?;
    engine.run(config.simulation.ticks)?;

    let mut stats = SimulationStats::collect(&engine).with_name("nocsim");
    if let Some(path) = &args.config {
        stats = stats.with_config_file(path.display().to_string());
    }
    stats.compute_timing(timer.elapsed_ms());

    if let Some(path) = &args.stats_json {
        stats.to_json_file(path)?;
    }
    if let Some(path) = &args.stats_csv {
        stats.to_csv_file(path)?;
    }
    Ok(stats)
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("nocsim: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.simulation.log_level);

    match run(&args, &config) {
        Ok(stats) => {
            if let Err(e) = stats.write_summary(std::io::stdout().lock()) {
                eprintln!("nocsim: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}
