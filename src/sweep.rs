//! Parametric sweeps: one independent run per configuration.
//!
//! With the `parallel` feature the runs are spread over the rayon pool. Each
//! run still steps its own engine on a single thread.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::NocConfig;
use crate::engine::SimulationEngine;
use crate::error::NocResult;
use crate::stats::{SimulationStats, Timer};

/// Builds a fresh engine for `config` and runs it for `config.simulation.ticks`.
pub fn run_config(config: &NocConfig) -> NocResult<SimulationStats> {
    let timer = Timer::start();
    let mut engine = SimulationEngine::from_config(config)?;
    engine.run(config.simulation.ticks)?;

    let mut stats = SimulationStats::collect(&engine);
    stats.compute_timing(timer.elapsed_ms());
    Ok(stats)
}

/// Runs every configuration, results in input order.
#[cfg(feature = "parallel")]
pub fn run_sweep(configs: &[NocConfig]) -> Vec<NocResult<SimulationStats>> {
    tracing::info!(runs = configs.len(), threads = rayon::current_num_threads(), "starting sweep");
    configs.par_iter().map(run_config).collect()
}

/// Runs every configuration, results in input order.
#[cfg(not(feature = "parallel"))]
pub fn run_sweep(configs: &[NocConfig]) -> Vec<NocResult<SimulationStats>> {
    tracing::info!(runs = configs.len(), "starting sweep");
    configs.iter().map(run_config).collect()
}
