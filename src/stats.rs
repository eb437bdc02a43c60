//! Statistics collection and export for a simulation run.
//!
//! [`SimulationStats`] is a serializable snapshot built from a finished
//! engine, with JSON, CSV and plain-text renderings.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::engine::SimulationEngine;
use crate::host::NicCounters;
use crate::packet::PacketStats;
use crate::types::{Address, NodeId, Tick};

/// Aggregate statistics for a simulation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Simulation metadata
    pub metadata: SimulationMetadata,

    /// Engine-level statistics
    pub engine: EngineSummary,

    /// Delivery latency of every packet accepted by a host
    pub packets: PacketStats,

    /// Router counters summed over the network
    pub routers: RouterTotals,

    /// NIC frame accounting, when a NIC host is placed
    pub nic: Option<NicCounters>,

    /// Per-host counters in registration order
    pub hosts: Vec<HostSummary>,

    /// Timing statistics
    pub timing: TimingStats,
}

/// Metadata about the simulation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SimulationMetadata {
    /// Simulation name/description
    pub name: String,

    /// Topology name
    pub topology: String,

    /// Simulation version
    pub version: String,

    /// Configuration file used (if any)
    pub config_file: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineSummary {
    /// Final simulation tick
    pub final_tick: Tick,

    /// Total ticks executed
    pub steps_executed: u64,

    pub router_count: usize,
    pub host_count: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterTotals {
    pub forwarded: u64,
    pub dropped: u64,
    pub bus_fights: u64,
    pub stalled: u64,
    pub unattached: u64,
}

/// Counters of a single host.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HostSummary {
    pub node: NodeId,
    pub address: Address,
    pub model: String,
    pub counters: serde_json::Value,
}

/// Timing/performance statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimingStats {
    /// Total wall-clock time in milliseconds
    pub total_wall_time_ms: f64,

    /// Ticks executed per second
    pub ticks_per_second: f64,

    /// Packets delivered per second
    pub packets_per_second: f64,
}

impl SimulationStats {
    /// Creates a new empty statistics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the counters of `engine`.
    pub fn collect(engine: &SimulationEngine) -> Self {
        let registry = engine.registry();
        let mut stats = Self::new();

        stats.metadata.version = env!("CARGO_PKG_VERSION").to_string();
        stats.engine = EngineSummary {
            final_tick: engine.current_tick(),
            steps_executed: engine.stats().steps_executed,
            router_count: registry.router_count(),
            host_count: registry.host_count(),
        };
        stats.packets = engine.context().packet_stats().clone();

        for node in registry.iter() {
            if let Some(router) = node.as_router() {
                if stats.metadata.topology.is_empty() {
                    stats.metadata.topology = router.routing().name().to_string();
                }
                let c = router.counters();
                stats.routers.forwarded += c.forwarded;
                stats.routers.dropped += c.dropped;
                stats.routers.bus_fights += c.bus_fights;
                stats.routers.stalled += c.stalled;
                stats.routers.unattached += c.unattached;
            } else if let Some(host) = node.as_host() {
                if let Some(nic) = host.model().as_nic() {
                    stats.nic = Some(nic.counters().clone());
                }
                stats.hosts.push(HostSummary {
                    node: node.id(),
                    address: host.address(),
                    model: host.model().kind().name().to_string(),
                    counters: host.stats()["counters"].clone(),
                });
            }
        }

        stats
    }

    /// Sets the simulation name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = name.into();
        self
    }

    /// Records the configuration file the run was built from.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.metadata.config_file = Some(path.into());
        self
    }

    /// Updates timing statistics based on wall clock time.
    pub fn compute_timing(&mut self, wall_time_ms: f64) {
        self.timing.total_wall_time_ms = wall_time_ms;

        if wall_time_ms > 0.0 {
            let seconds = wall_time_ms / 1000.0;
            self.timing.ticks_per_second = self.engine.steps_executed as f64 / seconds;
            self.timing.packets_per_second = self.packets.overall.count as f64 / seconds;
        }
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports summary statistics to CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("metric,value\n");

        csv.push_str(&format!("final_tick,{}\n", self.engine.final_tick));
        csv.push_str(&format!("steps_executed,{}\n", self.engine.steps_executed));
        csv.push_str(&format!("router_count,{}\n", self.engine.router_count));
        csv.push_str(&format!("host_count,{}\n", self.engine.host_count));

        csv.push_str(&format!("packets_delivered,{}\n", self.packets.overall.count));
        if let Some(mean) = self.packets.overall.mean_latency() {
            csv.push_str(&format!("mean_latency,{:.2}\n", mean));
        }
        for (kind, latency) in &self.packets.by_kind {
            csv.push_str(&format!("delivered_{},{}\n", kind.name(), latency.count));
        }

        csv.push_str(&format!("forwarded,{}\n", self.routers.forwarded));
        csv.push_str(&format!("dropped,{}\n", self.routers.dropped));
        csv.push_str(&format!("bus_fights,{}\n", self.routers.bus_fights));
        csv.push_str(&format!("stalled,{}\n", self.routers.stalled));

        if let Some(ref nic) = self.nic {
            csv.push_str(&format!("nic_frames_total,{}\n", nic.frames_total));
            csv.push_str(&format!("nic_frames_processed,{}\n", nic.frames_processed));
            csv.push_str(&format!("nic_frames_dropped,{}\n", nic.frames_dropped));
        }

        csv.push_str(&format!("wall_time_ms,{:.2}\n", self.timing.total_wall_time_ms));
        csv.push_str(&format!("ticks_per_second,{:.2}\n", self.timing.ticks_per_second));

        csv
    }

    /// Exports summary statistics to CSV file.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Exports per-host counters to CSV, one row per counter.
    ///
    /// Nested counter maps are flattened with a dot, e.g. `cycles.idle`.
    pub fn hosts_to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("node,address,model,counter,value\n");

        for host in &self.hosts {
            let mut rows = Vec::new();
            flatten_counters("", &host.counters, &mut rows);
            for (counter, value) in rows {
                csv.push_str(&format!(
                    "{},0x{:04x},{},{},{}\n",
                    host.node, host.address, host.model, counter, value
                ));
            }
        }

        csv
    }

    /// Exports per-host counters to CSV file.
    pub fn hosts_to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.hosts_to_csv())
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== Simulation Statistics ===")?;
        writeln!(w)?;

        if !self.metadata.name.is_empty() {
            writeln!(w, "Name: {}", self.metadata.name)?;
        }
        if let Some(ref config) = self.metadata.config_file {
            writeln!(w, "Config: {}", config)?;
        }
        writeln!(w, "Topology: {}", self.metadata.topology)?;
        writeln!(w)?;

        writeln!(w, "--- Engine ---")?;
        writeln!(w, "Final tick: {}", self.engine.final_tick)?;
        writeln!(w, "Steps executed: {}", self.engine.steps_executed)?;
        writeln!(w, "Routers: {}", self.engine.router_count)?;
        writeln!(w, "Hosts: {}", self.engine.host_count)?;
        writeln!(w)?;

        writeln!(w, "--- Packets ---")?;
        writeln!(w, "Delivered: {}", self.packets.overall.count)?;
        if let (Some(min), Some(max), Some(mean)) = (
            self.packets.overall.min_latency,
            self.packets.overall.max_latency,
            self.packets.overall.mean_latency(),
        ) {
            writeln!(w, "Latency: min {} / mean {:.2} / max {}", min, mean, max)?;
        }
        for (kind, latency) in &self.packets.by_kind {
            writeln!(w, "  {}: {}", kind.name(), latency.count)?;
        }
        writeln!(w)?;

        writeln!(w, "--- Routers ---")?;
        writeln!(w, "Forwarded: {}", self.routers.forwarded)?;
        writeln!(w, "Dropped: {}", self.routers.dropped)?;
        writeln!(w, "Bus fights: {}", self.routers.bus_fights)?;
        writeln!(w, "Stalled: {}", self.routers.stalled)?;
        if self.routers.unattached > 0 {
            writeln!(w, "Unattached senders: {}", self.routers.unattached)?;
        }
        writeln!(w)?;

        if let Some(ref nic) = self.nic {
            writeln!(w, "--- NIC ---")?;
            writeln!(w, "Frames: {}", nic.frames_total)?;
            writeln!(w, "Processed: {}", nic.frames_processed)?;
            writeln!(w, "Dropped: {}", nic.frames_dropped)?;
            writeln!(w, "Forwarded to CPU: {}", nic.frames_forwarded)?;
            writeln!(w)?;
        }

        writeln!(w, "--- Timing ---")?;
        writeln!(w, "Wall time: {:.2} ms", self.timing.total_wall_time_ms)?;
        writeln!(w, "Ticks/sec: {:.2}", self.timing.ticks_per_second)?;

        Ok(())
    }

    /// Returns a summary string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn flatten_counters(prefix: &str, value: &serde_json::Value, rows: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_counters(&name, v, rows);
            }
        }
        serde_json::Value::Null => {}
        other => rows.push((prefix.to_string(), other.to_string())),
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}
