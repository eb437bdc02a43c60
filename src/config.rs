//! Configuration system for the simulator.
//!
//! A run is described declaratively in YAML or JSON. Every section and field
//! is optional; missing values take the defaults of the reference network
//! (256-host quadtree with CPU, RAM and NIC hosts).
//!
//! # Configuration File Structure
//!
//! ```yaml
//! simulation:
//!   ticks: 1000
//!   seed: 0
//!   log_level: info
//!   execution_order: registration
//!
//! topology:
//!   kind: quadtree        # or grid
//!   host_count: 256       # quadtree only, a power of four
//!   grid_columns: 4       # grid only
//!   grid_rows: 4
//!
//! hosts:
//!   ram_addr: 16
//!   cpu_addr: 0
//!   nic_addr: 192         # null removes a host model
//!   ram_latency: 2
//!   probes:
//!     - from: 1
//!       to: 255
//!       at_tick: 10
//!
//! nic:
//!   first_frame_tick: 200
//!   drain_delay: 4
//!
//! cpu:
//!   miss_rate_percent: 1
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::packet::PacketKind;
use crate::router::grid::HOSTS_PER_ROUTER;
use crate::router::quadtree::is_valid_subnet_size;
use crate::topology::TopologyKind;
use crate::types::{Address, Tick, ADDRESS_SPACE};

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    #[error("Unknown topology: {0} (must be one of: grid, quadtree)")]
    UnknownTopology(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Order in which the engine steps nodes within a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOrder {
    /// Topology construction order
    #[default]
    Registration,
    /// Construction order, last node first
    Reverse,
}

/// Global simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Number of ticks to run
    #[serde(default = "default_ticks")]
    pub ticks: Tick,

    /// Seed for every pseudo-random process
    #[serde(default)]
    pub seed: u64,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub execution_order: ExecutionOrder,
}

fn default_ticks() -> Tick {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            seed: 0,
            log_level: default_log_level(),
            execution_order: ExecutionOrder::default(),
        }
    }
}

/// Network shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub kind: TopologyKind,

    /// Hosts in a quadtree network
    #[serde(default = "default_host_count")]
    pub host_count: u32,

    #[serde(default = "default_grid_side")]
    pub grid_columns: u32,

    #[serde(default = "default_grid_side")]
    pub grid_rows: u32,
}

fn default_host_count() -> u32 {
    256
}

fn default_grid_side() -> u32 {
    4
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            kind: TopologyKind::default(),
            host_count: default_host_count(),
            grid_columns: default_grid_side(),
            grid_rows: default_grid_side(),
        }
    }
}

/// A single packet sent by a generic host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub from: Address,
    pub to: Address,
    #[serde(default)]
    pub at_tick: Tick,
    #[serde(default = "default_probe_size")]
    pub size: u32,
    #[serde(default = "default_probe_kind")]
    pub kind: PacketKind,
}

fn default_probe_size() -> u32 {
    4
}

fn default_probe_kind() -> PacketKind {
    PacketKind::RpcCall
}

/// Placement of the special host models and scripted traffic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostsConfig {
    #[serde(default = "default_ram_addr")]
    pub ram_addr: Option<Address>,

    #[serde(default = "default_cpu_addr")]
    pub cpu_addr: Option<Address>,

    #[serde(default = "default_nic_addr")]
    pub nic_addr: Option<Address>,

    /// Ticks between a request reaching RAM and its reply leaving
    #[serde(default = "default_ram_latency")]
    pub ram_latency: Tick,

    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
}

fn default_ram_addr() -> Option<Address> {
    Some(0x0010)
}

fn default_cpu_addr() -> Option<Address> {
    Some(0x0000)
}

fn default_nic_addr() -> Option<Address> {
    Some(0x00c0)
}

fn default_ram_latency() -> Tick {
    2
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            ram_addr: default_ram_addr(),
            cpu_addr: default_cpu_addr(),
            nic_addr: default_nic_addr(),
            ram_latency: default_ram_latency(),
            probes: Vec::new(),
        }
    }
}

/// NIC frame source and pipeline timing.
///
/// Frame sizes and gaps are in bytes; the line carries one byte per tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NicConfig {
    pub first_frame_tick: Tick,
    pub first_frame_size: u32,
    /// Inclusive lower bound of frame sizes
    pub frame_size_min: u32,
    /// Exclusive upper bound of frame sizes
    pub frame_size_max: u32,
    pub gap_min: u32,
    pub gap_max: u32,
    /// Ticks between the CPU interrupt and the return to idle
    pub drain_delay: Tick,
}

impl Default for NicConfig {
    fn default() -> Self {
        Self {
            first_frame_tick: 200,
            first_frame_size: 65,
            frame_size_min: 64,
            frame_size_max: 1500,
            gap_min: 8,
            gap_max: 128,
            drain_delay: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Chance per executing tick of a cache miss
    pub miss_rate_percent: u32,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            miss_rate_percent: 1,
        }
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NocConfig {
    #[serde(default)]
    pub simulation: SimulationParams,

    #[serde(default)]
    pub topology: TopologyConfig,

    #[serde(default)]
    pub hosts: HostsConfig,

    #[serde(default)]
    pub nic: NicConfig,

    #[serde(default)]
    pub cpu: CpuConfig,
}

impl NocConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let kind = value.get("topology").and_then(|t| t.get("kind"));
        check_topology_name(kind.and_then(|k| k.as_str()))?;
        let config: NocConfig = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let kind = value.get("topology").and_then(|t| t.get("kind"));
        check_topology_name(kind.and_then(|k| k.as_str()))?;
        let config: NocConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Number of host addresses the topology provides.
    pub fn host_capacity(&self) -> u32 {
        match self.topology.kind {
            TopologyKind::Quadtree => self.topology.host_count,
            TopologyKind::Grid => {
                self.topology.grid_columns * self.topology.grid_rows * HOSTS_PER_ROUTER
            }
        }
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.validate_topology()?;
        let capacity = self.host_capacity();
        let in_range = |address: Address| u32::from(address) < capacity;

        // Special hosts
        let hosts = &self.hosts;
        let mut seen = HashSet::new();
        for (name, address) in [
            ("ram_addr", hosts.ram_addr),
            ("cpu_addr", hosts.cpu_addr),
            ("nic_addr", hosts.nic_addr),
        ] {
            let Some(address) = address else { continue };
            if !in_range(address) {
                return Err(ConfigError::Validation(format!(
                    "{name} {address:#06x} is outside the {capacity}-host network"
                )));
            }
            if !seen.insert(address) {
                return Err(ConfigError::Validation(format!(
                    "{name} {address:#06x} is already used by another special host"
                )));
            }
        }
        if hosts.ram_addr.is_none() && (hosts.cpu_addr.is_some() || hosts.nic_addr.is_some()) {
            return Err(ConfigError::Validation(
                "CPU and NIC hosts need a RAM host".to_string(),
            ));
        }
        if hosts.nic_addr.is_some() && hosts.cpu_addr.is_none() {
            return Err(ConfigError::Validation(
                "the NIC host needs a CPU host".to_string(),
            ));
        }

        for probe in &hosts.probes {
            if !in_range(probe.from) || !in_range(probe.to) {
                return Err(ConfigError::Validation(format!(
                    "probe {:#06x} -> {:#06x} leaves the {capacity}-host network",
                    probe.from, probe.to
                )));
            }
            if seen.contains(&probe.from) {
                return Err(ConfigError::Validation(format!(
                    "probe source {:#06x} is a special host",
                    probe.from
                )));
            }
        }

        // Traffic models
        let nic = &self.nic;
        if nic.frame_size_min == 0 || nic.frame_size_min >= nic.frame_size_max {
            return Err(ConfigError::Validation(format!(
                "NIC frame size range [{}, {}) is empty",
                nic.frame_size_min, nic.frame_size_max
            )));
        }
        if nic.gap_min >= nic.gap_max {
            return Err(ConfigError::Validation(format!(
                "NIC gap range [{}, {}) is empty",
                nic.gap_min, nic.gap_max
            )));
        }
        if self.cpu.miss_rate_percent > 100 {
            return Err(ConfigError::Validation(format!(
                "CPU miss rate {}% is above 100%",
                self.cpu.miss_rate_percent
            )));
        }

        Ok(())
    }

    fn validate_topology(&self) -> ConfigResult<()> {
        let topo = &self.topology;
        match topo.kind {
            TopologyKind::Quadtree => {
                if !is_valid_subnet_size(topo.host_count) {
                    return Err(ConfigError::Validation(format!(
                        "quadtree host_count {} must be a power of four between 4 and {ADDRESS_SPACE}",
                        topo.host_count
                    )));
                }
            }
            TopologyKind::Grid => {
                if topo.grid_columns == 0 || topo.grid_rows == 0 {
                    return Err(ConfigError::Validation(
                        "grid needs at least one column and one row".to_string(),
                    ));
                }
                let hosts = u64::from(topo.grid_columns)
                    * u64::from(topo.grid_rows)
                    * u64::from(HOSTS_PER_ROUTER);
                if hosts > u64::from(ADDRESS_SPACE) {
                    return Err(ConfigError::Validation(format!(
                        "{}x{} grid needs {hosts} addresses, more than {ADDRESS_SPACE}",
                        topo.grid_columns, topo.grid_rows
                    )));
                }
            }
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Rejects an unknown topology name before the typed parse folds it into a
/// format error.
fn check_topology_name(kind: Option<&str>) -> ConfigResult<()> {
    match kind {
        Some(name) => name.parse::<TopologyKind>().map(|_| ()),
        None => Ok(()),
    }
}

/// Builder for creating NocConfig programmatically.
#[derive(Default)]
pub struct NocConfigBuilder {
    config: NocConfig,
}

impl NocConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of ticks to run.
    pub fn ticks(mut self, ticks: Tick) -> Self {
        self.config.simulation.ticks = ticks;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.simulation.seed = seed;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.simulation.log_level = level.into();
        self
    }

    pub fn execution_order(mut self, order: ExecutionOrder) -> Self {
        self.config.simulation.execution_order = order;
        self
    }

    /// Selects a quadtree network with `host_count` hosts.
    pub fn quadtree(mut self, host_count: u32) -> Self {
        self.config.topology.kind = TopologyKind::Quadtree;
        self.config.topology.host_count = host_count;
        self
    }

    /// Selects a `columns x rows` grid network.
    pub fn grid(mut self, columns: u32, rows: u32) -> Self {
        self.config.topology.kind = TopologyKind::Grid;
        self.config.topology.grid_columns = columns;
        self.config.topology.grid_rows = rows;
        self
    }

    pub fn ram_addr(mut self, address: Option<Address>) -> Self {
        self.config.hosts.ram_addr = address;
        self
    }

    pub fn cpu_addr(mut self, address: Option<Address>) -> Self {
        self.config.hosts.cpu_addr = address;
        self
    }

    pub fn nic_addr(mut self, address: Option<Address>) -> Self {
        self.config.hosts.nic_addr = address;
        self
    }

    pub fn ram_latency(mut self, latency: Tick) -> Self {
        self.config.hosts.ram_latency = latency;
        self
    }

    /// Removes the CPU, RAM and NIC hosts, leaving a silent network.
    pub fn without_traffic_hosts(mut self) -> Self {
        self.config.hosts.ram_addr = None;
        self.config.hosts.cpu_addr = None;
        self.config.hosts.nic_addr = None;
        self
    }

    /// Adds a probe packet from `from` to `to` sent at `at_tick`.
    pub fn probe(mut self, from: Address, to: Address, at_tick: Tick) -> Self {
        self.config.hosts.probes.push(ProbeConfig {
            from,
            to,
            at_tick,
            size: default_probe_size(),
            kind: default_probe_kind(),
        });
        self
    }

    pub fn miss_rate_percent(mut self, percent: u32) -> Self {
        self.config.cpu.miss_rate_percent = percent;
        self
    }

    /// Replaces the NIC parameters.
    pub fn nic(mut self, nic: NicConfig) -> Self {
        self.config.nic = nic;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<NocConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NocConfig::new();
        assert_eq!(config.simulation.ticks, 1000);
        assert_eq!(config.topology.kind, TopologyKind::Quadtree);
        assert_eq!(config.host_capacity(), 256);
        assert_eq!(config.hosts.nic_addr, Some(0x00c0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
simulation:
  ticks: 5000
  seed: 7
  log_level: debug
  execution_order: reverse

topology:
  kind: grid
  grid_columns: 2
  grid_rows: 3

hosts:
  ram_addr: 17
  cpu_addr: 1
  nic_addr: null
  probes:
    - from: 2
      to: 90
      at_tick: 10

nic:
  drain_delay: 8
"#;

        let config = NocConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.simulation.ticks, 5000);
        assert_eq!(config.simulation.execution_order, ExecutionOrder::Reverse);
        assert_eq!(config.topology.kind, TopologyKind::Grid);
        assert_eq!(config.host_capacity(), 96);
        assert_eq!(config.hosts.nic_addr, None);
        assert_eq!(config.hosts.probes[0].size, 4);
        assert_eq!(config.nic.drain_delay, 8);
        assert_eq!(config.nic.frame_size_max, 1500);
    }

    #[test]
    fn test_xygrid_alias() {
        let config = NocConfig::from_yaml("topology:\n  kind: xygrid\n").unwrap();
        assert_eq!(config.topology.kind, TopologyKind::Grid);
    }

    #[test]
    fn test_unknown_topology_rejected() {
        let err = NocConfig::from_yaml("topology:\n  kind: ring\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTopology(ref name) if name == "ring"));

        let err = NocConfig::from_json(r#"{ "topology": { "kind": "torus" } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTopology(_)));
    }

    #[test]
    fn test_json_parsing() {
        let json = r#"{
            "simulation": { "ticks": 100 },
            "topology": { "kind": "quadtree", "host_count": 64 },
            "hosts": { "nic_addr": null }
        }"#;

        let config = NocConfig::from_json(json).unwrap();
        assert_eq!(config.simulation.ticks, 100);
        assert_eq!(config.host_capacity(), 64);
    }

    #[test]
    fn test_builder() {
        let config = NocConfigBuilder::new()
            .ticks(2000)
            .grid(4, 4)
            .without_traffic_hosts()
            .probe(0x10, 0x31, 0)
            .build()
            .unwrap();

        assert_eq!(config.simulation.ticks, 2000);
        assert_eq!(config.hosts.ram_addr, None);
        assert_eq!(config.hosts.probes.len(), 1);
    }

    #[test]
    fn test_validation_quadtree_size() {
        for host_count in [0, 2, 8, 32, 100, 131072] {
            assert!(NocConfigBuilder::new().quadtree(host_count).build().is_err());
        }
        assert!(NocConfigBuilder::new()
            .quadtree(65536)
            .build()
            .is_ok());
    }

    #[test]
    fn test_validation_grid_size() {
        assert!(NocConfigBuilder::new().grid(0, 4).build().is_err());
        assert!(NocConfigBuilder::new().grid(64, 64).build().is_ok());
        assert!(NocConfigBuilder::new().grid(64, 65).build().is_err());
    }

    #[test]
    fn test_validation_special_hosts() {
        // Outside a 16-host network
        assert!(NocConfigBuilder::new().quadtree(16).build().is_err());
        assert!(NocConfigBuilder::new()
            .quadtree(16)
            .ram_addr(Some(1))
            .nic_addr(Some(2))
            .build()
            .is_ok());

        // Duplicate address
        assert!(NocConfigBuilder::new().cpu_addr(Some(0x10)).build().is_err());

        // Missing dependencies
        assert!(NocConfigBuilder::new().ram_addr(None).build().is_err());
        assert!(NocConfigBuilder::new().cpu_addr(None).build().is_err());
        assert!(NocConfigBuilder::new()
            .cpu_addr(None)
            .nic_addr(None)
            .build()
            .is_ok());
    }

    #[test]
    fn test_validation_probes() {
        assert!(NocConfigBuilder::new().probe(0x00, 0x20, 0).build().is_err());
        assert!(NocConfigBuilder::new().probe(0x01, 0x100, 0).build().is_err());
        assert!(NocConfigBuilder::new().probe(0x01, 0xff, 0).build().is_ok());
    }

    #[test]
    fn test_validation_traffic_ranges() {
        let nic = NicConfig {
            gap_min: 10,
            gap_max: 10,
            ..NicConfig::default()
        };
        assert!(NocConfigBuilder::new().nic(nic).build().is_err());
        assert!(NocConfigBuilder::new().miss_rate_percent(101).build().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = NocConfigBuilder::new()
            .grid(2, 2)
            .without_traffic_hosts()
            .probe(1, 40, 5)
            .build()
            .unwrap();

        let yaml = config.to_yaml().unwrap();
        let restored = NocConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config, restored);

        let json = config.to_json().unwrap();
        assert_eq!(NocConfig::from_json(&json).unwrap(), config);
    }
}
