//! Configuration files and their effect on the built network.

use std::io::Write;

use nocsim::stats::SimulationStats;
use nocsim::sweep::run_config;
use nocsim::{
    build_network, ConfigError, ExecutionOrder, NocConfig, NocConfigBuilder, NocError,
    PacketKind, SimulationEngine, TopologyKind,
};
use tempfile::NamedTempFile;

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const GRID_YAML: &str = r#"
simulation:
  ticks: 200
  seed: 3
  execution_order: reverse

topology:
  kind: grid
  grid_columns: 2
  grid_rows: 2

hosts:
  ram_addr: null
  cpu_addr: null
  nic_addr: null
  probes:
    - from: 1
      to: 62
      at_tick: 5
      kind: dma_write
      size: 20
"#;

#[test]
fn test_yaml_file_builds_grid() {
    let file = write_temp(".yaml", GRID_YAML);
    let config = NocConfig::from_file(file.path()).unwrap();

    assert_eq!(config.topology.kind, TopologyKind::Grid);
    assert_eq!(config.simulation.execution_order, ExecutionOrder::Reverse);
    assert_eq!(config.hosts.probes[0].kind, PacketKind::DmaWrite);

    let registry = build_network(&config).unwrap();
    assert_eq!(registry.router_count(), 4);
    assert_eq!(registry.host_count(), 64);
}

#[test]
fn test_yaml_probe_is_delivered() {
    let file = write_temp(".yml", GRID_YAML);
    let config = NocConfig::from_file(file.path()).unwrap();
    let stats = run_config(&config).unwrap();

    // (0, 0) -> (1, 0) -> (1, 1)
    assert_eq!(stats.packets.delivered(PacketKind::DmaWrite), 1);
    assert_eq!(stats.packets.overall.max_latency, Some(12));
    assert_eq!(stats.engine.final_tick, 200);
}

#[test]
fn test_json_file_roundtrip() {
    let config = NocConfigBuilder::new()
        .quadtree(1024)
        .seed(99)
        .ram_latency(5)
        .probe(0x200, 0x3ff, 40)
        .build()
        .unwrap();

    let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    config.to_json_file(file.path()).unwrap();
    let restored = NocConfig::from_file(file.path()).unwrap();
    assert_eq!(restored, config);

    let yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    config.to_yaml_file(yaml.path()).unwrap();
    assert_eq!(NocConfig::from_file(yaml.path()).unwrap(), config);
}

#[test]
fn test_unknown_extension_rejected() {
    let file = write_temp(".toml", "ticks = 5\n");
    let err = NocConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownFormat(ref ext) if ext == "toml"));
}

#[test]
fn test_unknown_topology_is_fatal_before_run() {
    let file = write_temp(".yaml", "topology:\n  kind: hypercube\n");
    let err = NocConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownTopology(ref name) if name == "hypercube"));
}

#[test]
fn test_invalid_config_stops_engine_construction() {
    let mut config = NocConfig::default();
    config.topology.host_count = 48;

    let err = SimulationEngine::from_config(&config).unwrap_err();
    assert!(matches!(err, NocError::Config(ConfigError::Validation(_))));
}

#[test]
fn test_stats_files_written() {
    let config = NocConfigBuilder::new().ticks(300).build().unwrap();
    let stats: SimulationStats = run_config(&config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("stats.json");
    let csv = dir.path().join("stats.csv");
    stats.to_json_file(&json).unwrap();
    stats.to_csv_file(&csv).unwrap();

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(parsed["engine"]["final_tick"], 300);
    assert!(std::fs::read_to_string(&csv).unwrap().contains("final_tick,300"));
}
