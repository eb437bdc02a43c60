//! Network construction.
//!
//! [`build_network`] turns a validated [`NocConfig`] into a populated
//! [`NodeRegistry`]. Registration order is part of the result: the engine
//! steps nodes in that order by default.

pub mod grid;
pub mod quadtree;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::{ConfigError, NocConfig};
use crate::error::NocResult;
use crate::host::{CpuHost, GenericHost, Host, HostModel, NicHost, RamHost, ScheduledSend};
use crate::registry::NodeRegistry;
use crate::types::Address;

/// Router algorithm of a network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TopologyKind {
    Grid,
    #[default]
    Quadtree,
}

impl TopologyKind {
    pub fn name(&self) -> &'static str {
        match self {
            TopologyKind::Grid => "grid",
            TopologyKind::Quadtree => "quadtree",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TopologyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grid" | "xygrid" => Ok(TopologyKind::Grid),
            "quadtree" => Ok(TopologyKind::Quadtree),
            _ => Err(ConfigError::UnknownTopology(s.to_string())),
        }
    }
}

impl TryFrom<String> for TopologyKind {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Validates `config` and builds its network.
pub fn build_network(config: &NocConfig) -> NocResult<NodeRegistry> {
    config.validate()?;
    let mut registry = NodeRegistry::new();
    match config.topology.kind {
        TopologyKind::Grid => grid::build(config, &mut registry)?,
        TopologyKind::Quadtree => quadtree::build(config, &mut registry)?,
    }
    tracing::info!(
        topology = config.topology.kind.name(),
        routers = registry.router_count(),
        hosts = registry.host_count(),
        "network created"
    );
    Ok(registry)
}

/// Creates the host for `address`: a special model if one is placed there,
/// otherwise a generic host carrying the probes that start at it.
pub fn host_for(config: &NocConfig, address: Address) -> Host {
    let hosts = &config.hosts;
    let seed = config.simulation.seed;
    let is = |slot: Option<Address>| slot == Some(address);

    let model = match (hosts.ram_addr, hosts.cpu_addr) {
        (Some(_), _) if is(hosts.ram_addr) => {
            HostModel::Ram(RamHost::new(address, hosts.ram_latency))
        }
        (Some(ram), _) if is(hosts.cpu_addr) => {
            HostModel::Cpu(CpuHost::new(address, ram, &config.cpu, seed))
        }
        (Some(ram), Some(cpu)) if is(hosts.nic_addr) => {
            HostModel::Nic(NicHost::new(address, ram, cpu, &config.nic, seed))
        }
        _ => {
            let mut host = GenericHost::new(address);
            for probe in hosts.probes.iter().filter(|p| p.from == address) {
                host.schedule(ScheduledSend {
                    at_tick: probe.at_tick,
                    to: probe.to,
                    size: probe.size,
                    kind: probe.kind,
                });
            }
            HostModel::Generic(host)
        }
    };
    Host::new(address, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NocConfigBuilder;
    use crate::host::HostModelKind;

    #[test]
    fn test_topology_from_str() {
        assert_eq!("grid".parse::<TopologyKind>().unwrap(), TopologyKind::Grid);
        assert_eq!("xygrid".parse::<TopologyKind>().unwrap(), TopologyKind::Grid);
        assert_eq!("Quadtree".parse::<TopologyKind>().unwrap(), TopologyKind::Quadtree);

        let err = "randomgrid".parse::<TopologyKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTopology(ref name) if name == "randomgrid"));
    }

    #[test]
    fn test_host_placement() {
        let config = NocConfig::default();
        assert_eq!(host_for(&config, 0x0010).model().kind(), HostModelKind::Ram);
        assert_eq!(host_for(&config, 0x0000).model().kind(), HostModelKind::Cpu);
        assert_eq!(host_for(&config, 0x00c0).model().kind(), HostModelKind::Nic);
        assert_eq!(host_for(&config, 0x0042).model().kind(), HostModelKind::Generic);
    }

    #[test]
    fn test_probes_attach_to_source() {
        let config = NocConfigBuilder::new()
            .without_traffic_hosts()
            .probe(3, 9, 0)
            .probe(3, 10, 5)
            .build()
            .unwrap();

        let host = host_for(&config, 3);
        assert_eq!(host.model().as_generic().unwrap().pending_sends(), 2);
        let other = host_for(&config, 4);
        assert_eq!(other.model().as_generic().unwrap().pending_sends(), 0);
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = NocConfig::default();
        config.topology.host_count = 100;
        assert!(build_network(&config).is_err());
    }
}
