//! Network endpoints.
//!
//! A host owns one address and is attached to exactly one router port. All
//! host models follow the same contract: every tick they may emit packets,
//! and every accepted packet may trigger replies. The simulation context
//! hands emitted packets to the parent router; a packet the router rejects
//! comes back through [`HostBehavior::on_send_rejected`].
//!
//! - [`generic`] - scripted sends, consumes everything
//! - [`nic`] - frame receive pipeline
//! - [`ram`] - RPC and DMA server
//! - [`cpu`] - cache-miss driven reader

pub mod cpu;
pub mod generic;
pub mod nic;
pub mod ram;

use serde::{Deserialize, Serialize};

use crate::packet::Packet;
use crate::types::{Address, NodeId, Tick};

pub use cpu::{CpuCounters, CpuHost, CpuState};
pub use generic::{Arrival, GenericCounters, GenericHost, ScheduledSend};
pub use nic::{NicCounters, NicHost, NicState};
pub use ram::{RamCounters, RamHost};

/// Behavior of a host model.
pub trait HostBehavior {
    /// Called once per tick; returns packets to send.
    fn on_tick(&mut self, now: Tick) -> Vec<Packet>;

    /// Consumes an accepted packet; returns packets to send in response.
    fn on_packet(&mut self, packet: Packet, now: Tick) -> Vec<Packet>;

    /// Called when the parent router rejected `packet`.
    fn on_send_rejected(&mut self, packet: Packet, now: Tick) {
        tracing::warn!(
            tick = now,
            from = packet.from,
            to = packet.to,
            kind = packet.kind.name(),
            "send rejected by parent router, giving up"
        );
    }

    /// Cumulative counters as JSON.
    fn stats(&self) -> serde_json::Value;
}

/// Identifies a host model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostModelKind {
    Generic,
    Nic,
    Ram,
    Cpu,
}

impl HostModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            HostModelKind::Generic => "generic",
            HostModelKind::Nic => "nic",
            HostModelKind::Ram => "ram",
            HostModelKind::Cpu => "cpu",
        }
    }
}

/// The model driving a host.
#[derive(Clone, Debug)]
pub enum HostModel {
    Generic(GenericHost),
    Nic(NicHost),
    Ram(RamHost),
    Cpu(CpuHost),
}

impl HostModel {
    pub fn kind(&self) -> HostModelKind {
        match self {
            HostModel::Generic(_) => HostModelKind::Generic,
            HostModel::Nic(_) => HostModelKind::Nic,
            HostModel::Ram(_) => HostModelKind::Ram,
            HostModel::Cpu(_) => HostModelKind::Cpu,
        }
    }

    fn behavior(&self) -> &dyn HostBehavior {
        match self {
            HostModel::Generic(h) => h,
            HostModel::Nic(h) => h,
            HostModel::Ram(h) => h,
            HostModel::Cpu(h) => h,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn HostBehavior {
        match self {
            HostModel::Generic(h) => h,
            HostModel::Nic(h) => h,
            HostModel::Ram(h) => h,
            HostModel::Cpu(h) => h,
        }
    }

    pub fn as_generic(&self) -> Option<&GenericHost> {
        match self {
            HostModel::Generic(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_generic_mut(&mut self) -> Option<&mut GenericHost> {
        match self {
            HostModel::Generic(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_nic(&self) -> Option<&NicHost> {
        match self {
            HostModel::Nic(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_ram(&self) -> Option<&RamHost> {
        match self {
            HostModel::Ram(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_cpu(&self) -> Option<&CpuHost> {
        match self {
            HostModel::Cpu(h) => Some(h),
            _ => None,
        }
    }
}

/// A host node.
#[derive(Clone, Debug)]
pub struct Host {
    address: Address,
    parent: Option<NodeId>,
    model: HostModel,
}

impl Host {
    pub fn new(address: Address, model: HostModel) -> Self {
        Self {
            address,
            parent: None,
            model,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The router this host is attached to.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: NodeId) {
        self.parent = Some(parent);
    }

    pub fn model(&self) -> &HostModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut HostModel {
        &mut self.model
    }

    pub fn on_tick(&mut self, now: Tick) -> Vec<Packet> {
        self.model.behavior_mut().on_tick(now)
    }

    pub fn on_packet(&mut self, packet: Packet, now: Tick) -> Vec<Packet> {
        if packet.to != self.address {
            tracing::warn!(
                tick = now,
                host = self.address,
                to = packet.to,
                "accepted a packet addressed to another host"
            );
        }
        self.model.behavior_mut().on_packet(packet, now)
    }

    pub fn on_send_rejected(&mut self, packet: Packet, now: Tick) {
        self.model.behavior_mut().on_send_rejected(packet, now)
    }

    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "address": self.address,
            "model": self.model.kind().name(),
            "counters": self.model.behavior().stats(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;

    #[test]
    fn test_host_delegates_to_model() {
        let mut host = Host::new(0x0042, HostModel::Generic(GenericHost::new(0x0042)));
        assert_eq!(host.parent(), None);
        host.set_parent(7);
        assert_eq!(host.parent(), Some(7));

        let replies = host.on_packet(Packet::new(0x0001, 0x0042, 8, PacketKind::DmaWrite, 0), 12);
        assert!(replies.is_empty());

        let stats = host.stats();
        assert_eq!(stats["model"], "generic");
        assert_eq!(stats["counters"]["packets_received"], 1);
    }

    #[test]
    fn test_model_accessors() {
        let model = HostModel::Ram(RamHost::new(0x0010, 2));
        assert_eq!(model.kind(), HostModelKind::Ram);
        assert!(model.as_ram().is_some());
        assert!(model.as_nic().is_none());
        assert!(model.as_generic().is_none());
    }
}
