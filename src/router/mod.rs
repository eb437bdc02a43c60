//! Routers.
//!
//! Both router kinds share the [`PortTable`] contention model and differ only
//! in how they map a destination address to an output port.
//!
//! - [`grid`] - 2-D mesh, X then Y
//! - [`quadtree`] - hierarchical subnets, four children per router

pub mod grid;
pub mod quadtree;

use serde::Serialize;

use crate::config::ConfigResult;
use crate::node::EdgeKind;
use crate::packet::Packet;
use crate::ports::PortTable;
use crate::types::{Address, NodeId, PortIndex, Tick, ADDRESS_SPACE};

pub use grid::{Direction, GridCoord, GridGeometry, GridRouting};
pub use quadtree::{QuadtreeRouting, PARENT_PORT};

/// Maps destination addresses onto the ports of one router kind.
pub trait PortResolver {
    /// Number of ports on a router of this kind.
    const PORT_COUNT: usize;

    /// The output port for `address`.
    ///
    /// Returns `None` when the address cannot be reached from this router at
    /// all, which only happens at the root of a tree.
    fn resolve(&self, address: Address) -> Option<PortIndex>;

    /// What the link on `port` leads to.
    fn edge_kind(&self, port: PortIndex) -> EdgeKind;
}

/// Routing algorithm of a router.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routing {
    Grid(GridRouting),
    Quadtree(QuadtreeRouting),
}

impl Routing {
    pub fn port_count(&self) -> usize {
        match self {
            Routing::Grid(_) => GridRouting::PORT_COUNT,
            Routing::Quadtree(_) => QuadtreeRouting::PORT_COUNT,
        }
    }

    pub fn resolve(&self, address: Address) -> Option<PortIndex> {
        match self {
            Routing::Grid(r) => r.resolve(address),
            Routing::Quadtree(r) => r.resolve(address),
        }
    }

    pub fn edge_kind(&self, port: PortIndex) -> EdgeKind {
        match self {
            Routing::Grid(r) => r.edge_kind(port),
            Routing::Quadtree(r) => r.edge_kind(port),
        }
    }

    /// Short name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Routing::Grid(_) => "grid",
            Routing::Quadtree(_) => "quadtree",
        }
    }
}

/// Cumulative router counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RouterCounters {
    /// Packets handed to the next hop
    pub forwarded: u64,
    /// Packets dropped on a dangling port
    pub dropped: u64,
    /// Incoming packets rejected because the inbox was occupied
    pub bus_fights: u64,
    /// Forward attempts blocked by a busy outbox
    pub stalled: u64,
    /// Incoming packets from nodes not attached to any port
    pub unattached: u64,
}

/// A router node.
#[derive(Clone, Debug)]
pub struct Router {
    subnet_low: Address,
    subnet_high: Address,
    ports: PortTable,
    routing: Routing,
    counters: RouterCounters,
}

impl Router {
    /// Creates a grid router at `coord`, owning the 16 addresses of that cell.
    pub fn grid(geometry: GridGeometry, coord: GridCoord) -> Self {
        let low = geometry.base_address(coord);
        Self::with_routing(
            low as Address,
            (low + grid::HOSTS_PER_ROUTER - 1) as Address,
            Routing::Grid(GridRouting::new(geometry, coord)),
        )
    }

    /// Creates a quadtree router owning `[low, low + size)`.
    pub fn quadtree(low: Address, size: u32, is_root: bool) -> ConfigResult<Self> {
        let routing = QuadtreeRouting::new(low, size, is_root)?;
        let high = (u32::from(low) + size - 1).min(ADDRESS_SPACE - 1);
        Ok(Self::with_routing(
            low,
            high as Address,
            Routing::Quadtree(routing),
        ))
    }

    fn with_routing(subnet_low: Address, subnet_high: Address, routing: Routing) -> Self {
        Self {
            subnet_low,
            subnet_high,
            ports: PortTable::new(routing.port_count()),
            routing,
            counters: RouterCounters::default(),
        }
    }

    pub fn subnet_low(&self) -> Address {
        self.subnet_low
    }

    pub fn subnet_high(&self) -> Address {
        self.subnet_high
    }

    /// Number of addresses in the subnet.
    pub fn subnet_size(&self) -> u32 {
        u32::from(self.subnet_high) - u32::from(self.subnet_low) + 1
    }

    /// Returns true if `address` is inside this router's subnet.
    pub fn contains(&self, address: Address) -> bool {
        (self.subnet_low..=self.subnet_high).contains(&address)
    }

    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    pub fn ports(&self) -> &PortTable {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut PortTable {
        &mut self.ports
    }

    pub fn counters(&self) -> &RouterCounters {
        &self.counters
    }

    /// Attaches `node` to `port`.
    pub fn attach(&mut self, port: PortIndex, node: NodeId) {
        self.ports.attach(port, node);
    }

    /// The output port for `address`; see [`PortResolver::resolve`].
    pub fn resolve_port(&self, address: Address) -> Option<PortIndex> {
        self.routing.resolve(address)
    }

    /// Offers `packet`, arriving from `from`, to this router.
    ///
    /// The packet lands in the inbox of the port `from` is attached to. It is
    /// rejected if that inbox is still occupied or `from` is not attached.
    pub fn accept(&mut self, packet: Packet, from: NodeId, now: Tick) -> bool {
        let Some(port) = self.ports.port_of(from) else {
            self.counters.unattached += 1;
            tracing::error!(
                tick = now,
                router = self.subnet_low,
                from,
                "packet from a node that is not attached to this router"
            );
            return false;
        };

        if self.ports.try_accept(port, packet, now) {
            tracing::trace!(
                tick = now,
                router = self.subnet_low,
                port,
                to = packet.to,
                "accepted"
            );
            true
        } else {
            self.counters.bus_fights += 1;
            tracing::error!(
                tick = now,
                router = self.subnet_low,
                port,
                from = packet.from,
                to = packet.to,
                "bus fight: inbox already occupied"
            );
            false
        }
    }

    pub(crate) fn record_forward(&mut self) {
        self.counters.forwarded += 1;
    }

    pub(crate) fn record_drop(&mut self) {
        self.counters.dropped += 1;
    }

    pub(crate) fn record_stall(&mut self) {
        self.counters.stalled += 1;
    }

    /// Counters and occupancy as JSON.
    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "routing": self.routing.name(),
            "subnet_low": self.subnet_low,
            "subnet_high": self.subnet_high,
            "counters": self.counters,
            "occupied_inboxes": self.ports.occupied_inboxes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;

    fn packet(to: Address) -> Packet {
        Packet::new(0x0000, to, 4, PacketKind::RpcCall, 0)
    }

    #[test]
    fn test_grid_router_subnet() {
        let router = Router::grid(GridGeometry::new(4, 4), GridCoord { x: 1, y: 2 });
        assert_eq!(router.subnet_low(), 0x0090);
        assert_eq!(router.subnet_high(), 0x009f);
        assert_eq!(router.subnet_size(), 16);
        assert_eq!(router.ports().len(), 20);
        assert!(router.contains(0x0095));
        assert!(!router.contains(0x00a0));
    }

    #[test]
    fn test_quadtree_router_subnet() {
        let router = Router::quadtree(0, 65536, true).unwrap();
        assert_eq!(router.subnet_high(), 0xffff);
        assert_eq!(router.subnet_size(), 65536);
        assert_eq!(router.ports().len(), 5);

        assert!(Router::quadtree(0, 48, true).is_err());
    }

    #[test]
    fn test_accept_rejects_when_occupied() {
        let mut router = Router::quadtree(0, 16, true).unwrap();
        router.attach(0, 10);
        router.attach(1, 11);

        assert!(router.accept(packet(4), 10, 0));
        assert!(!router.accept(packet(5), 10, 1));
        assert!(router.accept(packet(6), 11, 1));
        assert_eq!(router.counters().bus_fights, 1);
    }

    #[test]
    fn test_accept_from_unattached() {
        let mut router = Router::quadtree(0, 16, true).unwrap();
        assert!(!router.accept(packet(1), 99, 0));
        assert_eq!(router.counters().unattached, 1);
        assert_eq!(router.ports().occupied_inboxes(), 0);
    }

    #[test]
    fn test_router_stats_json() {
        let mut router = Router::quadtree(0x40, 64, false).unwrap();
        router.record_forward();
        router.record_drop();

        let stats = router.stats();
        assert_eq!(stats["routing"], "quadtree");
        assert_eq!(stats["subnet_low"], 0x40);
        assert_eq!(stats["counters"]["forwarded"], 1);
        assert_eq!(stats["counters"]["dropped"], 1);
    }
}
