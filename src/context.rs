//! Simulation context.
//!
//! The context owns the node arena and the clock of one run. Nodes never
//! hold references to each other; every interaction goes through the
//! context by node id.
//!
//! # Forwarding
//!
//! A router forward is split into short borrows so the next hop can run
//! synchronously, including a host that answers straight back into the
//! forwarding router:
//!
//! 1. Inspect the router: ready packet, output port, outbox, link.
//! 2. Offer the packet to the next hop with [`SimulationContext::accept_message`].
//! 3. On success, take the packet out of the inbox and occupy the outbox.
//!
//! Until step 3 the packet stays in the inbox, so every failure leaves the
//! router state untouched.

use crate::error::{NocError, NocResult};
use crate::node::NodeKind;
use crate::packet::{Packet, PacketStats};
use crate::registry::NodeRegistry;
use crate::types::{NodeId, PortIndex, Tick};

/// Result of one forward attempt from an input port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Inbox empty or the packet is still arriving
    Idle,
    /// The output port's outbox is busy
    Blocked,
    /// The output port is dangling and the packet was discarded
    Dropped,
    /// The next hop refused the packet
    Rejected,
    /// The packet moved to the next hop
    Sent,
}

/// State of one simulation run.
#[derive(Debug)]
pub struct SimulationContext {
    now: Tick,
    registry: NodeRegistry,
    packet_stats: PacketStats,
}

impl SimulationContext {
    pub fn new(registry: NodeRegistry) -> Self {
        Self {
            now: 0,
            registry,
            packet_stats: PacketStats::new(),
        }
    }

    /// The current tick.
    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    /// Delivery statistics of packets accepted by hosts.
    pub fn packet_stats(&self) -> &PacketStats {
        &self.packet_stats
    }

    /// Moves the clock to the next tick.
    pub fn advance(&mut self) {
        self.now += 1;
    }

    /// Offers `packet`, sent by `from`, to node `target`.
    ///
    /// Routers store it in the inbox of the port `from` is attached to, or
    /// reject it. Hosts always accept and may answer immediately; their
    /// answers travel to their parent router before this call returns.
    pub fn accept_message(&mut self, target: NodeId, packet: Packet, from: NodeId) -> NocResult<bool> {
        let now = self.now;
        let replies = match self.registry.get_mut(target)?.kind_mut() {
            NodeKind::Router(router) => return Ok(router.accept(packet, from, now)),
            NodeKind::Host(host) => host.on_packet(packet, now),
        };

        self.packet_stats.record(&packet, now);
        self.send_all(target, replies)?;
        Ok(true)
    }

    /// Hands `packet` from host `host` to its parent router.
    ///
    /// Returns whether the router accepted it. The host is not told about a
    /// rejection; see [`send_all`](Self::send_all).
    pub fn send_from_host(&mut self, host: NodeId, packet: Packet) -> NocResult<bool> {
        let Some(parent) = self.registry.host(host)?.parent() else {
            tracing::error!(tick = self.now, host, to = packet.to, "host is not attached to a router");
            return Ok(false);
        };
        self.accept_message(parent, packet, host)
    }

    /// Sends every packet in `packets` from `host`, reporting rejections back
    /// to the host.
    pub fn send_all(&mut self, host: NodeId, packets: Vec<Packet>) -> NocResult<()> {
        for packet in packets {
            if !self.send_from_host(host, packet)? {
                let now = self.now;
                self.registry.host_mut(host)?.on_send_rejected(packet, now);
            }
        }
        Ok(())
    }

    /// Runs one tick of node `id`.
    pub fn timestep(&mut self, id: NodeId) -> NocResult<()> {
        if self.registry.get(id)?.is_router() {
            self.router_timestep(id)
        } else {
            self.host_timestep(id)
        }
    }

    fn host_timestep(&mut self, id: NodeId) -> NocResult<()> {
        let now = self.now;
        let packets = self.registry.host_mut(id)?.on_tick(now);
        self.send_all(id, packets)
    }

    /// Runs one tick of router `id`.
    ///
    /// Expired outboxes are released first, then every input port is tried
    /// once, starting at the round-robin pointer.
    pub fn router_timestep(&mut self, id: NodeId) -> NocResult<()> {
        let now = self.now;
        let order = {
            let ports = self.registry.router_mut(id)?.ports_mut();
            ports.release_outboxes(now);
            ports.scan_order()
        };

        for port in order {
            self.try_forward_from(id, port)?;
        }
        Ok(())
    }

    /// Tries to forward the packet waiting on `port` of router `id`.
    ///
    /// Fails only when the root of a tree is asked to route an address
    /// outside its range.
    pub fn try_forward_from(&mut self, id: NodeId, port: PortIndex) -> NocResult<ForwardOutcome> {
        let now = self.now;

        let (packet, out_port, next_hop) = {
            let router = self.registry.router_mut(id)?;
            let Some(packet) = router.ports().ready_packet(port, now) else {
                return Ok(ForwardOutcome::Idle);
            };
            let out_port = router
                .resolve_port(packet.to)
                .ok_or(NocError::UnroutableFromRoot {
                    router: id,
                    address: packet.to,
                })?;

            if router.ports().outbox_busy(out_port) {
                router.record_stall();
                return Ok(ForwardOutcome::Blocked);
            }

            let Some(next_hop) = router.ports().link(out_port) else {
                router.ports_mut().take_inbox(port);
                router.record_drop();
                tracing::warn!(
                    tick = now,
                    router = router.subnet_low(),
                    port = out_port,
                    from = packet.from,
                    to = packet.to,
                    "dropping packet: output port has no link"
                );
                return Ok(ForwardOutcome::Dropped);
            };
            (packet, out_port, next_hop)
        };

        if !self.accept_message(next_hop, packet, id)? {
            return Ok(ForwardOutcome::Rejected);
        }

        let router = self.registry.router_mut(id)?;
        let ports = router.ports_mut();
        ports.take_inbox(port);
        ports.occupy_outbox(out_port, now);
        ports.grant(port);
        router.record_forward();
        tracing::trace!(
            tick = now,
            router = router.subnet_low(),
            in_port = port,
            out_port,
            to = packet.to,
            "forwarded"
        );
        Ok(ForwardOutcome::Sent)
    }
}
