//! Per-port buffering and arbitration state shared by every router kind.
//!
//! Each port models one physical link:
//! - a one-packet-deep inbox, written only by `try_accept` and cleared only by
//!   the owning router when it forwards or drops the packet,
//! - an outbox busy flag, set when the router forwards through the port and
//!   cleared only by time passing (`release_outboxes`).
//!
//! Arbitration between input ports is round-robin: the scan for packets to
//! forward starts at the port after the last one granted.

use crate::packet::Packet;
use crate::types::{NodeId, PortIndex, Tick, LINK_TICKS};

/// A packet waiting in an inbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InboxEntry {
    pub packet: Packet,
    /// First tick at which the packet has fully arrived and may be forwarded
    pub ready_at: Tick,
}

/// State of one router port.
#[derive(Clone, Debug, Default)]
pub struct Port {
    link: Option<NodeId>,
    inbox: Option<InboxEntry>,
    outbox_clear_at: Option<Tick>,
}

impl Port {
    /// The attached node, if any.
    pub fn link(&self) -> Option<NodeId> {
        self.link
    }

    /// The waiting packet, if any.
    pub fn inbox(&self) -> Option<&InboxEntry> {
        self.inbox.as_ref()
    }

    /// Tick at which the outbox frees up, if it is busy.
    pub fn outbox_clear_at(&self) -> Option<Tick> {
        self.outbox_clear_at
    }
}

/// The port table of one router.
#[derive(Clone, Debug)]
pub struct PortTable {
    ports: Vec<Port>,
    /// Port the next arbitration scan starts from
    rr_next: PortIndex,
}

impl PortTable {
    /// Creates a table of `count` unattached, empty ports.
    pub fn new(count: usize) -> Self {
        Self {
            ports: vec![Port::default(); count],
            rr_next: 0,
        }
    }

    /// Returns the number of ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Returns true if the table has no ports.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Returns a port by index.
    pub fn port(&self, port: PortIndex) -> Option<&Port> {
        self.ports.get(port)
    }

    /// Attaches `node` to `port`, returning the node previously attached.
    pub fn attach(&mut self, port: PortIndex, node: NodeId) -> Option<NodeId> {
        self.ports.get_mut(port).and_then(|p| p.link.replace(node))
    }

    /// The node attached to `port`.
    pub fn link(&self, port: PortIndex) -> Option<NodeId> {
        self.ports.get(port).and_then(|p| p.link)
    }

    /// The port `node` is attached to.
    pub fn port_of(&self, node: NodeId) -> Option<PortIndex> {
        self.ports.iter().position(|p| p.link == Some(node))
    }

    /// Iterates over `(port, node)` for every attached port.
    pub fn links(&self) -> impl Iterator<Item = (PortIndex, NodeId)> + '_ {
        self.ports
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.link.map(|node| (i, node)))
    }

    /// Stores `packet` in the inbox of `port`.
    ///
    /// Returns false, leaving the inbox untouched, if it is already occupied.
    pub fn try_accept(&mut self, port: PortIndex, packet: Packet, now: Tick) -> bool {
        match self.ports.get_mut(port) {
            Some(p) if p.inbox.is_none() => {
                p.inbox = Some(InboxEntry {
                    packet,
                    ready_at: now + LINK_TICKS,
                });
                true
            }
            _ => false,
        }
    }

    /// Returns true if the inbox of `port` holds a packet.
    pub fn inbox_occupied(&self, port: PortIndex) -> bool {
        self.ports.get(port).is_some_and(|p| p.inbox.is_some())
    }

    /// The packet in `port`'s inbox if it has finished arriving by `now`.
    pub fn ready_packet(&self, port: PortIndex, now: Tick) -> Option<Packet> {
        self.ports
            .get(port)
            .and_then(|p| p.inbox)
            .filter(|entry| entry.ready_at <= now)
            .map(|entry| entry.packet)
    }

    /// Removes and returns the packet in `port`'s inbox.
    pub fn take_inbox(&mut self, port: PortIndex) -> Option<Packet> {
        self.ports
            .get_mut(port)
            .and_then(|p| p.inbox.take())
            .map(|entry| entry.packet)
    }

    /// Clears every outbox whose busy period has ended by `now`.
    pub fn release_outboxes(&mut self, now: Tick) {
        for port in &mut self.ports {
            if port.outbox_clear_at.is_some_and(|t| t <= now) {
                port.outbox_clear_at = None;
            }
        }
    }

    /// Returns true while `port`'s outbox is busy.
    pub fn outbox_busy(&self, port: PortIndex) -> bool {
        self.ports
            .get(port)
            .is_some_and(|p| p.outbox_clear_at.is_some())
    }

    /// Marks `port`'s outbox busy for one link transfer starting at `now`.
    pub fn occupy_outbox(&mut self, port: PortIndex, now: Tick) {
        if let Some(p) = self.ports.get_mut(port) {
            p.outbox_clear_at = Some(now + LINK_TICKS);
        }
    }

    /// The order in which this tick's forwarding scan visits input ports.
    pub fn scan_order(&self) -> Vec<PortIndex> {
        let n = self.ports.len();
        (0..n).map(|i| (self.rr_next + i) % n).collect()
    }

    /// Records that `port` was serviced; the next scan starts after it.
    pub fn grant(&mut self, port: PortIndex) {
        if !self.ports.is_empty() {
            self.rr_next = (port + 1) % self.ports.len();
        }
    }

    /// The port the next scan starts from.
    pub fn rr_next(&self) -> PortIndex {
        self.rr_next
    }

    /// Number of inboxes currently holding a packet.
    pub fn occupied_inboxes(&self) -> usize {
        self.ports.iter().filter(|p| p.inbox.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;

    fn packet(from: u16) -> Packet {
        Packet::new(from, 0x00ff, 4, PacketKind::RpcCall, 0)
    }

    #[test]
    fn test_port_table_creation() {
        let table = PortTable::new(5);
        assert_eq!(table.len(), 5);
        assert!(table.links().next().is_none());
        assert_eq!(table.rr_next(), 0);
        assert_eq!(table.occupied_inboxes(), 0);
    }

    #[test]
    fn test_attach_and_lookup() {
        let mut table = PortTable::new(5);
        assert_eq!(table.attach(2, 17), None);
        assert_eq!(table.attach(4, 3), None);
        assert_eq!(table.attach(9, 3), None);

        assert_eq!(table.link(2), Some(17));
        assert_eq!(table.port_of(3), Some(4));
        assert_eq!(table.port_of(99), None);
        assert_eq!(table.links().collect::<Vec<_>>(), vec![(2, 17), (4, 3)]);
    }

    #[test]
    fn test_inbox_exclusivity() {
        let mut table = PortTable::new(5);

        assert!(table.try_accept(1, packet(1), 10));
        assert!(!table.try_accept(1, packet(2), 10));
        assert!(!table.try_accept(1, packet(3), 11));

        // The first packet is unchanged by the rejected attempts
        assert_eq!(table.take_inbox(1).map(|p| p.from), Some(1));
        assert!(table.try_accept(1, packet(4), 12));
        assert!(!table.try_accept(7, packet(5), 12));
    }

    #[test]
    fn test_serialization_delay() {
        let mut table = PortTable::new(5);
        table.try_accept(0, packet(1), 10);

        assert!(table.inbox_occupied(0));
        assert!(table.ready_packet(0, 13).is_none());
        assert!(table.ready_packet(0, 14).is_some());
        assert_eq!(table.port(0).and_then(|p| p.inbox()).map(|e| e.ready_at), Some(14));
    }

    #[test]
    fn test_outbox_busy_window() {
        let mut table = PortTable::new(5);
        table.occupy_outbox(3, 20);

        for now in 20..24 {
            table.release_outboxes(now);
            assert!(table.outbox_busy(3), "busy at tick {now}");
        }
        table.release_outboxes(24);
        assert!(!table.outbox_busy(3));
    }

    #[test]
    fn test_round_robin_scan() {
        let mut table = PortTable::new(5);
        assert_eq!(table.scan_order(), vec![0, 1, 2, 3, 4]);

        table.grant(2);
        assert_eq!(table.scan_order(), vec![3, 4, 0, 1, 2]);

        table.grant(4);
        assert_eq!(table.rr_next(), 0);
    }
}
