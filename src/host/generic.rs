//! Generic host: consumes every packet and optionally sends scripted ones.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::HostBehavior;
use crate::packet::{Packet, PacketKind};
use crate::types::{Address, Tick};

/// A packet the host sends once `at_tick` is reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSend {
    pub at_tick: Tick,
    pub to: Address,
    pub size: u32,
    pub kind: PacketKind,
}

/// One packet received by a generic host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    pub tick: Tick,
    pub from: Address,
    pub kind: PacketKind,
    pub latency: Tick,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericCounters {
    /// Send attempts handed to the parent router, retries included
    pub packets_offered: u64,
    pub send_rejections: u64,
    pub packets_received: u64,
    pub words_received: u64,
    pub last_arrival: Option<Tick>,
}

/// Host that accepts everything.
///
/// Scheduled sends become due at their tick and leave one per tick in
/// schedule order. A send the parent rejects is retried on the next tick.
#[derive(Clone, Debug)]
pub struct GenericHost {
    address: Address,
    schedule: VecDeque<ScheduledSend>,
    outbox: VecDeque<Packet>,
    arrivals: Vec<Arrival>,
    counters: GenericCounters,
}

impl GenericHost {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            schedule: VecDeque::new(),
            outbox: VecDeque::new(),
            arrivals: Vec::new(),
            counters: GenericCounters::default(),
        }
    }

    /// Adds `send` to the schedule, keeping it ordered by tick.
    pub fn schedule(&mut self, send: ScheduledSend) {
        let index = self
            .schedule
            .iter()
            .position(|s| s.at_tick > send.at_tick)
            .unwrap_or(self.schedule.len());
        self.schedule.insert(index, send);
    }

    /// Builder form of [`schedule`](Self::schedule).
    pub fn with_send(mut self, send: ScheduledSend) -> Self {
        self.schedule(send);
        self
    }

    /// Queues `packet` for sending on the next tick.
    pub fn enqueue(&mut self, packet: Packet) {
        self.outbox.push_back(packet);
    }

    /// Packets received so far, in arrival order.
    pub fn arrivals(&self) -> &[Arrival] {
        &self.arrivals
    }

    pub fn counters(&self) -> &GenericCounters {
        &self.counters
    }

    /// Number of sends not yet accepted by the parent router.
    pub fn pending_sends(&self) -> usize {
        self.schedule.len() + self.outbox.len()
    }
}

impl HostBehavior for GenericHost {
    fn on_tick(&mut self, now: Tick) -> Vec<Packet> {
        while self.schedule.front().is_some_and(|s| s.at_tick <= now) {
            if let Some(send) = self.schedule.pop_front() {
                self.outbox
                    .push_back(Packet::new(self.address, send.to, send.size, send.kind, now));
            }
        }

        match self.outbox.pop_front() {
            Some(packet) => {
                self.counters.packets_offered += 1;
                vec![packet]
            }
            None => Vec::new(),
        }
    }

    fn on_packet(&mut self, packet: Packet, now: Tick) -> Vec<Packet> {
        self.counters.packets_received += 1;
        self.counters.words_received += u64::from(packet.size);
        self.counters.last_arrival = Some(now);
        self.arrivals.push(Arrival {
            tick: now,
            from: packet.from,
            kind: packet.kind,
            latency: packet.latency(now),
        });
        tracing::debug!(
            tick = now,
            host = self.address,
            from = packet.from,
            kind = packet.kind.name(),
            latency = packet.latency(now),
            "packet delivered"
        );
        Vec::new()
    }

    fn on_send_rejected(&mut self, packet: Packet, now: Tick) {
        self.counters.send_rejections += 1;
        tracing::warn!(
            tick = now,
            host = self.address,
            to = packet.to,
            "send rejected by parent router, retrying"
        );
        self.outbox.push_front(packet);
    }

    fn stats(&self) -> serde_json::Value {
        serde_json::to_value(&self.counters).unwrap_or_default()
    }
}
