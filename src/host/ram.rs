//! RAM host: serves RPC calls and DMA transfers.
//!
//! | request    | reply        | reply size             |
//! |------------|--------------|------------------------|
//! | `RpcCall`  | `RpcReturn`  | 4 words                |
//! | `DmaWrite` | `DmaAck`     | request's `reply_size` |
//! | `DmaRead`  | `DmaRdata`   | request's `reply_size` |
//!
//! Replies become ready `latency` ticks after the request arrived and leave
//! one per tick. A reply the parent rejects goes back to the head of the
//! queue.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::HostBehavior;
use crate::packet::{Packet, PacketKind, DEFAULT_REPLY_SIZE};
use crate::types::{Address, Tick};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingReply {
    ready_at: Tick,
    packet: Packet,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamCounters {
    pub rpc_calls: u64,
    pub dma_writes: u64,
    pub dma_reads: u64,
    pub unexpected: u64,
    /// Replies handed to the parent router, retries included
    pub replies_offered: u64,
    pub retries: u64,
    pub peak_queue: usize,
}

#[derive(Clone, Debug)]
pub struct RamHost {
    address: Address,
    latency: Tick,
    queue: VecDeque<PendingReply>,
    counters: RamCounters,
}

impl RamHost {
    pub fn new(address: Address, latency: Tick) -> Self {
        Self {
            address,
            latency,
            queue: VecDeque::new(),
            counters: RamCounters::default(),
        }
    }

    pub fn counters(&self) -> &RamCounters {
        &self.counters
    }

    /// Replies waiting to be sent.
    pub fn queued_replies(&self) -> usize {
        self.queue.len()
    }

    fn reply_for(&mut self, request: &Packet, now: Tick) -> Option<Packet> {
        let (kind, size) = match request.kind {
            PacketKind::RpcCall => {
                self.counters.rpc_calls += 1;
                (PacketKind::RpcReturn, DEFAULT_REPLY_SIZE)
            }
            PacketKind::DmaWrite => {
                self.counters.dma_writes += 1;
                (PacketKind::DmaAck, request.reply_size)
            }
            PacketKind::DmaRead => {
                self.counters.dma_reads += 1;
                (PacketKind::DmaRdata, request.reply_size)
            }
            other => {
                self.counters.unexpected += 1;
                tracing::warn!(
                    tick = now,
                    host = self.address,
                    from = request.from,
                    kind = other.name(),
                    "RAM does not serve this message type, ignoring"
                );
                return None;
            }
        };
        Some(Packet::new(self.address, request.from, size, kind, now).with_tag(request.payload_tag))
    }
}

impl HostBehavior for RamHost {
    fn on_tick(&mut self, now: Tick) -> Vec<Packet> {
        if !self.queue.front().is_some_and(|r| r.ready_at <= now) {
            return Vec::new();
        }
        match self.queue.pop_front() {
            Some(reply) => {
                self.counters.replies_offered += 1;
                vec![Packet {
                    sent_at: now,
                    ..reply.packet
                }]
            }
            None => Vec::new(),
        }
    }

    fn on_packet(&mut self, packet: Packet, now: Tick) -> Vec<Packet> {
        if let Some(reply) = self.reply_for(&packet, now) {
            self.queue.push_back(PendingReply {
                ready_at: now + self.latency,
                packet: reply,
            });
            self.counters.peak_queue = self.counters.peak_queue.max(self.queue.len());
        }
        Vec::new()
    }

    fn on_send_rejected(&mut self, packet: Packet, now: Tick) {
        self.counters.retries += 1;
        tracing::warn!(
            tick = now,
            host = self.address,
            to = packet.to,
            kind = packet.kind.name(),
            "reply rejected by parent router, retrying"
        );
        self.queue.push_front(PendingReply {
            ready_at: now,
            packet,
        });
    }

    fn stats(&self) -> serde_json::Value {
        serde_json::to_value(&self.counters).unwrap_or_default()
    }
}
