//! Packet definitions.
//!
//! A packet is the unit of transfer between nodes. It is a plain value:
//! when a node accepts a packet it owns it and the sender keeps nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Address, Tick};

/// Type of message carried by a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    /// Remote procedure call request
    RpcCall,
    /// Remote procedure call response
    RpcReturn,
    /// Interrupt delivered over the RPC network
    RpcInterrupt,
    /// DMA read request
    DmaRead,
    /// DMA read response data
    DmaRdata,
    /// DMA write request carrying data
    DmaWrite,
    /// DMA write acknowledgement
    DmaAck,
}

impl PacketKind {
    /// Every packet kind, in declaration order.
    pub const ALL: [PacketKind; 7] = [
        PacketKind::RpcCall,
        PacketKind::RpcReturn,
        PacketKind::RpcInterrupt,
        PacketKind::DmaRead,
        PacketKind::DmaRdata,
        PacketKind::DmaWrite,
        PacketKind::DmaAck,
    ];

    /// Short name used in logs and CSV exports.
    pub fn name(&self) -> &'static str {
        match self {
            PacketKind::RpcCall => "rpc_call",
            PacketKind::RpcReturn => "rpc_return",
            PacketKind::RpcInterrupt => "rpc_interrupt",
            PacketKind::DmaRead => "dma_read",
            PacketKind::DmaRdata => "dma_rdata",
            PacketKind::DmaWrite => "dma_write",
            PacketKind::DmaAck => "dma_ack",
        }
    }
}

/// Default reply size, in words, for requests that do not carry data back.
pub const DEFAULT_REPLY_SIZE: u32 = 4;

/// A message exchanged between nodes.
///
/// `size` is the word count of the logical transfer. It drives logging and
/// the RAM model's reply sizing but no data is actually moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Source host address
    pub from: Address,
    /// Destination host address
    pub to: Address,
    /// Word count of the transfer
    pub size: u32,
    /// Message type
    pub kind: PacketKind,
    /// Free-form tag; request sequence numbers are echoed in replies
    pub payload_tag: u32,
    /// Size of the reply the sender expects (DMA reads and writes)
    pub reply_size: u32,
    /// Tick at which the packet was created
    pub sent_at: Tick,
}

impl Packet {
    /// Creates a new packet.
    pub fn new(from: Address, to: Address, size: u32, kind: PacketKind, sent_at: Tick) -> Self {
        Self {
            from,
            to,
            size,
            kind,
            payload_tag: 0,
            reply_size: DEFAULT_REPLY_SIZE,
            sent_at,
        }
    }

    /// Sets the expected reply size.
    pub fn with_reply_size(mut self, reply_size: u32) -> Self {
        self.reply_size = reply_size;
        self
    }

    /// Sets the payload tag.
    pub fn with_tag(mut self, tag: u32) -> Self {
        self.payload_tag = tag;
        self
    }

    /// Ticks elapsed between creation and `now`.
    pub fn latency(&self, now: Tick) -> Tick {
        now.saturating_sub(self.sent_at)
    }
}

/// Latency totals for one class of packets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub min_latency: Option<Tick>,
    pub max_latency: Option<Tick>,
    pub total_latency: u64,
}

impl LatencyStats {
    fn record(&mut self, latency: Tick) {
        self.count += 1;
        self.total_latency += latency;
        self.min_latency = Some(self.min_latency.map_or(latency, |m| m.min(latency)));
        self.max_latency = Some(self.max_latency.map_or(latency, |m| m.max(latency)));
    }

    /// Mean latency, or `None` when nothing was recorded.
    pub fn mean_latency(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total_latency as f64 / self.count as f64)
    }
}

/// Delivery statistics over all packets accepted by hosts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketStats {
    pub overall: LatencyStats,
    pub by_kind: BTreeMap<PacketKind, LatencyStats>,
}

impl PacketStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `packet` reached its final destination at `now`.
    pub fn record(&mut self, packet: &Packet, now: Tick) {
        let latency = packet.latency(now);
        self.overall.record(latency);
        self.by_kind.entry(packet.kind).or_default().record(latency);
    }

    /// Number of delivered packets of `kind`.
    pub fn delivered(&self, kind: PacketKind) -> u64 {
        self.by_kind.get(&kind).map_or(0, |s| s.count)
    }
}
