//! CPU host.
//!
//! Alternates between waiting for a cache line from RAM and executing. Each
//! executing tick misses with probability `miss_rate_percent / 100`, which
//! issues a new read and stalls the CPU until the data returns.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::HostBehavior;
use crate::config::CpuConfig;
use crate::packet::{Packet, PacketKind};
use crate::types::{Address, Tick};

/// Words in a cache line read request.
const READ_REQUEST_SIZE: u32 = 3;

/// Words returned for a cache line.
const CACHE_LINE_SIZE: u32 = 35;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuState {
    WaitRam,
    Executing,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuCounters {
    /// Ticks spent in each state
    pub cycles: BTreeMap<CpuState, u64>,
    pub reads_issued: u64,
    pub misses: u64,
    /// Interrupts from the NIC announcing a received frame
    pub frames_received: u64,
    pub unexpected: u64,
}

#[derive(Clone, Debug)]
pub struct CpuHost {
    address: Address,
    ram: Address,
    miss_rate_percent: u32,
    rng: Xoshiro256PlusPlus,
    state: CpuState,
    started: bool,
    next_tag: u32,
    counters: CpuCounters,
}

impl CpuHost {
    pub fn new(address: Address, ram: Address, config: &CpuConfig, seed: u64) -> Self {
        Self {
            address,
            ram,
            miss_rate_percent: config.miss_rate_percent,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed ^ u64::from(address)),
            state: CpuState::WaitRam,
            started: false,
            next_tag: 0,
            counters: CpuCounters::default(),
        }
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn counters(&self) -> &CpuCounters {
        &self.counters
    }

    fn read_request(&mut self, now: Tick) -> Packet {
        self.counters.reads_issued += 1;
        self.next_tag = self.next_tag.wrapping_add(1);
        Packet::new(self.address, self.ram, READ_REQUEST_SIZE, PacketKind::DmaRead, now)
            .with_reply_size(CACHE_LINE_SIZE)
            .with_tag(self.next_tag)
    }
}

impl HostBehavior for CpuHost {
    fn on_tick(&mut self, now: Tick) -> Vec<Packet> {
        *self.counters.cycles.entry(self.state).or_default() += 1;

        if !self.started {
            self.started = true;
            self.state = CpuState::WaitRam;
            return vec![self.read_request(now)];
        }

        if self.state == CpuState::Executing
            && self.rng.gen_range(0..100) < self.miss_rate_percent
        {
            self.counters.misses += 1;
            self.state = CpuState::WaitRam;
            return vec![self.read_request(now)];
        }
        Vec::new()
    }

    fn on_packet(&mut self, packet: Packet, now: Tick) -> Vec<Packet> {
        match (self.state, packet.kind) {
            (CpuState::WaitRam, PacketKind::DmaRdata) if packet.from == self.ram => {
                self.state = CpuState::Executing;
            }
            (_, PacketKind::RpcInterrupt) => {
                self.counters.frames_received += 1;
            }
            (state, kind) => {
                self.counters.unexpected += 1;
                tracing::warn!(
                    tick = now,
                    host = self.address,
                    from = packet.from,
                    kind = kind.name(),
                    ?state,
                    "CPU does not expect this message, ignoring"
                );
            }
        }
        Vec::new()
    }

    fn stats(&self) -> serde_json::Value {
        serde_json::to_value(&self.counters).unwrap_or_default()
    }
}
