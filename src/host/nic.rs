//! NIC host: receives frames from an external line and hands them to the CPU.
//!
//! Frames arrive on their own schedule. Each frame needs a RAM buffer; the
//! receive path is:
//!
//! ```text
//! Idle --(no buffer)--> WaitAlloc --RpcReturn--> Idle
//! Idle --(frame)--> WaitWrite --DmaAck--> WaitChown --RpcReturn--> WaitSend --(drain)--> Idle
//! ```
//!
//! A frame arriving while another one is still pending is dropped.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::HostBehavior;
use crate::config::NicConfig;
use crate::packet::{Packet, PacketKind, DEFAULT_REPLY_SIZE};
use crate::types::{Address, Tick};

/// Words of DMA header preceding the frame data.
const DMA_HEADER_SIZE: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NicState {
    Idle,
    WaitAlloc,
    WaitWrite,
    WaitChown,
    WaitSend,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicCounters {
    /// Ticks spent in each state
    pub cycles: BTreeMap<NicState, u64>,
    pub frames_total: u64,
    pub frames_processed: u64,
    pub frames_dropped: u64,
    /// Frames announced to the CPU
    pub frames_forwarded: u64,
    pub unexpected: u64,
    pub send_rejections: u64,
}

#[derive(Clone, Debug)]
pub struct NicHost {
    address: Address,
    ram: Address,
    cpu: Address,
    config: NicConfig,
    rng: Xoshiro256PlusPlus,
    state: NicState,
    free_buffers: u32,
    pending_frame: Option<u32>,
    next_frame_at: Tick,
    next_frame_size: u32,
    return_to_idle_at: Tick,
    next_tag: u32,
    counters: NicCounters,
}

impl NicHost {
    pub fn new(address: Address, ram: Address, cpu: Address, config: &NicConfig, seed: u64) -> Self {
        Self {
            address,
            ram,
            cpu,
            config: config.clone(),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed ^ u64::from(address)),
            state: NicState::Idle,
            free_buffers: 0,
            pending_frame: None,
            next_frame_at: config.first_frame_tick,
            next_frame_size: config.first_frame_size,
            return_to_idle_at: 0,
            next_tag: 0,
            counters: NicCounters::default(),
        }
    }

    pub fn state(&self) -> NicState {
        self.state
    }

    pub fn free_buffers(&self) -> u32 {
        self.free_buffers
    }

    pub fn counters(&self) -> &NicCounters {
        &self.counters
    }

    fn request(&mut self, to: Address, size: u32, kind: PacketKind, now: Tick) -> Packet {
        self.next_tag = self.next_tag.wrapping_add(1);
        Packet::new(self.address, to, size, kind, now).with_tag(self.next_tag)
    }

    fn alloc_request(&mut self, now: Tick) -> Packet {
        self.request(self.ram, DEFAULT_REPLY_SIZE, PacketKind::RpcCall, now)
            .with_reply_size(DEFAULT_REPLY_SIZE)
    }

    fn poll_frame_arrival(&mut self, now: Tick) {
        if now < self.next_frame_at {
            return;
        }

        self.counters.frames_total += 1;
        if self.pending_frame.is_some() {
            self.counters.frames_dropped += 1;
            tracing::warn!(tick = now, host = self.address, "dropping frame: no rx buffer");
        } else {
            self.counters.frames_processed += 1;
            self.pending_frame = Some(self.next_frame_size);
        }

        // The line delivers one byte per tick
        let sizes = self.config.frame_size_min..self.config.frame_size_max;
        let gaps = self.config.gap_min..self.config.gap_max;
        self.next_frame_size = self.rng.gen_range(sizes);
        let gap = self.rng.gen_range(gaps);
        self.next_frame_at = now + Tick::from(self.next_frame_size) + Tick::from(gap);
    }

    fn unexpected(&mut self, packet: &Packet, now: Tick) {
        self.counters.unexpected += 1;
        tracing::warn!(
            tick = now,
            host = self.address,
            from = packet.from,
            kind = packet.kind.name(),
            state = ?self.state,
            "NIC does not know what to do with this message, ignoring"
        );
    }
}

impl HostBehavior for NicHost {
    fn on_tick(&mut self, now: Tick) -> Vec<Packet> {
        self.poll_frame_arrival(now);
        *self.counters.cycles.entry(self.state).or_default() += 1;

        match self.state {
            NicState::Idle if self.free_buffers == 0 => {
                self.state = NicState::WaitAlloc;
                vec![self.alloc_request(now)]
            }
            NicState::Idle => match self.pending_frame {
                Some(frame_size) => {
                    self.state = NicState::WaitWrite;
                    let write = self
                        .request(self.ram, DMA_HEADER_SIZE + frame_size, PacketKind::DmaWrite, now)
                        .with_reply_size(DMA_HEADER_SIZE);
                    vec![write]
                }
                None => Vec::new(),
            },
            NicState::WaitSend if now >= self.return_to_idle_at => {
                self.pending_frame = None;
                self.state = NicState::Idle;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn on_packet(&mut self, packet: Packet, now: Tick) -> Vec<Packet> {
        let from_ram = packet.from == self.ram;
        match (self.state, packet.kind) {
            (NicState::WaitAlloc, PacketKind::RpcReturn) if from_ram => {
                self.free_buffers += 1;
                self.state = NicState::Idle;
                Vec::new()
            }
            (NicState::WaitWrite, PacketKind::DmaAck) if from_ram => {
                // Hand the written buffer over to the CPU
                self.state = NicState::WaitChown;
                vec![self.alloc_request(now)]
            }
            (NicState::WaitChown, PacketKind::RpcReturn) if from_ram => {
                self.state = NicState::WaitSend;
                self.return_to_idle_at = now + self.config.drain_delay;
                self.free_buffers = self.free_buffers.saturating_sub(1);
                self.counters.frames_forwarded += 1;
                vec![self.request(self.cpu, DEFAULT_REPLY_SIZE, PacketKind::RpcInterrupt, now)]
            }
            _ => {
                self.unexpected(&packet, now);
                Vec::new()
            }
        }
    }

    fn on_send_rejected(&mut self, packet: Packet, now: Tick) {
        self.counters.send_rejections += 1;
        tracing::warn!(
            tick = now,
            host = self.address,
            to = packet.to,
            kind = packet.kind.name(),
            "NIC could not send message"
        );
    }

    fn stats(&self) -> serde_json::Value {
        serde_json::to_value(&self.counters).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NIC: Address = 0x00c0;
    const RAM: Address = 0x0010;
    const CPU: Address = 0x0000;

    fn nic() -> NicHost {
        NicHost::new(NIC, RAM, CPU, &NicConfig::default(), 0)
    }

    fn from_ram(kind: PacketKind) -> Packet {
        Packet::new(RAM, NIC, 4, kind, 0)
    }

    #[test]
    fn test_bootstrap_allocation() {
        let mut nic = nic();
        let sent = nic.on_tick(0);

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, PacketKind::RpcCall);
        assert_eq!(sent[0].to, RAM);
        assert_eq!(nic.state(), NicState::WaitAlloc);

        nic.on_packet(from_ram(PacketKind::RpcReturn), 10);
        assert_eq!(nic.state(), NicState::Idle);
        assert_eq!(nic.free_buffers(), 1);
    }

    #[test]
    fn test_frame_pipeline() {
        let mut nic = nic();
        nic.on_tick(0);
        nic.on_packet(from_ram(PacketKind::RpcReturn), 10);

        // Idle with a buffer and no frame until the first frame arrives
        for tick in 11..200 {
            assert!(nic.on_tick(tick).is_empty());
        }
        let write = nic.on_tick(200);
        assert_eq!(write[0].kind, PacketKind::DmaWrite);
        assert_eq!(write[0].size, 3 + 65);
        assert_eq!(write[0].reply_size, 3);
        assert_eq!(nic.state(), NicState::WaitWrite);

        let chown = nic.on_packet(from_ram(PacketKind::DmaAck), 210);
        assert_eq!(chown[0].kind, PacketKind::RpcCall);
        assert_eq!(nic.state(), NicState::WaitChown);

        let irq = nic.on_packet(from_ram(PacketKind::RpcReturn), 220);
        assert_eq!(irq[0].kind, PacketKind::RpcInterrupt);
        assert_eq!(irq[0].to, CPU);
        assert_eq!(nic.state(), NicState::WaitSend);
        assert_eq!(nic.free_buffers(), 0);

        nic.on_tick(223);
        assert_eq!(nic.state(), NicState::WaitSend);
        nic.on_tick(224);
        assert_eq!(nic.state(), NicState::Idle);
        assert_eq!(nic.counters().frames_forwarded, 1);
    }

    #[test]
    fn test_frame_drop_accounting() {
        let mut nic = nic();
        // Never answer the allocation: every frame after the first is dropped
        for tick in 0..20_000 {
            nic.on_tick(tick);
            let c = nic.counters();
            assert_eq!(c.frames_total, c.frames_processed + c.frames_dropped);
        }
        let c = nic.counters();
        assert_eq!(c.frames_processed, 1);
        assert!(c.frames_dropped > 0);
    }

    #[test]
    fn test_unexpected_message_keeps_state() {
        let mut nic = nic();
        nic.on_tick(0);
        nic.on_packet(from_ram(PacketKind::DmaAck), 5);
        nic.on_packet(Packet::new(0x0099, NIC, 4, PacketKind::RpcReturn, 0), 6);

        assert_eq!(nic.state(), NicState::WaitAlloc);
        assert_eq!(nic.counters().unexpected, 2);
    }

    #[test]
    fn test_cycle_counters() {
        let mut nic = nic();
        for tick in 0..50 {
            nic.on_tick(tick);
        }
        let c = nic.counters();
        assert_eq!(c.cycles[&NicState::Idle], 1);
        assert_eq!(c.cycles[&NicState::WaitAlloc], 49);
        assert_eq!(c.cycles.values().sum::<u64>(), 50);
    }
}
