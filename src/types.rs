//! Core type definitions for the simulator.
//!
//! This module defines the fundamental types shared by routers, hosts and the engine.

use serde::{Deserialize, Serialize};

/// Simulation time, in ticks.
///
/// Every timing quantity in the model (serialization delay, link busy
/// duration, host service latency) is expressed in this unit.
pub type Tick = u64;

/// A 16-bit network address.
///
/// The address space `[0, 65535]` is partitioned into power-of-two aligned
/// subnets, one per router, and a host owns exactly one address.
pub type Address = u16;

/// Index of a node in the [`NodeRegistry`](crate::registry::NodeRegistry) arena.
pub type NodeId = usize;

/// Index of a port on a router.
pub type PortIndex = usize;

/// Ticks needed to move one packet across a 32-bit link.
///
/// Applied both as the inbox readiness delay and as the outbox busy time.
pub const LINK_TICKS: Tick = 4;

/// Number of addresses in the 16-bit space.
pub const ADDRESS_SPACE: u32 = 1 << 16;

/// Rendering position of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XyPos {
    pub x: u32,
    pub y: u32,
}

impl XyPos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Builds a position from signed layout arithmetic, clamping at the origin.
    pub fn clamped(x: i64, y: i64) -> Self {
        let clamp = |v: i64| u32::try_from(v.max(0)).unwrap_or(u32::MAX);
        Self {
            x: clamp(x),
            y: clamp(y),
        }
    }
}
