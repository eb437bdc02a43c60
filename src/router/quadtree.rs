//! Hierarchical quadtree routing.
//!
//! A router owning a subnet of `size` addresses splits it into four equal
//! children of `size / 4`. Addresses outside the subnet go up through the
//! parent port.

use super::{EdgeKind, PortResolver};
use crate::config::{ConfigError, ConfigResult};
use crate::types::{Address, PortIndex, ADDRESS_SPACE};

/// Child ports are 0-3.
pub const CHILD_COUNT: usize = 4;

/// Port leading to the parent router.
pub const PARENT_PORT: PortIndex = CHILD_COUNT;

/// Ports on a quadtree router: 4 children plus the parent.
pub const QUADTREE_PORT_COUNT: usize = CHILD_COUNT + 1;

/// Returns true if `size` is a power of four in `[4, 65536]`.
pub fn is_valid_subnet_size(size: u32) -> bool {
    size >= 4 && size <= ADDRESS_SPACE && size.is_power_of_two() && size.trailing_zeros() % 2 == 0
}

/// Routing state of one quadtree router.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuadtreeRouting {
    subnet_low: Address,
    subnet_mask: Address,
    /// Bits of the address selecting the child
    port_mask: Address,
    port_shift: u32,
    is_root: bool,
}

impl QuadtreeRouting {
    /// Creates the routing state for the subnet `[low, low + size)`.
    pub fn new(low: Address, size: u32, is_root: bool) -> ConfigResult<Self> {
        if !is_valid_subnet_size(size) {
            return Err(ConfigError::Validation(format!(
                "quadtree subnet size {size} is not a power of four between 4 and {ADDRESS_SPACE}"
            )));
        }
        if u32::from(low) % size != 0 {
            return Err(ConfigError::Validation(format!(
                "quadtree subnet base {low:#06x} is not aligned to its size {size}"
            )));
        }

        // The mask bits above the subnet; a full 16-bit subnet has none
        let subnet_mask = !(size - 1) as Address;
        let child_size = size / 4;
        let port_mask = !(child_size - 1) as Address & !subnet_mask;

        Ok(Self {
            subnet_low: low,
            subnet_mask,
            port_mask,
            port_shift: child_size.trailing_zeros(),
            is_root,
        })
    }

    pub fn subnet_low(&self) -> Address {
        self.subnet_low
    }

    pub fn subnet_mask(&self) -> Address {
        self.subnet_mask
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Returns true if `address` lies inside this subtree.
    pub fn contains(&self, address: Address) -> bool {
        address & self.subnet_mask == self.subnet_low
    }
}

impl PortResolver for QuadtreeRouting {
    const PORT_COUNT: usize = QUADTREE_PORT_COUNT;

    fn resolve(&self, address: Address) -> Option<PortIndex> {
        if !self.contains(address) {
            return (!self.is_root).then_some(PARENT_PORT);
        }
        Some(((address & self.port_mask) >> self.port_shift) as PortIndex)
    }

    fn edge_kind(&self, port: PortIndex) -> EdgeKind {
        if port == PARENT_PORT {
            EdgeKind::Parent
        } else {
            EdgeKind::Child
        }
    }
}
