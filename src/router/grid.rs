//! 2-D mesh routing.
//!
//! Routers sit on a `columns x rows` grid, each owning a 16-address subnet.
//! Router `(x, y)` owns the addresses `[(y * columns + x) * 16, +16)`, which
//! for a 4x4 grid gives the `a[7:6] = y, a[5:4] = x, a[3:0] = port` layout.
//!
//! Packets for other subnets resolve the X axis first, then the Y axis.

use serde::{Deserialize, Serialize};

use super::{EdgeKind, PortResolver};
use crate::types::{Address, PortIndex};

/// Hosts attached to each grid router.
pub const HOSTS_PER_ROUTER: u32 = 16;

/// First neighbor port; ports below it are host children.
pub const NEIGHBOR_PORT_BASE: PortIndex = HOSTS_PER_ROUTER as PortIndex;

/// Ports on a grid router: 16 children plus 4 neighbors.
pub const GRID_PORT_COUNT: usize = NEIGHBOR_PORT_BASE + 4;

/// Lateral link direction between grid routers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Port index of this direction on a grid router.
    pub fn port(self) -> PortIndex {
        NEIGHBOR_PORT_BASE
            + match self {
                Direction::North => 0,
                Direction::East => 1,
                Direction::South => 2,
                Direction::West => 3,
            }
    }

    /// The direction for a neighbor port index.
    pub fn from_port(port: PortIndex) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| d.port() == port)
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }
}

/// Coordinate of a router on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
}

/// Shape of the router grid and the address mapping onto it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub columns: u32,
    pub rows: u32,
}

impl GridGeometry {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of routers on the grid.
    pub fn router_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Number of host addresses covered by the grid.
    pub fn host_capacity(&self) -> u32 {
        self.router_count() * HOSTS_PER_ROUTER
    }

    /// Grid coordinate of the subnet that holds `address`.
    ///
    /// Addresses beyond the last row map to rows past the grid edge; routing
    /// towards them ends on a dangling edge port.
    pub fn coord_of(&self, address: Address) -> GridCoord {
        let router = u32::from(address) / HOSTS_PER_ROUTER;
        GridCoord {
            x: router % self.columns,
            y: router / self.columns,
        }
    }

    /// First address owned by the router at `coord`.
    pub fn base_address(&self, coord: GridCoord) -> u32 {
        (coord.y * self.columns + coord.x) * HOSTS_PER_ROUTER
    }

    /// The coordinate one step in `direction`, if it is still on the grid.
    pub fn neighbor(&self, coord: GridCoord, direction: Direction) -> Option<GridCoord> {
        let GridCoord { x, y } = coord;
        let next = match direction {
            Direction::North => GridCoord { x, y: y.checked_sub(1)? },
            Direction::South => GridCoord { x, y: y + 1 },
            Direction::East => GridCoord { x: x + 1, y },
            Direction::West => GridCoord { x: x.checked_sub(1)?, y },
        };
        (next.x < self.columns && next.y < self.rows).then_some(next)
    }
}

/// Routing state of one grid router.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridRouting {
    geometry: GridGeometry,
    coord: GridCoord,
}

impl GridRouting {
    pub fn new(geometry: GridGeometry, coord: GridCoord) -> Self {
        Self { geometry, coord }
    }

    pub fn coord(&self) -> GridCoord {
        self.coord
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    /// Direction of the next hop towards `target`, X axis first.
    ///
    /// Returns `None` when `target` is this router.
    pub fn direction_towards(&self, target: GridCoord) -> Option<Direction> {
        if target.x > self.coord.x {
            Some(Direction::East)
        } else if target.x < self.coord.x {
            Some(Direction::West)
        } else if target.y > self.coord.y {
            Some(Direction::South)
        } else if target.y < self.coord.y {
            Some(Direction::North)
        } else {
            None
        }
    }
}

impl PortResolver for GridRouting {
    const PORT_COUNT: usize = GRID_PORT_COUNT;

    fn resolve(&self, address: Address) -> Option<PortIndex> {
        // Each coordinate owns exactly one 16-address subnet
        let port = match self.direction_towards(self.geometry.coord_of(address)) {
            Some(direction) => direction.port(),
            None => (address & 0xf) as PortIndex,
        };
        Some(port)
    }

    fn edge_kind(&self, port: PortIndex) -> EdgeKind {
        match Direction::from_port(port) {
            Some(direction) => EdgeKind::Neighbor(direction),
            None => EdgeKind::Child,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routing(x: u32, y: u32) -> GridRouting {
        GridRouting::new(GridGeometry::new(4, 4), GridCoord { x, y })
    }

    #[test]
    fn test_direction_ports() {
        assert_eq!(Direction::North.port(), 16);
        assert_eq!(Direction::East.port(), 17);
        assert_eq!(Direction::South.port(), 18);
        assert_eq!(Direction::West.port(), 19);
        assert_eq!(Direction::from_port(18), Some(Direction::South));
        assert_eq!(Direction::from_port(3), None);
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
        }
    }

    #[test]
    fn test_reference_address_layout() {
        let geometry = GridGeometry::new(4, 4);
        // row = address / 64, column = (address / 16) mod 4
        for address in [0x0000u16, 0x0010, 0x0031, 0x00c0, 0x00ff, 0x0075] {
            let coord = geometry.coord_of(address);
            assert_eq!(coord.y, u32::from(address) / 64);
            assert_eq!(coord.x, (u32::from(address) / 16) % 4);
        }
        assert_eq!(geometry.host_capacity(), 256);
    }

    #[test]
    fn test_local_subnet_resolves_to_child() {
        let r = routing(1, 0);
        assert_eq!(r.resolve(0x0010), Some(0));
        assert_eq!(r.resolve(0x001f), Some(15));
        assert_eq!(r.resolve(0x0017), Some(7));
    }

    #[test]
    fn test_x_before_y() {
        let r = routing(1, 0);
        // 0x0031 is (3, 0): straight east
        assert_eq!(r.resolve(0x0031), Some(Direction::East.port()));
        // 0x0040 is (0, 1): diagonal, west first
        assert_eq!(r.resolve(0x0040), Some(Direction::West.port()));
        // 0x0050 is (1, 1): same column, south
        assert_eq!(r.resolve(0x0050), Some(Direction::South.port()));

        let r = routing(2, 3);
        assert_eq!(r.resolve(0x0020), Some(Direction::North.port()));
        assert_eq!(r.resolve(0x0000), Some(Direction::West.port()));
    }

    #[test]
    fn test_neighbor_bounds() {
        let geometry = GridGeometry::new(4, 2);
        let corner = GridCoord { x: 0, y: 0 };
        assert_eq!(geometry.neighbor(corner, Direction::North), None);
        assert_eq!(geometry.neighbor(corner, Direction::West), None);
        assert_eq!(
            geometry.neighbor(corner, Direction::East),
            Some(GridCoord { x: 1, y: 0 })
        );
        assert_eq!(
            geometry.neighbor(GridCoord { x: 3, y: 1 }, Direction::South),
            None
        );
    }

    #[test]
    fn test_edge_kinds() {
        let r = routing(0, 0);
        assert_eq!(r.edge_kind(4), EdgeKind::Child);
        assert_eq!(r.edge_kind(16), EdgeKind::Neighbor(Direction::North));
    }
}
