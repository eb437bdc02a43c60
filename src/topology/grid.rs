//! Grid network: `columns x rows` routers with 16 hosts each, linked to
//! their north, east, south and west neighbors.
//!
//! Each router is registered immediately followed by its hosts, row by row.

use super::host_for;
use crate::config::NocConfig;
use crate::error::NocResult;
use crate::registry::NodeRegistry;
use crate::router::grid::HOSTS_PER_ROUTER;
use crate::router::{Direction, GridCoord, GridGeometry, Router};
use crate::types::{Address, NodeId, XyPos};

const NODE_SIZE: i64 = 10;
const NODE_PITCH: i64 = 25;
const ROUTER_PITCH: i64 = 450;

/// Builds the network described by `config` into `registry`.
pub fn build(config: &NocConfig, registry: &mut NodeRegistry) -> NocResult<()> {
    let geometry = GridGeometry::new(config.topology.grid_columns, config.topology.grid_rows);
    tracing::info!(
        columns = geometry.columns,
        rows = geometry.rows,
        hosts = geometry.host_capacity(),
        "creating grid network"
    );

    let mut routers: Vec<NodeId> = Vec::with_capacity(geometry.router_count() as usize);
    for y in 0..geometry.rows {
        for x in 0..geometry.columns {
            let coord = GridCoord { x, y };
            let xbase = i64::from(x) * ROUTER_PITCH + NODE_SIZE + 7 * NODE_PITCH;
            let ypos = i64::from(y) * ROUTER_PITCH + NODE_SIZE;
            let router = registry.register_router(Router::grid(geometry, coord), XyPos::clamped(xbase, ypos));
            routers.push(router);

            // Hosts half a router pitch below
            let host_y = ypos + ROUTER_PITCH / 2;
            let base = geometry.base_address(coord);
            for i in 0..HOSTS_PER_ROUTER {
                let xpos = xbase + i64::from(i) * NODE_PITCH - 7 * NODE_PITCH;
                let host = host_for(config, (base + i) as Address);
                let id = registry.register_host(host, XyPos::clamped(xpos, host_y));
                registry.connect(router, i as usize, id, None)?;
            }
        }
    }

    let index = |c: GridCoord| (c.y * geometry.columns + c.x) as usize;
    for y in 0..geometry.rows {
        for x in 0..geometry.columns {
            let coord = GridCoord { x, y };
            for direction in [Direction::East, Direction::South] {
                let Some(other) = geometry.neighbor(coord, direction) else {
                    continue;
                };
                let (a, b) = (routers[index(coord)], routers[index(other)]);
                registry.router_mut(a)?.attach(direction.port(), b);
                registry.router_mut(b)?.attach(direction.opposite().port(), a);
            }
        }
    }

    Ok(())
}
