//! Quadtree network: a root router over the whole host range, four children
//! per router, hosts at the leaves.
//!
//! Routers are registered level by level from the root, hosts last. Layout
//! puts the root at the top centre and spreads each level over the width of
//! the host row below it.

use super::host_for;
use crate::config::NocConfig;
use crate::error::NocResult;
use crate::registry::NodeRegistry;
use crate::router::quadtree::{CHILD_COUNT, PARENT_PORT};
use crate::router::Router;
use crate::types::{Address, NodeId, XyPos};

/// Column pitch of the host row, also the row pitch.
const PITCH: i64 = 30;
const NODE_SIZE: i64 = 10;

struct Level {
    router: NodeId,
    base: u32,
    size: u32,
    position: XyPos,
}

/// Builds the network described by `config` into `registry`.
pub fn build(config: &NocConfig, registry: &mut NodeRegistry) -> NocResult<()> {
    let host_count = config.topology.host_count;
    let left = NODE_SIZE / 2;
    let right = left + (i64::from(host_count) - 1) * PITCH;
    let mut top = NODE_SIZE / 2;

    let root_position = XyPos::clamped((left + right) / 2, top);
    let root = registry.register_router(Router::quadtree(0, host_count, true)?, root_position);
    tracing::info!(hosts = host_count, "creating quadtree network");

    let mut level = vec![Level {
        router: root,
        base: 0,
        size: host_count,
        position: root_position,
    }];

    while !level.is_empty() {
        top += PITCH;
        let mut next = Vec::new();

        for parent in level {
            let size = parent.size / CHILD_COUNT as u32;
            let row_pitch = PITCH * i64::from(size);

            for i in 0..CHILD_COUNT {
                let base = parent.base + i as u32 * size;
                let x = i64::from(parent.position.x) + (i as i64 - 1) * row_pitch - row_pitch / 2;
                let position = XyPos::clamped(x, top);

                if size == 1 {
                    let host = registry.register_host(host_for(config, base as Address), position);
                    registry.connect(parent.router, i, host, None)?;
                } else {
                    let router = Router::quadtree(base as Address, size, false)?;
                    let child = registry.register_router(router, position);
                    registry.connect(parent.router, i, child, Some(PARENT_PORT))?;
                    next.push(Level {
                        router: child,
                        base,
                        size,
                        position,
                    });
                }
            }
        }
        level = next;
    }

    tracing::debug!(
        routers = registry.router_count(),
        hosts = registry.host_count(),
        "quadtree network complete"
    );
    Ok(())
}
