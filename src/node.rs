//! Node definitions.
//!
//! Every simulated element is a [`Node`] in the registry arena: either a
//! router or a host. Links between nodes are arena indices held in router
//! port tables and host parent fields.

use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::router::{Direction, Router};
use crate::types::{NodeId, XyPos};

/// What a node is.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Router(Router),
    Host(Host),
}

/// What a topology edge connects to, seen from its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Router to one of its children
    Child,
    /// Node to its parent router
    Parent,
    /// Grid router to a lateral neighbor
    Neighbor(Direction),
}

/// A directed topology edge, for rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// A node in the simulation.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    position: XyPos,
    kind: NodeKind,
}

impl Node {
    pub fn new(id: NodeId, position: XyPos, kind: NodeKind) -> Self {
        Self { id, position, kind }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Rendering position.
    pub fn position(&self) -> XyPos {
        self.position
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn as_router(&self) -> Option<&Router> {
        match &self.kind {
            NodeKind::Router(r) => Some(r),
            NodeKind::Host(_) => None,
        }
    }

    pub fn as_router_mut(&mut self) -> Option<&mut Router> {
        match &mut self.kind {
            NodeKind::Router(r) => Some(r),
            NodeKind::Host(_) => None,
        }
    }

    pub fn as_host(&self) -> Option<&Host> {
        match &self.kind {
            NodeKind::Host(h) => Some(h),
            NodeKind::Router(_) => None,
        }
    }

    pub fn as_host_mut(&mut self) -> Option<&mut Host> {
        match &mut self.kind {
            NodeKind::Host(h) => Some(h),
            NodeKind::Router(_) => None,
        }
    }

    pub fn is_router(&self) -> bool {
        matches!(self.kind, NodeKind::Router(_))
    }

    /// Outgoing topology edges of this node.
    pub fn edges(&self) -> Vec<Edge> {
        match &self.kind {
            NodeKind::Router(router) => router
                .ports()
                .links()
                .map(|(port, to)| Edge {
                    from: self.id,
                    to,
                    kind: router.routing().edge_kind(port),
                })
                .collect(),
            NodeKind::Host(host) => host
                .parent()
                .map(|to| Edge {
                    from: self.id,
                    to,
                    kind: EdgeKind::Parent,
                })
                .into_iter()
                .collect(),
        }
    }

    /// Counters as JSON.
    pub fn stats(&self) -> serde_json::Value {
        let (kind, stats) = match &self.kind {
            NodeKind::Router(r) => ("router", r.stats()),
            NodeKind::Host(h) => ("host", h.stats()),
        };
        serde_json::json!({
            "id": self.id,
            "kind": kind,
            "position": self.position,
            "stats": stats,
        })
    }
}
