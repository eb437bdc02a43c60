//! Node arena.
//!
//! The registry owns every node of a run. Nodes are addressed by the
//! [`NodeId`] returned at registration, which is also their position in the
//! registration order the engine schedules by.

use std::collections::HashMap;

use crate::error::{NocError, NocResult};
use crate::host::Host;
use crate::node::{Node, NodeKind};
use crate::router::Router;
use crate::types::{Address, NodeId, XyPos};

#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    hosts_by_address: HashMap<Address, NodeId>,
    router_count: usize,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a router and returns its id.
    pub fn register_router(&mut self, router: Router, position: XyPos) -> NodeId {
        self.router_count += 1;
        self.push(position, NodeKind::Router(router))
    }

    /// Registers a host and returns its id.
    ///
    /// A second host with the same address replaces the first one in
    /// address lookups.
    pub fn register_host(&mut self, host: Host, position: XyPos) -> NodeId {
        let address = host.address();
        let id = self.push(position, NodeKind::Host(host));
        if let Some(previous) = self.hosts_by_address.insert(address, id) {
            tracing::warn!(address, previous, id, "duplicate host address");
        }
        id
    }

    fn push(&mut self, position: XyPos, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, position, kind));
        id
    }

    pub fn get(&self, id: NodeId) -> NocResult<&Node> {
        self.nodes.get(id).ok_or(NocError::NodeNotFound(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> NocResult<&mut Node> {
        self.nodes.get_mut(id).ok_or(NocError::NodeNotFound(id))
    }

    pub fn router(&self, id: NodeId) -> NocResult<&Router> {
        self.get(id)?.as_router().ok_or(NocError::NotARouter(id))
    }

    pub fn router_mut(&mut self, id: NodeId) -> NocResult<&mut Router> {
        self.get_mut(id)?.as_router_mut().ok_or(NocError::NotARouter(id))
    }

    pub fn host(&self, id: NodeId) -> NocResult<&Host> {
        self.get(id)?.as_host().ok_or(NocError::NotAHost(id))
    }

    pub fn host_mut(&mut self, id: NodeId) -> NocResult<&mut Host> {
        self.get_mut(id)?.as_host_mut().ok_or(NocError::NotAHost(id))
    }

    /// Id of the host owning `address`.
    pub fn find_host(&self, address: Address) -> Option<NodeId> {
        self.hosts_by_address.get(&address).copied()
    }

    /// Links `child` under `parent` on `port`.
    ///
    /// The child must be a host or a router; a host records `parent` as its
    /// parent, a router attaches `parent` on `child_parent_port`.
    pub fn connect(
        &mut self,
        parent: NodeId,
        port: usize,
        child: NodeId,
        child_parent_port: Option<usize>,
    ) -> NocResult<()> {
        self.router_mut(parent)?.attach(port, child);
        match self.get_mut(child)?.kind_mut() {
            NodeKind::Host(host) => host.set_parent(parent),
            NodeKind::Router(router) => {
                if let Some(up) = child_parent_port {
                    router.attach(up, parent);
                }
            }
        }
        Ok(())
    }

    /// Nodes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn router_count(&self) -> usize {
        self.router_count
    }

    pub fn host_count(&self) -> usize {
        self.nodes.len() - self.router_count
    }
}
