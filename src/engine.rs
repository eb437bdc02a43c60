//! Tick-driven simulation engine.
//!
//! Each step gives every node one `timestep` in schedule order, then advances
//! the clock. Nodes interact synchronously within a step, so the schedule
//! decides which packets a node sees as already forwarded this tick; it is
//! an explicit engine parameter ([`ExecutionOrder`]).

use crate::config::{ExecutionOrder, NocConfig};
use crate::context::SimulationContext;
use crate::error::NocResult;
use crate::host::Host;
use crate::node::Edge;
use crate::registry::NodeRegistry;
use crate::topology::build_network;
use crate::types::{Address, NodeId, Tick};

/// Statistics collected by the simulation engine.
#[derive(Clone, Debug, Default)]
pub struct EngineStats {
    /// Total number of ticks executed
    pub steps_executed: u64,
    /// Total number of node timesteps
    pub node_invocations: u64,
}

/// The simulation engine.
///
/// # Example
///
/// ```
/// use nocsim::{NocConfigBuilder, SimulationEngine};
///
/// let config = NocConfigBuilder::new().quadtree(16).without_traffic_hosts().build().unwrap();
/// let mut engine = SimulationEngine::from_config(&config).unwrap();
/// engine.run(100).unwrap();
/// assert_eq!(engine.current_tick(), 100);
/// ```
#[derive(Debug)]
pub struct SimulationEngine {
    context: SimulationContext,
    order: ExecutionOrder,
    schedule: Vec<NodeId>,
    stats: EngineStats,
}

impl SimulationEngine {
    /// Creates an engine over `registry`, stepping nodes in registration order.
    pub fn new(registry: NodeRegistry) -> Self {
        let schedule = (0..registry.len()).collect();
        Self {
            context: SimulationContext::new(registry),
            order: ExecutionOrder::Registration,
            schedule,
            stats: EngineStats::default(),
        }
    }

    /// Builds the network of `config` and an engine over it.
    pub fn from_config(config: &NocConfig) -> NocResult<Self> {
        let registry = build_network(config)?;
        Ok(Self::new(registry).with_execution_order(config.simulation.execution_order))
    }

    /// Sets the order nodes are stepped in within a tick.
    pub fn with_execution_order(mut self, order: ExecutionOrder) -> Self {
        self.order = order;
        let len = self.context.registry().len();
        self.schedule = match order {
            ExecutionOrder::Registration => (0..len).collect(),
            ExecutionOrder::Reverse => (0..len).rev().collect(),
        };
        self
    }

    pub fn execution_order(&self) -> ExecutionOrder {
        self.order
    }

    /// Node ids in the order they are stepped.
    pub fn schedule(&self) -> &[NodeId] {
        &self.schedule
    }

    /// Returns the current tick.
    pub fn current_tick(&self) -> Tick {
        self.context.now()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.context
    }

    pub fn registry(&self) -> &NodeRegistry {
        self.context.registry()
    }

    /// The host owning `address`.
    pub fn host(&self, address: Address) -> Option<&Host> {
        let id = self.registry().find_host(address)?;
        self.registry().host(id).ok()
    }

    /// Executes a single tick.
    pub fn step(&mut self) -> NocResult<()> {
        for i in 0..self.schedule.len() {
            self.context.timestep(self.schedule[i])?;
        }
        self.stats.node_invocations += self.schedule.len() as u64;
        self.stats.steps_executed += 1;
        self.context.advance();
        Ok(())
    }

    /// Runs the simulation for `ticks` ticks.
    pub fn run(&mut self, ticks: Tick) -> NocResult<()> {
        tracing::info!(
            tick = self.current_tick(),
            ticks,
            nodes = self.schedule.len(),
            "running simulation"
        );
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(())
    }

    /// Returns the engine statistics.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Every topology edge, in registration order of the source node.
    pub fn edges(&self) -> Vec<Edge> {
        self.registry().iter().flat_map(|n| n.edges()).collect()
    }

    /// Exports statistics from the engine and all nodes.
    pub fn export_stats(&self) -> serde_json::Value {
        let registry = self.registry();
        let nodes: Vec<_> = registry.iter().map(|n| n.stats()).collect();

        serde_json::json!({
            "engine": {
                "current_tick": self.current_tick(),
                "steps_executed": self.stats.steps_executed,
                "node_invocations": self.stats.node_invocations,
                "execution_order": self.order,
                "router_count": registry.router_count(),
                "host_count": registry.host_count(),
            },
            "packets": self.context.packet_stats(),
            "nodes": nodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NocConfigBuilder;

    fn silent_quadtree(host_count: u32) -> SimulationEngine {
        let config = NocConfigBuilder::new()
            .quadtree(host_count)
            .without_traffic_hosts()
            .build()
            .unwrap();
        SimulationEngine::from_config(&config).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = silent_quadtree(16);
        assert_eq!(engine.current_tick(), 0);
        assert_eq!(engine.execution_order(), ExecutionOrder::Registration);
        assert_eq!(engine.schedule().len(), 21);
        assert_eq!(engine.schedule()[0], 0);
    }

    #[test]
    fn test_single_step() {
        let mut engine = silent_quadtree(16);
        engine.step().unwrap();

        assert_eq!(engine.current_tick(), 1);
        assert_eq!(engine.stats().steps_executed, 1);
        assert_eq!(engine.stats().node_invocations, 21);
    }

    #[test]
    fn test_run() {
        let mut engine = silent_quadtree(64);
        engine.run(100).unwrap();
        assert_eq!(engine.current_tick(), 100);
        assert_eq!(engine.stats().steps_executed, 100);
    }

    #[test]
    fn test_reverse_schedule() {
        let engine = silent_quadtree(4).with_execution_order(ExecutionOrder::Reverse);
        assert_eq!(engine.schedule(), &[4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_edges() {
        // 4 children per router, one parent edge per non-root node
        let engine = silent_quadtree(16);
        assert_eq!(engine.edges().len(), 5 * 4 + 20);
    }

    #[test]
    fn test_export_stats() {
        let mut engine = silent_quadtree(16);
        engine.run(10).unwrap();

        let stats = engine.export_stats();
        assert_eq!(stats["engine"]["current_tick"], 10);
        assert_eq!(stats["engine"]["router_count"], 5);
        assert_eq!(stats["engine"]["execution_order"], "registration");
        assert_eq!(stats["nodes"].as_array().unwrap().len(), 21);
        assert_eq!(stats["packets"]["overall"]["count"], 0);
    }
}
