//! # nocsim
//!
//! A tick-driven simulator for network-on-chip interconnects. Routers and
//! hosts are nodes of one arena; every tick each node gets a timestep, and
//! packets move one router per tick budget of [`LINK_TICKS`](types::LINK_TICKS).
//!
//! ## Topologies
//!
//! - **Grid**: a `columns x rows` mesh with 16 hosts per router and X-first
//!   dimension-ordered routing.
//! - **Quadtree**: a hierarchy of 4-way routers over a power-of-four host
//!   range; packets climb to the smallest common subnet and descend.
//!
//! ## Host models
//!
//! RAM, CPU and NIC hosts exchange RPC and DMA packets; every other host is
//! generic and may send configured probe packets.
//!
//! ## Features
//!
//! - `parallel` - Run parametric sweeps on the rayon pool
//!
//! ## Quick Start
//!
//! ```rust
//! use nocsim::{NocConfigBuilder, SimulationEngine, SimulationStats};
//!
//! let config = NocConfigBuilder::new().quadtree(256).ticks(500).build().unwrap();
//! let mut engine = SimulationEngine::from_config(&config).unwrap();
//! engine.run(config.simulation.ticks).unwrap();
//!
//! let stats = SimulationStats::collect(&engine);
//! println!("delivered: {}", stats.packets.overall.count);
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use nocsim::NocConfig;
//!
//! let config = NocConfig::from_file("noc.yaml")?;
//! let stats = nocsim::sweep::run_config(&config)?;
//! ```

pub mod types;
pub mod error;
pub mod packet;
pub mod ports;
pub mod router;
pub mod host;
pub mod node;
pub mod registry;
pub mod context;
pub mod engine;
pub mod topology;
pub mod config;
pub mod stats;
pub mod sweep;

// Re-export commonly used types
pub use types::{Address, NodeId, PortIndex, Tick, XyPos};
pub use error::{NocError, NocResult};
pub use packet::{Packet, PacketKind, PacketStats};
pub use router::{Direction, Router};
pub use host::{Host, HostModel, HostModelKind};
pub use node::{Edge, EdgeKind, Node, NodeKind};
pub use registry::NodeRegistry;
pub use context::{ForwardOutcome, SimulationContext};
pub use engine::{EngineStats, SimulationEngine};
pub use topology::{build_network, TopologyKind};
pub use config::{ConfigError, ExecutionOrder, NocConfig, NocConfigBuilder};
pub use stats::{SimulationStats, Timer};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging. `RUST_LOG`
/// takes precedence over `level`.
///
/// # Example
///
/// ```rust,ignore
/// nocsim::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
