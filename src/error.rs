//! Error types for the simulator.
//!
//! Only fatal conditions are errors. Recoverable network conditions (bus
//! fights, packets dropped on dangling ports, unexpected host messages) are
//! logged and counted by the node that observed them and never surface here.

use thiserror::Error;

use crate::config::ConfigError;
use crate::types::{Address, NodeId};

/// Fatal simulation errors.
#[derive(Error, Debug)]
pub enum NocError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("root router {router} cannot route address {address:#06x}: outside the simulated address space")]
    UnroutableFromRoot { router: NodeId, address: Address },

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("node {0} is not a router")]
    NotARouter(NodeId),

    #[error("node {0} is not a host")]
    NotAHost(NodeId),
}

/// Result type for simulation operations.
pub type NocResult<T> = Result<T, NocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NocError::UnroutableFromRoot {
            router: 0,
            address: 0x1234,
        };
        assert!(err.to_string().contains("0x1234"));

        let err: NocError = ConfigError::UnknownTopology("ring".to_string()).into();
        assert!(err.to_string().contains("ring"));
    }
}
