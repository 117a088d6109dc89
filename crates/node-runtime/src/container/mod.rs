//! # Node Container
//!
//! Holds the wired components of a node with their shared ownership.
//!
//! ## Wiring Order
//!
//! 1. `PeerRegistry` (also the transport's `PeerHandler`)
//! 2. `TcpTransport` reporting connections to the registry
//! 3. `FileServer` over the transport, the registry and a `DiskBlobStore`

pub mod config;

pub use config::{ConfigError, NodeConfig};

use std::sync::Arc;

use qv_01_peer_transport::{PeerHandler, TcpTransport, Transport};
use qv_03_replication::{FileServer, PeerRegistry};

/// Wired node components.
pub struct NodeContainer {
    pub config: NodeConfig,
    pub registry: Arc<PeerRegistry>,
    pub transport: Arc<TcpTransport>,
    pub server: Arc<FileServer>,
}

impl NodeContainer {
    /// Validate `config` and wire the components. Nothing is bound or
    /// dialed until the server is started.
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = Arc::new(PeerRegistry::new());
        let handler: Arc<dyn PeerHandler> = registry.clone();
        let transport = Arc::new(TcpTransport::new(config.transport_config(), handler));
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let server = Arc::new(FileServer::new(
            config.server_config(),
            dyn_transport,
            Arc::clone(&registry),
        ));

        Ok(Self {
            config,
            registry,
            transport,
            server,
        })
    }
}
