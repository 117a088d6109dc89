//! Node lifecycle.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use qv_03_replication::{FileServer, ReplicationError};
use qv_telemetry::{log_event, log_peer_event};
use tokio::task::JoinHandle;

use crate::container::{ConfigError, NodeConfig, NodeContainer};

const SUBSYSTEM: &str = "node-runtime";

/// How long shutdown waits for the dispatch loop to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A running (or ready to run) node.
pub struct NodeRuntime {
    container: NodeContainer,
    dispatch: Mutex<Option<JoinHandle<Result<(), ReplicationError>>>>,
}

impl NodeRuntime {
    /// Wire a node from `config`.
    pub fn new(mut config: NodeConfig) -> Result<Self, ConfigError> {
        if config.ensure_enc_key() {
            log_event!(
                warn,
                SUBSYSTEM,
                "[qv-00] ⚠️ No network key configured, generated one. Peers will not be able to decrypt this node's content."
            );
        }

        Ok(Self {
            container: NodeContainer::new(config)?,
            dispatch: Mutex::new(None),
        })
    }

    /// Start listening, dial the bootstrap nodes and spawn the dispatch loop.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Bind the listener
    /// 2. Dial bootstrap nodes in the background
    /// 3. Spawn the dispatch loop
    pub async fn start(&self) -> Result<(), ReplicationError> {
        let config = &self.container.config;
        log_event!(
            info,
            SUBSYSTEM,
            "[qv-00] Starting Quantum-Vault node",
            storage_root = %config.storage_root.display(),
            layout = %config.path_layout,
            bootstrap_nodes = config.bootstrap_nodes.len()
        );

        let handle = self.container.server.start().await?;
        *self.dispatch.lock() = Some(handle);

        for addr in &config.bootstrap_nodes {
            log_peer_event!(debug, SUBSYSTEM, "[qv-00] Bootstrap node queued", addr);
        }
        log_event!(
            info,
            SUBSYSTEM,
            "[qv-00] ✅ Node running",
            listen_addr = %self.container.server.local_addr()
        );
        Ok(())
    }

    /// Shutdown the node gracefully.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Signal the dispatch loop to stop
    /// 2. Wait (bounded) for it to close the transport
    pub async fn shutdown(&self) {
        log_event!(info, SUBSYSTEM, "[qv-00] Initiating graceful shutdown...");
        self.container.server.stop();

        let handle = self.dispatch.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    log_event!(error, SUBSYSTEM, "[qv-00] Dispatch loop failed", error = %e)
                }
                Ok(Err(e)) => {
                    log_event!(error, SUBSYSTEM, "[qv-00] Dispatch task panicked", error = %e)
                }
                Err(_) => log_event!(
                    warn,
                    SUBSYSTEM,
                    "[qv-00] Dispatch loop did not stop in time",
                    grace_ms = SHUTDOWN_GRACE.as_millis() as u64
                ),
            }
        }

        log_event!(info, SUBSYSTEM, "[qv-00] Shutdown complete");
    }

    /// The replicating file server.
    pub fn server(&self) -> Arc<FileServer> {
        Arc::clone(&self.container.server)
    }

    pub fn container(&self) -> &NodeContainer {
        &self.container
    }
}
