//! # File Server
//!
//! Application service tying the transport, the peer registry and the local
//! blob store together.
//!
//! ## Tasks
//!
//! ```text
//! caller ──store/get──→ FileServer ──snapshot──→ PeerRegistry
//!                           │                         ↑ on_peer_connected /
//!                           ↓ send                    │ on_peer_disconnected
//!                      Peer (write lock)         TcpTransport
//!                                                     │ Rpc
//!                       dispatch loop (run) ←─────────┘
//!                           │
//!                           ↓ write_decrypted
//!                       BlobStore
//! ```
//!
//! The dispatch loop is the only consumer of inbound control messages. An
//! announced stream is consumed in its own task so transfers from different
//! peers overlap; the announcing connection stays paused until its stream is
//! consumed, which keeps per-connection ordering intact.

mod dispatch;
mod retrieve;
mod store;
mod tee;


use std::sync::Arc;

use async_trait::async_trait;
use qv_01_peer_transport::{Peer, Transport};
use qv_02_blob_store::{BlobReader, BlobStore, DiskBlobStore};
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::{
    PeerRegistry, PendingRetrievals, ReplicationError, ReplicationReport, ServerConfig,
};
use crate::ports::ReplicationApi;

/// Replicating blob server.
///
/// Construct the [`PeerRegistry`] first, hand it to the transport as its
/// [`PeerHandler`](qv_01_peer_transport::PeerHandler), then build the server
/// over both.
pub struct FileServer {
    config: ServerConfig,
    transport: Arc<dyn Transport>,
    registry: Arc<PeerRegistry>,
    store: Arc<dyn BlobStore>,
    pending: PendingRetrievals,
    shutdown: watch::Sender<bool>,
}

impl FileServer {
    /// Server storing blobs on disk under `config.storage_root`.
    pub fn new(
        config: ServerConfig,
        transport: Arc<dyn Transport>,
        registry: Arc<PeerRegistry>,
    ) -> Self {
        let store = Arc::new(DiskBlobStore::new(&config.storage_root, config.path_layout));
        Self::with_store(config, transport, registry, store)
    }

    /// Server over an arbitrary blob store.
    pub fn with_store(
        config: ServerConfig,
        transport: Arc<dyn Transport>,
        registry: Arc<PeerRegistry>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            transport,
            registry,
            store,
            pending: PendingRetrievals::new(),
            shutdown,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Address the transport listens on.
    pub fn local_addr(&self) -> String {
        self.transport.local_addr()
    }

    /// Listen, dial the bootstrap nodes, and spawn the dispatch loop.
    ///
    /// Returns once the listener is bound; the returned handle resolves when
    /// the dispatch loop ends after [`stop`](Self::stop).
    pub async fn start(
        self: &Arc<Self>,
    ) -> Result<JoinHandle<Result<(), ReplicationError>>, ReplicationError> {
        self.transport.listen_and_accept().await?;
        info!(
            "[qv-03] 🚀 File server listening on {}",
            self.transport.local_addr()
        );

        self.bootstrap_network();

        let server = Arc::clone(self);
        Ok(tokio::spawn(async move { server.run().await }))
    }

    /// Signal the dispatch loop to stop.
    pub fn stop(&self) {
        if !self.shutdown.send_replace(true) {
            info!(
                "[qv-03] 🛑 File server on {} stopping",
                self.transport.local_addr()
            );
        }
    }

    /// Dial every non-empty bootstrap address in its own task.
    ///
    /// Failures are logged and not retried; startup never waits on them.
    pub fn bootstrap_network(&self) -> Vec<JoinHandle<()>> {
        self.config
            .bootstrap_nodes
            .iter()
            .map(|addr| addr.trim())
            .filter(|addr| !addr.is_empty())
            .map(|addr| {
                let transport = Arc::clone(&self.transport);
                let addr = addr.to_string();
                tokio::spawn(async move {
                    info!("[qv-03] Dialing bootstrap node {}", addr);
                    if let Err(e) = transport.dial(&addr).await {
                        error!(peer = %addr, error = %e, "[qv-03] Bootstrap dial failed");
                    }
                })
            })
            .collect()
    }

    /// Dial one peer and wait for the connection to be registered.
    pub async fn connect(&self, addr: &str) -> Result<(), ReplicationError> {
        self.transport.dial(addr).await?;
        Ok(())
    }

    /// Run the dispatch loop until [`stop`](Self::stop) is called or the
    /// transport's inbound channel closes, then close the transport.
    pub async fn run(self: &Arc<Self>) -> Result<(), ReplicationError> {
        let mut inbound = self.transport.consume()?;
        let mut shutdown = self.shutdown.subscribe();
        info!(
            "[qv-03] Dispatch loop running on {}",
            self.transport.local_addr()
        );

        loop {
            let rpc = tokio::select! {
                rpc = inbound.recv() => rpc,
                _ = stop_requested(&mut shutdown) => break,
            };
            match rpc {
                Some(rpc) => self.handle_rpc(rpc),
                None => {
                    warn!("[qv-03] Inbound channel closed");
                    break;
                }
            }
        }

        self.transport.close().await?;
        info!("[qv-03] Dispatch loop on {} stopped", self.transport.local_addr());
        Ok(())
    }

    /// Evict `peer`, write off replies it owed, and close its connection.
    async fn drop_peer(&self, peer: &Peer) {
        self.registry.evict(peer.remote_addr());
        self.pending.forget_peer(peer.remote_addr());
        peer.close().await;
    }
}

/// Resolves once a stop is requested or the server is gone.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[async_trait]
impl ReplicationApi for FileServer {
    async fn store(
        &self,
        key: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<ReplicationReport, ReplicationError> {
        self.replicate(key, content).await
    }

    async fn get(&self, key: &str) -> Result<(u64, BlobReader), ReplicationError> {
        self.retrieve(key).await
    }

    async fn has_local(&self, key: &str) -> bool {
        self.store.has(key).await
    }

    async fn delete_local(&self, key: &str) -> Result<(), ReplicationError> {
        self.store.delete(key).await?;
        info!(key, "[qv-03] 🗑️ Deleted local copy");
        Ok(())
    }
}
