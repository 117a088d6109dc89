//! Peer registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use qv_01_peer_transport::{Peer, PeerHandler, TransportError};
use tracing::{debug, info};

/// Live peer connections keyed by remote address.
///
/// The map is only mutated through [`register`](Self::register) and
/// [`evict`](Self::evict) (or the [`PeerHandler`] callbacks that call them)
/// and only iterated through [`snapshot`](Self::snapshot), so a broadcast
/// never holds the lock while it performs I/O.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, Arc<Peer>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `peer`, replacing any earlier entry for the same address.
    /// Returns the replaced entry.
    pub fn register(&self, peer: Arc<Peer>) -> Option<Arc<Peer>> {
        let addr = peer.remote_addr().to_string();
        self.peers.write().insert(addr, peer)
    }

    /// Remove the entry for `remote_addr`.
    pub fn evict(&self, remote_addr: &str) -> Option<Arc<Peer>> {
        self.peers.write().remove(remote_addr)
    }

    /// Peer registered under `remote_addr`.
    pub fn get(&self, remote_addr: &str) -> Option<Arc<Peer>> {
        self.peers.read().get(remote_addr).cloned()
    }

    /// Stable copy of the current membership.
    pub fn snapshot(&self) -> Vec<Arc<Peer>> {
        self.peers.read().values().cloned().collect()
    }

    /// Registered addresses, sorted.
    pub fn addresses(&self) -> Vec<String> {
        let mut addrs: Vec<_> = self.peers.read().keys().cloned().collect();
        addrs.sort();
        addrs
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

impl PeerHandler for PeerRegistry {
    fn on_peer_connected(&self, peer: Arc<Peer>) -> Result<(), TransportError> {
        let direction = if peer.is_outbound() { "outbound" } else { "inbound" };
        info!(
            peer = %peer.remote_addr(),
            direction,
            "[qv-03] 🤝 Peer connected"
        );
        if let Some(previous) = self.register(peer) {
            debug!("[qv-03] Replaced stale entry for {}", previous.remote_addr());
        }
        Ok(())
    }

    fn on_peer_disconnected(&self, remote_addr: &str) {
        // A newer connection from the same address may have replaced the
        // entry; only evict if the registered peer is the one that closed.
        let mut peers = self.peers.write();
        if peers.get(remote_addr).is_some_and(|p| p.is_closed()) {
            peers.remove(remote_addr);
            info!(peer = %remote_addr, "[qv-03] 👋 Peer disconnected");
        }
    }
}
