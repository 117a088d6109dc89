//! # Driven Port (Outbound SPI)
//!
//! Peer lifecycle callbacks the host application implements.

use std::sync::Arc;

use crate::adapters::Peer;
use crate::domain::TransportError;

/// Receives peers as connections open and close.
///
/// # Thread Safety
///
/// Called from the accept task and from dialing tasks concurrently, so
/// implementations must be `Send + Sync` and do their own locking.
pub trait PeerHandler: Send + Sync {
    /// A connection was accepted or dialed.
    ///
    /// Invoked before the connection's read loop starts, so the peer is
    /// known to the host before any of its messages are delivered.
    /// Returning an error drops the connection.
    fn on_peer_connected(&self, peer: Arc<Peer>) -> Result<(), TransportError>;

    /// The connection to `remote_addr` ended (remote close, I/O error,
    /// protocol violation, or shutdown).
    fn on_peer_disconnected(&self, remote_addr: &str);
}
