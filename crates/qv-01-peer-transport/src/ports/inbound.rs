//! # Driving Port (Inbound API)
//!
//! The operations a node performs on its transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{Rpc, TransportError};

/// Connection management for a node.
///
/// Peers themselves are handed to the host through
/// [`PeerHandler::on_peer_connected`](super::PeerHandler::on_peer_connected);
/// control messages arrive on the channel returned by [`Transport::consume`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Address the transport listens on (the bound address once listening).
    fn local_addr(&self) -> String;

    /// Bind the listener and start accepting connections in the background.
    ///
    /// Returns once the listener is bound.
    async fn listen_and_accept(&self) -> Result<(), TransportError>;

    /// Open an outbound connection to `addr`.
    ///
    /// Returns once the peer has been accepted by the handler and its read
    /// loop is running.
    async fn dial(&self, addr: &str) -> Result<(), TransportError>;

    /// Take the channel of inbound control messages.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::AlreadyConsumed` on every call after the first.
    fn consume(&self) -> Result<mpsc::Receiver<Rpc>, TransportError>;

    /// Stop accepting and close every connection.
    async fn close(&self) -> Result<(), TransportError>;
}
