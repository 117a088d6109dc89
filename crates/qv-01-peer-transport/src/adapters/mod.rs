//! # Adapters Layer
//!
//! - `peer` - Connection handle, atomic outbound units, bounded inbound streams
//! - `connection` - Per-connection read loop
//! - `idle` - Progress deadline for reads and writes
//! - `tcp` - TCP listener and dialer

mod connection;
mod idle;
mod peer;
mod tcp;


use std::sync::Arc;

pub use connection::spawn_read_loop;
pub use peer::{BoxedReader, BoxedWriter, InboundStream, OutboundUnit, Peer};
pub use tcp::{TcpTransport, TcpTransportConfig};

use crate::domain::TransportError;
use crate::ports::PeerHandler;

/// Handler that accepts every peer and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpPeerHandler;

impl PeerHandler for NoOpPeerHandler {
    fn on_peer_connected(&self, _peer: Arc<Peer>) -> Result<(), TransportError> {
        Ok(())
    }

    fn on_peer_disconnected(&self, _remote_addr: &str) {}
}
