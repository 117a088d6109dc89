//! # Peer Transport Subsystem (qv-01)
//!
//! Raw bidirectional peer connections for Quantum-Vault, multiplexing small
//! control messages and bulk content streams over a single TCP connection.
//!
//! ## Wire Format
//!
//! ```text
//! control message:  [0x01][body_len: u32 LE][body ...]
//! content stream:   [0x02][length:   i64 LE][length raw bytes ...]
//! ```
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** Frame tags, header encoding, violation taxonomy
//! - **Ports Layer:** `Transport` (driving) and `PeerHandler` (driven)
//! - **Adapters Layer:** `Peer` connection handle and `TcpTransport`
//!
//! ## Stream Handover
//!
//! Each connection has exactly one read loop. It owns the tag byte: control
//! messages are delivered as [`Rpc`]s on the consume channel, while a stream
//! header pauses the loop and hands the connection to the next
//! [`Peer::open_stream`] caller. The loop resumes once the returned
//! [`InboundStream`] has been finished or dropped.
//!
//! ## Timeouts
//!
//! Deadlines bound stalls, not transfers. A write, or a read inside a unit,
//! fails after `io_timeout` without progress. A handed-out stream drops the
//! connection only if a whole `stream_timeout` window passes in which it was
//! neither opened nor read from.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qv_01_peer_transport::{TcpTransport, TcpTransportConfig, Transport};
//!
//! let transport = TcpTransport::new(TcpTransportConfig::new("127.0.0.1:3000"), handler);
//! let mut inbound = transport.consume()?;
//! transport.listen_and_accept().await?;
//! transport.dial("127.0.0.1:4000").await?;
//!
//! while let Some(rpc) = inbound.recv().await {
//!     // decode rpc.payload
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{
    spawn_read_loop, InboundStream, NoOpPeerHandler, OutboundUnit, Peer, TcpTransport,
    TcpTransportConfig,
};
pub use domain::{
    FrameLimits, FrameTag, Rpc, TransportError, Violation, DEFAULT_IO_TIMEOUT,
    DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_STREAM_TIMEOUT, MESSAGE_HEADER_LEN, STREAM_HEADER_LEN,
    TAG_MESSAGE, TAG_STREAM,
};
pub use ports::{PeerHandler, Transport};
