//! # Ports Layer
//!
//! ## Hexagonal Architecture
//!
//! - `inbound.rs` - Driving port (the transport API used by the node)
//! - `outbound.rs` - Driven port (peer lifecycle callbacks the node implements)

pub mod inbound;
pub mod outbound;

pub use inbound::Transport;
pub use outbound::PeerHandler;
