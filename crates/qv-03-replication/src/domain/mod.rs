//! # Domain Layer
//!
//! - `envelope` - Control messages exchanged between nodes
//! - `registry` - Live peer connections
//! - `pending` - Outstanding retrievals awaiting peer answers
//! - `config` - Server configuration
//! - `report` - Replication outcome
//! - `errors` - Replication errors

mod config;
mod envelope;
mod errors;
mod pending;
mod registry;
mod report;

pub use config::{ServerConfig, DEFAULT_IO_TIMEOUT, DEFAULT_RETRIEVAL_TIMEOUT};
pub(crate) use envelope::check_key;
pub use envelope::{Envelope, MAX_ENVELOPE_SIZE, MAX_KEY_LEN};
pub use errors::ReplicationError;
pub use pending::{PendingRetrievals, RetrievalTicket};
pub use registry::PeerRegistry;
pub use report::ReplicationReport;
