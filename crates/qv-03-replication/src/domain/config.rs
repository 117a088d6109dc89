//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use qv_02_blob_store::PathLayout;
use shared_crypto::SecretKey;

/// Default wait for an announced stream to follow its control message.
pub const DEFAULT_IO_TIMEOUT: Duration = qv_01_peer_transport::DEFAULT_IO_TIMEOUT;

/// Default time a retrieval waits for peers to answer.
pub const DEFAULT_RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable configuration of a [`FileServer`](crate::FileServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Network-wide secret used for every stream on the wire.
    pub enc_key: SecretKey,
    /// Directory blobs are stored under.
    pub storage_root: PathBuf,
    /// Key to path mapping below `storage_root`.
    pub path_layout: PathLayout,
    /// Seed peers dialed at startup.
    pub bootstrap_nodes: Vec<String>,
    /// How long an announced stream may take to follow its control
    /// message. Stalls inside a transfer are bounded by the transport's
    /// own I/O timeout, so this should match it.
    pub io_timeout: Duration,
    /// How long `get` waits for peers to answer a request.
    pub retrieval_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enc_key: SecretKey::generate(),
            storage_root: PathBuf::from("./qv-data"),
            path_layout: PathLayout::ContentAddressed,
            bootstrap_nodes: Vec::new(),
            io_timeout: DEFAULT_IO_TIMEOUT,
            retrieval_timeout: DEFAULT_RETRIEVAL_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Configuration storing under `storage_root` with the given key.
    pub fn new(enc_key: SecretKey, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            enc_key,
            storage_root: storage_root.into(),
            ..Self::default()
        }
    }

    pub fn with_bootstrap_nodes(mut self, nodes: Vec<String>) -> Self {
        self.bootstrap_nodes = nodes;
        self
    }

    pub fn with_timeouts(mut self, io_timeout: Duration, retrieval_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self.retrieval_timeout = retrieval_timeout;
        self
    }
}
