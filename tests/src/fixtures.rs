//! Node fixtures shared by the integration tests and benchmarks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use node_runtime::{NodeConfig, NodeRuntime};
use qv_02_blob_store::PathLayout;
use qv_03_replication::{
    FileServer, PeerRegistry, ReplicationApi, ReplicationError, ReplicationReport,
};
use shared_crypto::SecretKey;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

/// Upper bound for any "eventually" condition in the suite.
pub const WAIT: Duration = Duration::from_secs(5);

/// A running node whose storage lives in a temporary directory.
pub struct TestNode {
    pub runtime: NodeRuntime,
    pub server: Arc<FileServer>,
    storage: StorageDir,
}

enum StorageDir {
    Owned(TempDir),
    Borrowed(PathBuf),
}

impl TestNode {
    /// Start a node on an ephemeral loopback port.
    pub async fn start(key: &SecretKey) -> Self {
        Self::start_with(key, |_| {}).await
    }

    /// Start a node, letting `tweak` adjust its configuration first.
    pub async fn start_with(key: &SecretKey, tweak: impl FnOnce(&mut NodeConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();
        Self::launch(key, root, StorageDir::Owned(dir), tweak).await
    }

    /// Start a node over an existing storage directory the caller owns.
    pub async fn start_at(
        key: &SecretKey,
        root: &Path,
        tweak: impl FnOnce(&mut NodeConfig),
    ) -> Self {
        let root = root.to_path_buf();
        Self::launch(key, root.clone(), StorageDir::Borrowed(root), tweak).await
    }

    async fn launch(
        key: &SecretKey,
        root: PathBuf,
        storage: StorageDir,
        tweak: impl FnOnce(&mut NodeConfig),
    ) -> Self {
        let mut config = NodeConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            storage_root: root,
            enc_key: Some(key.clone()),
            io_timeout: Duration::from_secs(2),
            retrieval_timeout: Duration::from_secs(2),
            ..NodeConfig::default()
        };
        tweak(&mut config);

        let runtime = NodeRuntime::new(config).expect("valid config");
        runtime.start().await.expect("node starts");
        let server = runtime.server();

        Self {
            runtime,
            server,
            storage,
        }
    }

    pub fn addr(&self) -> String {
        self.server.local_addr()
    }

    pub fn registry(&self) -> &Arc<PeerRegistry> {
        self.server.registry()
    }

    pub fn storage_root(&self) -> &Path {
        match &self.storage {
            StorageDir::Owned(dir) => dir.path(),
            StorageDir::Borrowed(path) => path,
        }
    }

    pub fn layout(&self) -> PathLayout {
        self.server.config().path_layout
    }

    /// Where `key` is stored on disk.
    pub fn blob_path(&self, key: &str) -> PathBuf {
        self.storage_root()
            .join(self.layout().path_for(key).relative_path())
    }

    /// Raw bytes stored on disk for `key`, if present.
    pub fn read_at_rest(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.blob_path(key)).ok()
    }

    /// Store `content` under `key` through this node.
    pub async fn store(&self, key: &str, content: &[u8]) -> ReplicationReport {
        let mut reader = content;
        self.server.store(key, &mut reader).await.expect("store")
    }

    /// Fetch `key` through this node and read it to the end.
    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>, ReplicationError> {
        let (size, mut reader) = self.server.get(key).await?;
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.expect("read blob");
        assert_eq!(size, content.len() as u64, "announced size matches content");
        Ok(content)
    }

    pub async fn has_local(&self, key: &str) -> bool {
        self.server.has_local(key).await
    }

    pub async fn shutdown(&self) {
        self.runtime.shutdown().await;
    }
}

/// Poll `condition` until it holds, panicking after [`WAIT`].
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

/// `a` dials `b`; returns once both sides have registered the connection.
pub async fn link(a: &TestNode, b: &TestNode) {
    let (a_before, b_before) = (a.registry().len(), b.registry().len());
    a.server.connect(&b.addr()).await.expect("dial");
    eventually("link", || {
        a.registry().len() > a_before && b.registry().len() > b_before
    })
    .await;
}

/// Start `n` nodes sharing `key`, fully meshed.
pub async fn mesh(key: &SecretKey, n: usize) -> Vec<TestNode> {
    let mut nodes = Vec::with_capacity(n);
    for _ in 0..n {
        nodes.push(TestNode::start(key).await);
    }
    for i in 0..n {
        for j in (i + 1)..n {
            link(&nodes[i], &nodes[j]).await;
        }
    }
    nodes
}

/// Random content of `len` bytes.
pub fn random_content(len: usize) -> Vec<u8> {
    use rand::RngCore;
    let mut content = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut content);
    content
}
