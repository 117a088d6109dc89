//! Replication outcome.

/// Result of one [`store`](crate::ReplicationApi::store) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Stored key.
    pub key: String,
    /// Plaintext bytes stored locally.
    pub size: u64,
    /// Peers the announcement and content were written to.
    pub delivered: Vec<String>,
    /// Peers the push failed for (evicted).
    pub failed: Vec<String>,
}

impl ReplicationReport {
    /// Every peer in the snapshot received the push.
    pub fn fully_replicated(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of peers a push was attempted to.
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}
