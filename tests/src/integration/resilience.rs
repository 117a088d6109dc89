//! Peer loss, restarts and misconfigured nodes.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use qv_03_replication::{ReplicationApi, ReplicationError};
    use shared_crypto::SecretKey;

    use crate::fixtures::{eventually, link, mesh, TestNode};

    #[tokio::test]
    async fn test_departed_peer_is_evicted() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 2).await;

        nodes[1].shutdown().await;
        eventually("eviction", || nodes[0].registry().is_empty()).await;

        let report = nodes[0].store("solo.txt", b"nobody listening").await;
        assert_eq!(report.attempted(), 0);
        assert!(nodes[0].has_local("solo.txt").await);
    }

    #[tokio::test]
    async fn test_survivors_keep_replicating() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 3).await;

        nodes[2].shutdown().await;
        eventually("eviction", || {
            nodes[0].registry().len() == 1 && nodes[1].registry().len() == 1
        })
        .await;

        let report = nodes[0].store("after-loss", b"still here").await;
        assert_eq!(report.delivered.len(), 1);
        assert!(report.failed.is_empty());
        eventually("replica on survivor", || {
            nodes[1].read_at_rest("after-loss").as_deref() == Some(&b"still here"[..])
        })
        .await;
    }

    #[tokio::test]
    async fn test_restart_serves_persisted_blobs() {
        let key = SecretKey::generate();
        let dir = tempfile::tempdir().unwrap();

        let first = TestNode::start_at(&key, dir.path(), |_| {}).await;
        first.store("journal.log", b"day one").await;
        let first_addr = first.addr();
        first.shutdown().await;

        let second = TestNode::start_at(&key, dir.path(), |_| {}).await;
        assert_ne!(second.addr(), first_addr);
        assert!(second.has_local("journal.log").await);
        assert_eq!(second.fetch("journal.log").await.unwrap(), b"day one");
    }

    #[tokio::test]
    async fn test_node_with_foreign_key_cannot_read_content() {
        let key = SecretKey::generate();
        let member = TestNode::start(&key).await;
        let outsider = TestNode::start(&SecretKey::generate()).await;
        link(&member, &outsider).await;

        let content = b"for members only, not for outsiders";
        member.store("secret.txt", content).await;

        eventually("outsider copy", || outsider.blob_path("secret.txt").exists()).await;
        let at_rest = outsider.read_at_rest("secret.txt").unwrap();
        assert_eq!(at_rest.len(), content.len());
        assert_ne!(at_rest, content);
    }

    #[tokio::test]
    async fn test_unresponsive_network_times_out() {
        let key = SecretKey::generate();
        let asker = TestNode::start_with(&key, |config| {
            config.retrieval_timeout = Duration::from_millis(300);
        })
        .await;

        // A bare listener accepts the connection but never answers.
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let silent_addr = silent.local_addr().unwrap().to_string();
        let accept = tokio::spawn(async move {
            let (socket, _) = silent.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        asker.server.connect(&silent_addr).await.unwrap();
        eventually("silent peer registered", || asker.registry().len() == 1).await;

        let result = asker.fetch("anything").await;
        match result {
            Err(ReplicationError::Timeout { key, after }) => {
                assert_eq!(key, "anything");
                assert_eq!(after, Duration::from_millis(300));
            }
            other => panic!("expected a retrieval timeout, got {other:?}"),
        }
        accept.abort();
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let node = TestNode::start(&SecretKey::generate()).await;
        node.shutdown().await;
        node.shutdown().await;
        assert!(!node.server.has_local("never-stored").await);
    }
}
