//! Retrieval: local hits, remote fetches and misses.

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use qv_03_replication::{ReplicationApi, ReplicationError};
    use shared_crypto::SecretKey;

    use crate::fixtures::{eventually, link, mesh, TestNode};

    #[tokio::test]
    async fn test_local_hit_without_peers() {
        let node = TestNode::start(&SecretKey::generate()).await;
        node.store("notes.txt", b"remember the milk").await;

        assert!(node.has_local("notes.txt").await);
        assert_eq!(node.fetch("notes.txt").await.unwrap(), b"remember the milk");
    }

    #[tokio::test]
    async fn test_remote_fetch_persists_locally() {
        let key = SecretKey::generate();
        let holder = TestNode::start(&key).await;
        holder.store("song.mp3", b"la la la").await;

        // Connected only after the store, so nothing was replicated.
        let asker = TestNode::start(&key).await;
        link(&asker, &holder).await;
        assert!(!asker.has_local("song.mp3").await);

        assert_eq!(asker.fetch("song.mp3").await.unwrap(), b"la la la");
        assert!(asker.has_local("song.mp3").await);
        assert_eq!(asker.read_at_rest("song.mp3").unwrap(), b"la la la");

        // Served from disk once the holder is gone.
        holder.shutdown().await;
        eventually("holder evicted", || asker.registry().is_empty()).await;
        assert_eq!(asker.fetch("song.mp3").await.unwrap(), b"la la la");
    }

    #[tokio::test]
    async fn test_missing_everywhere_is_not_found() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 3).await;

        let started = Instant::now();
        let result = nodes[0].fetch("ghost").await;
        assert!(matches!(result, Err(ReplicationError::NotFound(ref k)) if k == "ghost"));
        // Every peer answered, so the retrieval timeout was not needed.
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!nodes[0].has_local("ghost").await);
    }

    #[tokio::test]
    async fn test_missing_without_peers_is_not_found() {
        let node = TestNode::start(&SecretKey::generate()).await;
        assert!(matches!(
            node.fetch("ghost").await,
            Err(ReplicationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_through_intermediate_replica() {
        let key = SecretKey::generate();
        let origin = TestNode::start(&key).await;
        let relay = TestNode::start(&key).await;
        let edge = TestNode::start(&key).await;

        link(&origin, &relay).await;
        origin.store("map.geojson", b"{\"type\":\"Feature\"}").await;
        eventually("relay replica", || relay.blob_path("map.geojson").exists()).await;

        // The edge only knows the relay.
        link(&edge, &relay).await;
        assert_eq!(
            edge.fetch("map.geojson").await.unwrap(),
            b"{\"type\":\"Feature\"}"
        );
    }

    #[tokio::test]
    async fn test_one_holder_among_several_peers() {
        let key = SecretKey::generate();
        let holder = TestNode::start(&key).await;
        holder.store("needle", b"found me").await;

        let others = [TestNode::start(&key).await, TestNode::start(&key).await];
        let asker = TestNode::start(&key).await;
        link(&asker, &holder).await;
        for other in &others {
            link(&asker, other).await;
        }

        assert_eq!(asker.fetch("needle").await.unwrap(), b"found me");
    }

    #[tokio::test]
    async fn test_concurrent_gets_for_same_key() {
        let key = SecretKey::generate();
        let holder = TestNode::start(&key).await;
        holder.store("shared.dat", b"popular content").await;

        let asker = TestNode::start(&key).await;
        link(&asker, &holder).await;

        let (first, second) = tokio::join!(asker.fetch("shared.dat"), asker.fetch("shared.dat"));
        assert_eq!(first.unwrap(), b"popular content");
        assert_eq!(second.unwrap(), b"popular content");
    }

    #[tokio::test]
    async fn test_delete_local_then_refetch() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 2).await;

        nodes[0].store("draft.doc", b"first draft").await;
        eventually("replica", || nodes[1].blob_path("draft.doc").exists()).await;

        nodes[0].server.delete_local("draft.doc").await.unwrap();
        assert!(!nodes[0].has_local("draft.doc").await);
        assert!(!nodes[0].blob_path("draft.doc").exists());

        assert_eq!(nodes[0].fetch("draft.doc").await.unwrap(), b"first draft");
        assert!(nodes[0].has_local("draft.doc").await);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_network() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 2).await;

        assert!(matches!(
            nodes[0].fetch("").await,
            Err(ReplicationError::InvalidKey(_))
        ));
        let mut content: &[u8] = b"x";
        assert!(matches!(
            nodes[0].server.store("", &mut content).await,
            Err(ReplicationError::InvalidKey(_))
        ));
    }
}
