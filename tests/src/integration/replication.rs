//! Store fan-out across connected nodes.

#[cfg(test)]
mod tests {
    use qv_02_blob_store::PathLayout;
    use shared_crypto::SecretKey;

    use crate::fixtures::{eventually, link, mesh, random_content, TestNode};

    #[tokio::test]
    async fn test_store_fans_out_to_every_peer() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 3).await;

        let report = nodes[0].store("photos/cat.jpg", b"meow meow meow").await;
        assert_eq!(report.size, 14);
        assert_eq!(report.delivered.len(), 2);
        assert!(report.failed.is_empty());
        assert!(report.fully_replicated());

        for node in &nodes[1..] {
            eventually("replica on disk", || {
                node.read_at_rest("photos/cat.jpg").as_deref() == Some(&b"meow meow meow"[..])
            })
            .await;
        }
    }

    #[tokio::test]
    async fn test_replicas_are_plaintext_at_cas_path() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 2).await;
        let content = random_content(10_000);

        nodes[0].store("dataset.bin", &content).await;

        let replica = &nodes[1];
        eventually("replica on disk", || replica.blob_path("dataset.bin").exists()).await;

        let path = replica.blob_path("dataset.bin");
        let relative = path.strip_prefix(replica.storage_root()).unwrap();
        // 64 hex chars split into 8 directories plus the digest as file name
        assert_eq!(relative.components().count(), 9);
        assert_eq!(replica.read_at_rest("dataset.bin").unwrap(), content);
        assert_eq!(nodes[0].read_at_rest("dataset.bin").unwrap(), content);
    }

    #[tokio::test]
    async fn test_large_blob_replicates_intact() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 2).await;
        let content = random_content(4 * 1024 * 1024);

        let report = nodes[0].store("backup.tar", &content).await;
        assert_eq!(report.size, content.len() as u64);
        assert_eq!(report.delivered.len(), 1);

        eventually("large replica", || {
            nodes[1].read_at_rest("backup.tar").map(|b| b.len()) == Some(content.len())
        })
        .await;
        assert_eq!(nodes[1].fetch("backup.tar").await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_empty_blob_replicates() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 2).await;

        let report = nodes[0].store("empty", b"").await;
        assert_eq!(report.size, 0);
        assert_eq!(report.delivered.len(), 1);

        eventually("empty replica", || nodes[1].blob_path("empty").exists()).await;
        assert_eq!(nodes[1].fetch("empty").await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn test_plain_layout_nodes() {
        let key = SecretKey::generate();
        let plain = |config: &mut node_runtime::NodeConfig| {
            config.path_layout = PathLayout::Plain;
        };
        let a = TestNode::start_with(&key, plain).await;
        let b = TestNode::start_with(&key, plain).await;
        link(&a, &b).await;

        a.store("report.txt", b"quarterly numbers").await;

        eventually("plain replica", || b.storage_root().join("report.txt").exists()).await;
        assert_eq!(
            std::fs::read(b.storage_root().join("report.txt")).unwrap(),
            b"quarterly numbers"
        );
    }

    #[tokio::test]
    async fn test_bootstrap_links_nodes() {
        let key = SecretKey::generate();
        let seed = TestNode::start(&key).await;
        let seed_addr = seed.addr();
        let joiner = TestNode::start_with(&key, |config| {
            config.bootstrap_nodes = vec![String::new(), seed_addr.clone()];
        })
        .await;

        eventually("bootstrap link", || {
            seed.registry().len() == 1 && joiner.registry().len() == 1
        })
        .await;

        seed.store("welcome.md", b"# hello").await;
        eventually("replica via bootstrap link", || {
            joiner.read_at_rest("welcome.md").as_deref() == Some(&b"# hello"[..])
        })
        .await;
    }

    #[tokio::test]
    async fn test_overwrite_replicates_latest_content() {
        let key = SecretKey::generate();
        let nodes = mesh(&key, 2).await;

        nodes[0].store("config.toml", b"version = 1").await;
        eventually("first version", || {
            nodes[1].read_at_rest("config.toml").as_deref() == Some(&b"version = 1"[..])
        })
        .await;

        nodes[0].store("config.toml", b"version = 2").await;
        eventually("second version", || {
            nodes[1].read_at_rest("config.toml").as_deref() == Some(&b"version = 2"[..])
        })
        .await;
    }
}
