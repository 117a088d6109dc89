//! # Quantum-Vault Replication Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | qv-02 Blob Store | Content-addressed path derivation |
//! | qv-03 Replication | Envelope encode/decode |
//! | shared-crypto | Stream encryption throughput |
//! | qv-03 Replication | Loopback store fan-out to two peers |

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qv_02_blob_store::cas_path_transform;
use qv_03_replication::Envelope;
use qv_tests::fixtures::{mesh, random_content};
use shared_crypto::{encrypt_copy, SecretKey, ENCRYPTION_OVERHEAD};

// ============================================================================
// QV-02: Path derivation
// ============================================================================

fn bench_cas_path_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("qv-02-blob-store");

    group.bench_function("cas_path_transform", |b| {
        b.iter(|| black_box(cas_path_transform(black_box("photos/2024/holiday/beach.jpg"))))
    });

    group.finish();
}

// ============================================================================
// QV-03: Control messages
// ============================================================================

fn bench_envelope_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("qv-03-envelope");

    let announce = Envelope::StoreAnnounce {
        key: "photos/2024/holiday/beach.jpg".to_string(),
        size: 4 * 1024 * 1024,
    };
    let encoded = announce.encode().expect("encode");

    group.bench_function("encode_store_announce", |b| {
        b.iter(|| black_box(announce.encode().expect("encode")))
    });
    group.bench_function("decode_store_announce", |b| {
        b.iter(|| black_box(Envelope::decode(black_box(&encoded)).expect("decode")))
    });

    group.finish();
}

// ============================================================================
// Shared crypto: stream cipher throughput
// ============================================================================

fn bench_encrypt_copy(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let key = SecretKey::generate();
    let key = &key;

    let mut group = c.benchmark_group("shared-crypto-stream");
    for size in [64 * 1024, 1024 * 1024, 8 * 1024 * 1024] {
        let plaintext = random_content(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encrypt_copy", size), &plaintext, |b, data| {
            b.to_async(&rt).iter(|| async move {
                let mut src = data.as_slice();
                let mut dst = Vec::with_capacity(data.len() + ENCRYPTION_OVERHEAD as usize);
                encrypt_copy(key, &mut src, &mut dst).await.expect("encrypt");
                black_box(dst)
            })
        });
    }
    group.finish();
}

// ============================================================================
// QV-03: End-to-end fan-out over loopback
// ============================================================================

fn bench_store_fan_out(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let key = SecretKey::generate();
    let nodes = rt.block_on(mesh(&key, 3));
    let origin = &nodes[0];

    let mut group = c.benchmark_group("qv-03-replication");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for size in [4 * 1024, 1024 * 1024] {
        let content = random_content(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("store_to_two_peers", size), &content, |b, data| {
            b.to_async(&rt).iter(|| async move {
                let report = origin.store("bench-blob", data).await;
                black_box(report)
            })
        });
    }
    group.finish();

    rt.block_on(async {
        for node in &nodes {
            node.shutdown().await;
        }
    });
}

criterion_group!(
    benches,
    bench_cas_path_transform,
    bench_envelope_codec,
    bench_encrypt_copy,
    bench_store_fan_out,
);
criterion_main!(benches);
