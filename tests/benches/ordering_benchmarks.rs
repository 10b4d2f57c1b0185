//! # Causal-Graph Ordering Benchmarks
//!
//! | Path | Work | Target |
//! |------|------|--------|
//! | cg-01 comparator | one clock pair, up to 64 replicas | < 1µs |
//! | cg-01 local tournament | 64 clocks, unique minimum | no round trip |
//! | cg-01 escalation | in-memory order service | one round trip |
//! | cg-02 admission | submit + single-shard ack | < 50µs |

use cg_01_causal_order::{
    compare_two_clocks, compare_vector_clocks, CausalOrderApi, InMemoryTemporalOrderService,
    Oracle, OracleConfig,
};
use cg_02_tx_admission::{
    AdmissionConfig, AdmissionTracker, GraphUpdate, InMemoryGraphStore, PendingTransaction,
    Timestamper, TransactionAdmissionApi,
};
use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use shared_types::{ClusterLayout, NodeHandle, ReplicaId, Timestamp, TxId, VectorClock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn clock(epoch: u64, replicas: usize, seed: u64) -> VectorClock {
    let counters = (0..replicas as u64)
        .map(|i| (seed.wrapping_mul(31) + i * 7) % 97)
        .collect();
    VectorClock::new(epoch, counters)
}

// ============================================================================
// CG-01: Comparator
// ============================================================================

fn bench_compare_two_clocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("cg-01-comparator");

    for replicas in [4usize, 16, 64] {
        let a = clock(0, replicas, 1);
        let b = clock(0, replicas, 2);
        group.bench_with_input(BenchmarkId::new("compare_two", replicas), &replicas, |bench, _| {
            bench.iter(|| black_box(compare_two_clocks(&a, &b)))
        });
    }

    group.finish();
}

fn bench_local_tournament(c: &mut Criterion) {
    let mut group = c.benchmark_group("cg-01-local-tournament");

    for n in [8usize, 32, 64] {
        // Chain of dominating clocks; the minimum is found locally.
        let clocks: Vec<VectorClock> = (0..n as u64)
            .rev()
            .map(|i| VectorClock::new(0, vec![i, i, i, i]))
            .collect();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("chain", n), &clocks, |bench, clocks| {
            bench.iter(|| black_box(compare_vector_clocks(clocks).unwrap().sole_candidate()))
        });
    }

    group.finish();
}

// ============================================================================
// CG-01: Escalation
// ============================================================================

fn bench_escalation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("cg-01-escalation");
    group.measurement_time(Duration::from_secs(5));

    let pair = [
        Timestamp::new(ReplicaId(0), VectorClock::new(0, vec![1, 0, 0])),
        Timestamp::new(ReplicaId(1), VectorClock::new(0, vec![0, 1, 0])),
    ];

    // Fresh service every iteration so the pair is always undecided.
    group.bench_function("fresh_pair", |b| {
        b.to_async(&rt).iter_batched(
            || Oracle::new(Arc::new(InMemoryTemporalOrderService::new())),
            |oracle| {
                let pair = pair.clone();
                async move { black_box(oracle.compare_vts(&pair).await.unwrap()) }
            },
            BatchSize::SmallInput,
        )
    });

    let cached = Oracle::with_config(
        Arc::new(InMemoryTemporalOrderService::new()),
        OracleConfig::for_testing(),
    )
    .unwrap();
    group.bench_function("memoized_pair", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(cached.compare_vts(&pair).await.unwrap()) })
    });

    group.finish();
}

// ============================================================================
// CG-02: Admission
// ============================================================================

fn bench_admission(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("cg-02-admission");
    group.throughput(Throughput::Elements(1));

    let layout = ClusterLayout::for_testing();
    let oracle = Arc::new(Oracle::new(Arc::new(InMemoryTemporalOrderService::new())));
    let store = Arc::new(InMemoryGraphStore::new());
    let tracker =
        AdmissionTracker::with_config(AdmissionConfig::for_testing(), oracle, store).unwrap();
    let stamper = Timestamper::new(ReplicaId(0), &layout, 0).unwrap();
    let next = AtomicU64::new(0);

    group.bench_function("submit_and_ack", |b| {
        b.to_async(&rt).iter(|| {
            let id = next.fetch_add(1, Ordering::Relaxed);
            let shard = (id % 4) as u16;
            let tx = PendingTransaction::new(
                TxId(id),
                stamper.next_timestamp().unwrap(),
                vec![GraphUpdate::CreateNode {
                    handle: NodeHandle::new(format!("bench-{}", id)),
                    shard,
                }],
                &layout,
            )
            .unwrap();
            let tracker = &tracker;
            async move {
                tracker.submit(tx).await.unwrap();
                black_box(tracker.on_shard_ack(TxId(id), shard).await.unwrap())
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_compare_two_clocks,
    bench_local_tournament,
    bench_escalation,
    bench_admission,
);
criterion_main!(benches);
