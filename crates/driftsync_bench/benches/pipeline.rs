//! End-to-end push and pull run benchmarks.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use driftsync_bench::random_notes;
use driftsync_engine::pipeline::{build_pull_plan, build_push_plan, execute, Plan, RunContext};
use driftsync_engine::{SimulatedRemote, TaskPurpose};
use driftsync_store::InMemoryStore;
use driftsync_testkit::{seeded_store, Note};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

fn context(purpose: TaskPurpose) -> RunContext {
    RunContext::new("notes", purpose, CancellationToken::new(), Duration::from_secs(30))
}

/// A push plan from a seeded local store to an empty remote.
fn push_setup(notes: &[Note]) -> Plan {
    let remote = Arc::new(SimulatedRemote::new(Arc::new(InMemoryStore::new())));
    build_push_plan::<Note, _>(seeded_store(notes), remote)
}

/// A pull plan from a seeded remote into an empty local store.
fn pull_setup(notes: &[Note]) -> Plan {
    let remote = Arc::new(SimulatedRemote::new(seeded_store(notes)));
    build_pull_plan::<Note, _>(Arc::new(InMemoryStore::new()), remote)
}

/// Benchmark full push runs.
fn bench_push(c: &mut Criterion) {
    let rt = Runtime::new().expect("failed to create runtime");
    let mut group = c.benchmark_group("push_run");
    group.sample_size(20);

    for count in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let notes = random_notes(count, 128);
            b.iter_batched(
                || push_setup(&notes),
                |plan| rt.block_on(execute(&plan, context(TaskPurpose::Push))),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark full pull runs.
fn bench_pull(c: &mut Criterion) {
    let rt = Runtime::new().expect("failed to create runtime");
    let mut group = c.benchmark_group("pull_run");
    group.sample_size(20);

    for count in [100, 1_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let notes = random_notes(count, 128);
            b.iter_batched(
                || pull_setup(&notes),
                |plan| rt.block_on(execute(&plan, context(TaskPurpose::Pull))),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_push, bench_pull);

criterion_main!(benches);
