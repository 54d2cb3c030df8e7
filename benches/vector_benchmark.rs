/*!
 * Vector and Batching Benchmarks
 *
 * Append throughput per growth factor, and end-to-end batching of a token stream
 */

use batch_launcher::batch::{ArgLimits, BatchEngine, OversizedPolicy, RunConfig, SourceSpec};
use batch_launcher::batch::TokenReader;
use batch_launcher::memory::{AllocatorConfig, GrowthAllocator};
use batch_launcher::process::RecordingExecutor;
use batch_launcher::vector::{GrowableArray, StringVector};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;
use std::path::PathBuf;

fn allocator() -> GrowthAllocator {
    GrowthAllocator::new(AllocatorConfig::default())
}

fn bench_array_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_append");
    group.throughput(Throughput::Elements(100_000));

    for factor in [0u32, 4, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(factor), &factor, |b, &factor| {
            b.iter(|| {
                let mut array = GrowableArray::<u64>::with_growth_factor(allocator(), factor);
                for i in 0..100_000u64 {
                    array.append(i).ok();
                }
                black_box(array.used())
            });
        });
    }

    group.finish();
}

fn bench_strvec_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("strvec_append");

    for len in [8usize, 64, 1024] {
        let token = vec![b'a'; len];
        group.throughput(Throughput::Bytes((len * 10_000) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &token, |b, token| {
            b.iter(|| {
                let mut vector = StringVector::new(allocator());
                for _ in 0..10_000 {
                    vector.append(token).ok();
                }
                black_box(vector.argv_size())
            });
        });
    }

    group.finish();
}

fn bench_batching(c: &mut Criterion) {
    let mut input = Vec::new();
    for i in 0..100_000 {
        input.extend_from_slice(format!("/srv/data/file-{i:06}").as_bytes());
        input.push(0);
    }
    let limits = ArgLimits::compute(2_097_152, 0, true, 4096).unwrap_or_else(|err| panic!("{err}"));

    let mut group = c.benchmark_group("batching");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.sample_size(20);

    for cap in [None, Some(1000)] {
        let label = cap.map_or_else(|| "limits".to_string(), |n| format!("max-{n}"));
        group.bench_with_input(BenchmarkId::from_parameter(label), &cap, |b, &cap| {
            b.iter(|| {
                let config = RunConfig::new(c"echo".into(), SourceSpec::Stdin)
                    .with_max_batch_tokens(cap);
                let mut engine =
                    BatchEngine::new(config, limits, allocator(), RecordingExecutor::new())
                        .unwrap();
                let tokens = TokenReader::new(
                    Cursor::new(input.as_slice()),
                    PathBuf::from("bench"),
                    limits.read_buffer(),
                    limits.arg_buffer - 1,
                    OversizedPolicy::Truncate,
                );
                black_box(engine.run_tokens(tokens, false).ok());
                black_box(engine.batches())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_array_append, bench_strvec_append, bench_batching);
criterion_main!(benches);
