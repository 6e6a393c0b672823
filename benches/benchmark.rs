//! Performance benchmarks for SeqCoord
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use seqcoord::{CompactGapMap, SliceSpec};

/// A synthetic map with `num_gaps` runs spread evenly over the parent
fn synthetic_map(num_gaps: i64) -> CompactGapMap {
    let parent_length = num_gaps * 100;
    let table: Vec<(i64, i64)> = (0..num_gaps)
        .map(|i| (i * 100 + 50, 1 + i % 7))
        .collect();
    CompactGapMap::from_gap_table(&table, parent_length).unwrap()
}

/// Benchmark sequence-to-alignment conversion across map sizes
fn bench_seq_to_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("seq_to_align");
    for num_gaps in [100i64, 10_000, 1_000_000] {
        let map = synthetic_map(num_gaps);
        let probe = map.parent_length() / 2 + 17;
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(num_gaps), &map, |b, map| {
            b.iter(|| map.seq_to_align(black_box(probe), false).unwrap())
        });
    }
    group.finish();
}

/// Benchmark alignment-to-sequence conversion across map sizes
fn bench_align_to_seq(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_to_seq");
    for num_gaps in [100i64, 10_000, 1_000_000] {
        let map = synthetic_map(num_gaps);
        let probe = map.len() / 2 + 17;
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(num_gaps), &map, |b, map| {
            b.iter(|| map.align_to_seq(black_box(probe)).unwrap())
        });
    }
    group.finish();
}

/// Benchmark slicing a window out of a large map
fn bench_slice(c: &mut Criterion) {
    let map = synthetic_map(1_000_000);
    let mid = map.len() / 2;

    c.bench_function("slice_window_1M_gaps", |b| {
        b.iter(|| {
            let sliced = map
                .slice(SliceSpec::range(black_box(mid - 5000), black_box(mid + 5000)))
                .unwrap();
            black_box(sliced)
        })
    });
}

/// Benchmark merging two large maps
fn bench_merge(c: &mut Criterion) {
    let a = synthetic_map(100_000);
    let table: Vec<(i64, i64)> = (0..100_000i64).map(|i| (i * 100 + 25, 2)).collect();
    let b_map = CompactGapMap::from_gap_table(&table, a.parent_length()).unwrap();

    c.bench_function("merge_100k_gaps", |b| {
        b.iter(|| black_box(a.merge(black_box(&b_map), None).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_seq_to_align,
    bench_align_to_seq,
    bench_slice,
    bench_merge
);
criterion_main!(benches);
