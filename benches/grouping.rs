//! Benchmarks for spark-groups
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_groups::{CloseSignal, GroupingConfig, Keyed, OrderedCollection, SubsetOptions, SubsetView};

#[derive(Clone)]
struct Row {
    id: u32,
    bucket: u32,
}

impl Keyed for Row {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

fn rows(count: u32, buckets: u32) -> Vec<Row> {
    (0..count)
        .map(|id| Row {
            id,
            bucket: id % buckets,
        })
        .collect()
}

// =============================================================================
// COLLECTION BENCHMARKS
// =============================================================================

fn bench_collection_add_remove(c: &mut Criterion) {
    let base = OrderedCollection::from_records(rows(1_000, 10));
    c.bench_function("collection_add_remove", |b| {
        b.iter(|| {
            base.add(Row {
                id: 10_000,
                bucket: 3,
            });
            black_box(base.remove(&10_000))
        })
    });
}

fn bench_subset_build(c: &mut Criterion) {
    let base = OrderedCollection::from_records(rows(1_000, 10));
    c.bench_function("subset_build", |b| {
        b.iter(|| {
            black_box(SubsetView::new(
                &base,
                |r: &Row| r.bucket == 3,
                SubsetOptions::new(),
            ))
        })
    });
}

// =============================================================================
// GROUPING BENCHMARKS
// =============================================================================

fn bench_grouping_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouping_build");

    for buckets in [1, 10, 100] {
        group.bench_with_input(
            BenchmarkId::new("buckets", buckets),
            &buckets,
            |b, &buckets| {
                let base = OrderedCollection::from_records(rows(1_000, buckets));
                b.iter(|| {
                    black_box(
                        GroupingConfig::new()
                            .collection(&base)
                            .group_by(|r: &Row| r.bucket)
                            .close_with(CloseSignal::new())
                            .build(),
                    )
                })
            },
        );
    }

    group.finish();
}

fn bench_grouping_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouping_add_remove");

    for buckets in [10, 100] {
        group.bench_with_input(
            BenchmarkId::new("buckets", buckets),
            &buckets,
            |b, &buckets| {
                let base = OrderedCollection::from_records(rows(1_000, buckets));
                let signal = CloseSignal::new();
                let _grouped = GroupingConfig::new()
                    .collection(&base)
                    .group_by(|r: &Row| r.bucket)
                    .close_with(signal.clone())
                    .build();

                // A fresh bucket: creates and destroys a group every iteration
                b.iter(|| {
                    base.add(Row {
                        id: 10_000,
                        bucket: 10_000,
                    });
                    black_box(base.remove(&10_000))
                })
            },
        );
    }

    group.finish();
}

fn bench_grouping_regroup(c: &mut Criterion) {
    let base = OrderedCollection::from_records(rows(1_000, 10));
    let signal = CloseSignal::new();
    let _grouped = GroupingConfig::new()
        .collection(&base)
        .group_by(|r: &Row| r.bucket)
        .close_with(signal.clone())
        .build();

    c.bench_function("grouping_regroup", |b| {
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let bucket = if flip { 3 } else { 4 };
            black_box(base.update(&0, |r| r.bucket = bucket))
        })
    });
}

fn bench_grouping_reset(c: &mut Criterion) {
    let base = OrderedCollection::from_records(rows(1_000, 10));
    let signal = CloseSignal::new();
    let _grouped = GroupingConfig::new()
        .collection(&base)
        .group_by(|r: &Row| r.bucket)
        .close_with(signal.clone())
        .build();
    let next = rows(1_000, 20);

    c.bench_function("grouping_reset", |b| {
        b.iter(|| base.reset(black_box(next.clone())))
    });
}

criterion_group!(
    collection_benches,
    bench_collection_add_remove,
    bench_subset_build,
);

criterion_group!(
    grouping_benches,
    bench_grouping_build,
    bench_grouping_add_remove,
    bench_grouping_regroup,
    bench_grouping_reset,
);

criterion_main!(collection_benches, grouping_benches);
