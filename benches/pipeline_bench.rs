use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use flowline::{heap_sort, merge_sort, Engine, Pipeline};
use std::hint::black_box;

fn expensive(x: u64) -> u64 {
    (0..200).fold(x, |acc, i| acc.wrapping_mul(31).wrapping_add(i))
}

fn benchmark_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("map");
    // One pool for every run, so thread startup stays out of the timings.
    let parallel = Engine::parallel(8).unwrap();

    for size in [100usize, 1_000, 5_000].iter() {
        let input: Vec<u64> = (0..*size as u64).collect();

        group.bench_with_input(BenchmarkId::new("sequential", size), &input, |b, input| {
            b.iter(|| {
                let out = Pipeline::from_vec(input.clone()).map(expensive).to_vec();
                black_box(out)
            });
        });

        group.bench_with_input(BenchmarkId::new("parallel_unordered", size), &input, |b, input| {
            b.iter(|| {
                let out = Pipeline::on_engine(parallel.clone(), input.clone())
                    .map(expensive)
                    .to_vec();
                black_box(out)
            });
        });

        group.bench_with_input(BenchmarkId::new("parallel_ordered", size), &input, |b, input| {
            b.iter(|| {
                let out = Pipeline::on_engine(parallel.clone(), input.clone())
                    .map_ordered(expensive)
                    .to_vec();
                black_box(out)
            });
        });
    }

    group.finish();
}

fn benchmark_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");

    for size in [1_000usize, 50_000].iter() {
        let input: Vec<u64> = (0..*size as u64).map(expensive).collect();

        group.bench_with_input(BenchmarkId::new("heap_sort", size), &input, |b, input| {
            b.iter(|| {
                let mut items = input.clone();
                heap_sort(&mut items, &|a: &u64, b: &u64| a < b);
                black_box(items)
            });
        });

        group.bench_with_input(BenchmarkId::new("merge_sort", size), &input, |b, input| {
            b.iter(|| black_box(merge_sort(input.clone(), &|a: &u64, b: &u64| a < b)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_map, benchmark_sort);
criterion_main!(benches);
