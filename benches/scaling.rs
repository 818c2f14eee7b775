use std::hint::black_box;

use bucket_lfu::LfuCache;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("insertion bounded");
    for size in (1000..=10000).step_by(1000) {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut cache = LfuCache::new(size / 4).unwrap();
            b.iter(|| {
                for i in 0..size {
                    cache.put(i, i);
                }
            });
        });
    }
    group.finish();

    let mut group = c.benchmark_group("get promoting");
    for size in (1000..=10000).step_by(1000) {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut cache = LfuCache::new(size).unwrap();
            for i in 0..size {
                cache.put(i, i);
            }
            b.iter(|| {
                for i in 0..size {
                    black_box(cache.get(&i));
                }
            });
        });
    }
    group.finish();

    // Each round pushes every key one bucket higher while new keys keep
    // landing at frequency zero, so eviction always has a long chain to
    // work against.
    let mut group = c.benchmark_group("mixed skewed");
    for size in (1000..=10000).step_by(1000) {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut cache = LfuCache::new(size / 2).unwrap();
            let mut next_key = 0;
            b.iter(|| {
                for i in 0..size {
                    if i % 4 == 0 {
                        cache.put(next_key, i);
                        next_key += 1;
                    } else {
                        black_box(cache.get(&(i % (size / 8))));
                    }
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
