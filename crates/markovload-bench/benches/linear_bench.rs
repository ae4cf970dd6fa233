//! Linear workload sweep: 100k to 1.5M steps with the `ver-1` matrix.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use markovload_core::{LinearPreset, Worker, WorkerConfig};
use markovload_heap::{LibcAllocator, SystemAllocator};

fn bench_linear_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("linear_ver1");
    group.sample_size(10);

    for ops in (1..=15).map(|k| k * 100_000u64) {
        let config = WorkerConfig::with_ops(ops).preset(LinearPreset::Ver1);
        group.bench_with_input(BenchmarkId::new("system", ops), &config, |b, config| {
            b.iter(|| {
                let mut worker = Worker::new(config.clone(), SystemAllocator::new())
                    .expect("preset config is valid");
                criterion::black_box(worker.run())
            });
        });
        group.bench_with_input(BenchmarkId::new("libc", ops), &config, |b, config| {
            b.iter(|| {
                let mut worker = Worker::new(config.clone(), LibcAllocator::new())
                    .expect("preset config is valid");
                criterion::black_box(worker.run())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_linear_sweep);
criterion_main!(benches);
