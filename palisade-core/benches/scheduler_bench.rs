#[macro_use]
extern crate criterion;

use std::time::Duration;

use criterion::{black_box, Criterion};
use palisade_core::{SamplingService, Scheduler};

fn bench_scheduler_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_throughput");

    for actions in [1_000u64, 10_000, 100_000] {
        group.throughput(criterion::Throughput::Elements(actions));
        group.bench_function(format!("actions_{}", actions), |b| {
            b.iter(|| {
                let mut sampler = SamplingService::new(42);
                let mut scheduler = Scheduler::new();
                for id in 0..actions {
                    scheduler.schedule(sampler.uniform_millis(0, 10_000), id);
                }
                black_box(scheduler.run(Duration::MAX, |_, id| {
                    black_box(id);
                }));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scheduler_throughput);
criterion_main!(benches);
