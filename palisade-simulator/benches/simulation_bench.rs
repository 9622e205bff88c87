#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};
use palisade_config::PalisadeConfig;
use palisade_simulator::Simulation;

/// Full default run: 16 nodes, 1000 sensing events.
fn benchmark_simulation_throughput(c: &mut Criterion) {
    let config = PalisadeConfig::default();

    c.bench_function("simulation_throughput", |b| {
        b.iter(|| {
            let Ok(mut simulation) = Simulation::new(config.clone()) else {
                return;
            };
            black_box(simulation.run());
        })
    });
}

criterion_group!(benches, benchmark_simulation_throughput);
criterion_main!(benches);
