//! Performance benchmarks for the simulator.
//!
//! Run with: `cargo bench`
//! Or for specific bench: `cargo bench --bench simulation_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use nocsim::sweep::run_sweep;
use nocsim::{build_network, NocConfig, NocConfigBuilder, SimulationEngine};

// ============================================================================
// Full runs
// ============================================================================

fn bench_quadtree_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadtree_run");

    for host_count in [256u32, 1024, 4096].iter() {
        let config = NocConfigBuilder::new().quadtree(*host_count).build().unwrap();
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("hosts", host_count),
            &config,
            |b, config| {
                b.iter(|| {
                    let mut engine = SimulationEngine::from_config(config).unwrap();
                    black_box(engine.run(1000).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_grid_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_run");

    for side in [2u32, 4, 8].iter() {
        let config = NocConfigBuilder::new().grid(*side, *side).build().unwrap();
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(BenchmarkId::new("side", side), &config, |b, config| {
            b.iter(|| {
                let mut engine = SimulationEngine::from_config(config).unwrap();
                black_box(engine.run(1000).unwrap());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Tick throughput
// ============================================================================

fn bench_tick_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_throughput");
    let config = NocConfig::default();

    for ticks in [100u64, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*ticks));
        group.bench_with_input(BenchmarkId::new("ticks", ticks), ticks, |b, &ticks| {
            b.iter(|| {
                let mut engine = SimulationEngine::from_config(&config).unwrap();
                black_box(engine.run(ticks).unwrap());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Construction and sweeps
// ============================================================================

fn bench_build_network(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_network");

    for host_count in [256u32, 4096, 65536].iter() {
        let config = NocConfigBuilder::new().quadtree(*host_count).build().unwrap();
        group.throughput(Throughput::Elements(u64::from(*host_count)));
        group.bench_with_input(
            BenchmarkId::new("hosts", host_count),
            &config,
            |b, config| {
                b.iter(|| black_box(build_network(config).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let configs: Vec<_> = (0..8)
        .map(|seed| NocConfigBuilder::new().seed(seed).ticks(500).build().unwrap())
        .collect();

    c.bench_function("sweep_8_seeds", |b| {
        b.iter(|| black_box(run_sweep(&configs)));
    });
}

criterion_group!(
    benches,
    bench_quadtree_run,
    bench_grid_run,
    bench_tick_throughput,
    bench_build_network,
    bench_sweep,
);

criterion_main!(benches);
