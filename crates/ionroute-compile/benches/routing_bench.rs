//! Benchmarks for gate selection and routing
//!
//! Run with: cargo bench -p ionroute-compile

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ionroute_arch::{DynamicArch, TrapConfiguration, ZonePlacement, named};
use ionroute_compile::{
    CompilationSettings, GeneralRouter, RoutingAlgorithm, RoutingSettings, compile,
};
use ionroute_ir::{Circuit, QubitId};

/// Nearest-neighbour ladder followed by long-range pairs.
fn ladder_circuit(n: u32) -> Circuit {
    let mut circuit = Circuit::with_size("ladder", n, n);
    for i in 1..n {
        circuit.cx(QubitId(i - 1), QubitId(i)).unwrap();
    }
    for i in 0..n / 2 {
        circuit.cx(QubitId(i), QubitId(n - 1 - i)).unwrap();
    }
    circuit.measure_all().unwrap();
    circuit
}

/// Benchmark routing between two fixed placements
fn bench_router(c: &mut Criterion) {
    let spec = named::four_zones_in_a_line();
    let source = ZonePlacement::new(vec![
        vec![0, 1, 2, 3],
        vec![4, 5, 6, 7],
        vec![8, 9, 10, 11],
        vec![12, 13],
    ]);
    let target = ZonePlacement::new(vec![
        vec![12, 13, 8, 9],
        vec![0, 1, 10],
        vec![2, 3, 11, 4],
        vec![5, 6, 7],
    ]);

    c.bench_function("router_permute_14", |b| {
        b.iter(|| {
            let mut arch =
                DynamicArch::new(&spec, TrapConfiguration::new(14, source.clone())).unwrap();
            GeneralRouter::default()
                .route_source_to_target_config(&mut arch, black_box(&target))
                .unwrap()
        });
    });
}

/// Benchmark full compilation with both gate selectors
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let spec = named::memory_and_gate_zones();

    for n in &[8_u32, 16, 32] {
        let circuit = ladder_circuit(*n);
        group.bench_with_input(BenchmarkId::new("greedy", n), &circuit, |b, circuit| {
            b.iter(|| compile(&spec, black_box(circuit), &CompilationSettings::default()).unwrap());
        });

        let settings = CompilationSettings::default().with_routing(
            RoutingSettings::default().with_algorithm(RoutingAlgorithm::Partition),
        );
        group.bench_with_input(BenchmarkId::new("partition", n), &circuit, |b, circuit| {
            b.iter(|| compile(&spec, black_box(circuit), &settings).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_router, bench_compile);
criterion_main!(benches);
