use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mb_core::{
    GraphBrush, KernelModel, KernelRegistry, ManifoldBrush, SelectionMode, SpectralBrush,
    TrajectoryBrush, demo,
};

fn bench_spectral(c: &mut Criterion) {
    let registry = Arc::new(KernelRegistry::with_builtins());
    let mut group = c.benchmark_group("spectral_heat");
    for side in [16usize, 32] {
        let m = demo::grid(side, side, 64);
        let kernel = KernelModel::for_manifold(Arc::clone(&registry), &m, "heat").unwrap();
        let mut brush = SpectralBrush::new().with_kernel(kernel);
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &m, |b, m| {
            let mut seed = 0;
            b.iter(|| {
                seed = (seed + 7) % m.n();
                black_box(brush.evaluate(m, Some(seed)).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_graph(c: &mut Criterion) {
    let m = demo::grid(48, 48, 1);
    let mut k_brush = GraphBrush::new().with_k(4).with_weighted(false);
    let mut component = GraphBrush::new().with_mode(SelectionMode::Component);
    // Warm the graph caches so the loop measures queries only
    k_brush.evaluate(&m, Some(0)).unwrap();
    component.evaluate(&m, Some(0)).unwrap();

    c.bench_function("graph_k_neighbors_2304", |b| {
        b.iter(|| black_box(k_brush.evaluate(&m, Some(black_box(1200))).unwrap()))
    });
    c.bench_function("graph_component_2304", |b| {
        b.iter(|| black_box(component.evaluate(&m, Some(black_box(1200))).unwrap()))
    });
}

fn bench_trajectory(c: &mut Criterion) {
    let m = demo::ring(256);
    let kernel =
        KernelModel::for_manifold(Arc::new(KernelRegistry::with_builtins()), &m, "heat").unwrap();
    let mut brush = TrajectoryBrush::new(Some(64)).with_kernel(kernel);
    c.bench_function("trajectory_ring_256", |b| {
        b.iter(|| black_box(brush.evaluate(&m, Some(black_box(0))).unwrap()))
    });
}

criterion_group!(benches, bench_spectral, bench_graph, bench_trajectory);
criterion_main!(benches);
