use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pcedit::segmentation::{ConsensusEngine, SurfaceModel, UniformSampler};
use pcedit::VoxelIndex;
use rand::prelude::*;
use rand::rngs::StdRng;

/// Noisy ground plane with 20% scattered outliers.
fn scene(n: usize) -> Vec<[f32; 3]> {
    let mut rng = StdRng::seed_from_u64(11);
    (0..n)
        .map(|i| {
            let x = rng.gen_range(0.0..10.0);
            let y = rng.gen_range(0.0..10.0);
            let z = if i % 5 == 0 {
                rng.gen_range(0.0..5.0)
            } else {
                rng.gen_range(-0.01..0.01)
            };
            [x, y, z]
        })
        .collect()
}

fn bench_consensus(c: &mut Criterion) {
    let mut group = c.benchmark_group("surface_consensus");
    for size in [1_000, 10_000, 100_000] {
        let pts = scene(size);
        let index = VoxelIndex::covering(&pts, 0.1).unwrap();
        group.bench_with_input(BenchmarkId::new("30_trials", size), &pts, |b, pts| {
            b.iter(|| {
                let model = SurfaceModel::new(pts, &index);
                let mut engine = ConsensusEngine::new(model, UniformSampler::seeded(pts.len(), 5));
                engine.compute(30)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_consensus);
criterion_main!(benches);
