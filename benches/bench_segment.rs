use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pcedit::segmentation::{extract_clusters, ClusterParams, Segmenter};
use pcedit::VoxelIndex;

/// `blobs` dense cubes of side 1, spaced 3 apart along x.
fn blobs(blobs: usize, per_axis: usize) -> Vec<[f32; 3]> {
    let step = 1.0 / per_axis as f32;
    let mut pts = Vec::with_capacity(blobs * per_axis.pow(3));
    for b in 0..blobs {
        for i in 0..per_axis {
            for j in 0..per_axis {
                for k in 0..per_axis {
                    pts.push([
                        b as f32 * 3.0 + i as f32 * step,
                        j as f32 * step,
                        k as f32 * step,
                    ]);
                }
            }
        }
    }
    pts
}

fn bench_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("region_grow");
    for per_axis in [10, 20, 40] {
        let pts = blobs(4, per_axis);
        let index = VoxelIndex::covering(&pts, 1.5 / per_axis as f32).unwrap();
        group.bench_with_input(BenchmarkId::new("segment", pts.len()), &index, |b, index| {
            b.iter(|| Segmenter::new(index).segment([0.0, 0.0, 0.0]))
        });
        group.bench_with_input(
            BenchmarkId::new("extract_clusters", pts.len()),
            &index,
            |b, index| b.iter(|| extract_clusters(index, ClusterParams::default())),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_segment);
criterion_main!(benches);
