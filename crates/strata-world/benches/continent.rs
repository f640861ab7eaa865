use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use strata_world::{
    CellKey, ContinentGenerator, ContinentParams, EdgeScratch, FastNoiseSampler, NoiseSampler,
    RegionCoord, RiverParams, World, WorldGenParams,
};

fn generator() -> ContinentGenerator {
    let noise: Arc<dyn NoiseSampler> = Arc::new(FastNoiseSampler::default());
    ContinentGenerator::new(
        42,
        ContinentParams::default(),
        RiverParams::default(),
        noise,
        4096,
    )
}

fn bench_edge_value(c: &mut Criterion) {
    let g = generator();
    let mut scratch = EdgeScratch::default();
    c.bench_function("edge_value_64x64", |b| {
        b.iter(|| {
            let mut acc = 0.0f32;
            for j in 0..64 {
                for i in 0..64 {
                    acc += g.edge_value_with(i as f32 * 0.0625, j as f32 * 0.0625, &mut scratch);
                }
            }
            black_box(acc)
        })
    });
}

fn bench_compute_mesh(c: &mut Criterion) {
    let g = generator();
    c.bench_function("compute_mesh_16x16", |b| {
        b.iter(|| {
            for cy in 0..16 {
                for cx in 0..16 {
                    black_box(g.compute_mesh(CellKey::pack(cx, cy)));
                }
            }
        })
    });
}

fn bench_region(c: &mut Criterion) {
    let world = World::new(WorldGenParams::default());
    let mut ctx = strata_world::RegionSource::make_gen_ctx(&world);
    let mut group = c.benchmark_group("generate_region");
    group.sample_size(10);
    group.bench_function("region_0_0", |b| {
        b.iter(|| black_box(world.generate_region(RegionCoord::new(0, 0), &mut ctx)))
    });
    group.finish();
}

criterion_group!(benches, bench_edge_value, bench_compute_mesh, bench_region);
criterion_main!(benches);
