//! Benchmark for noise and height map generation.
//!
//! TARGET: a 149x149 height map (default chunk size) in a few milliseconds
//!
//! Run with: cargo bench --package horizon_procedural --bench noise_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use horizon_procedural::{
    HeightMapBuilder, HeightMapSettings, NoiseField, NoiseSettings, SimplexNoise, WorldSeed,
};
use horizon_shared::Vec2;

fn benchmark_single_sample(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    c.bench_function("single_noise_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.sample(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_noise_field(c: &mut Criterion) {
    let field = NoiseField::new(&NoiseSettings::default());

    let mut group = c.benchmark_group("noise_field");
    group.throughput(Throughput::Elements(149 * 149));
    group.bench_function("149x149_6_octaves", |b| {
        let mut center = 0.0f32;
        b.iter(|| {
            center += 146.0;
            black_box(field.generate(149, 149, Vec2::new(center, 0.0)))
        });
    });
    group.finish();
}

fn benchmark_height_map(c: &mut Criterion) {
    let builder = HeightMapBuilder::new(HeightMapSettings {
        use_falloff: true,
        ..HeightMapSettings::default()
    });

    c.bench_function("height_map_149_with_falloff", |b| {
        b.iter(|| black_box(builder.build(149, 149, black_box(Vec2::ZERO))));
    });
}

criterion_group!(
    benches,
    benchmark_single_sample,
    benchmark_noise_field,
    benchmark_height_map
);
criterion_main!(benches);
