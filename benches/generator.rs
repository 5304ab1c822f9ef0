use criterion::{black_box, criterion_group, criterion_main, Criterion};
use terragen::{Generator, HeightMap, NoiseConfig, NoiseGenerator};

fn noisy_map(size: usize) -> HeightMap {
    HeightMap::from_noise(size, &NoiseGenerator::new(&NoiseConfig::with_seed(7)), 20.0, 15.0)
}

fn bench_run_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("Generator");
    group.sample_size(10);

    let scripts = [
        ("island", include_str!("../templates/island.agents")),
        ("archipelago", include_str!("../templates/archipelago.agents")),
    ];
    for (name, script) in scripts {
        group.bench_function(format!("run_all_{}_128", name), |b| {
            let mut generator = Generator::new(HeightMap::new(128));
            generator.load_str(script);
            b.iter(|| {
                generator.reset();
                generator.run_all();
                black_box(generator.tick_count());
            });
        });
    }

    group.finish();
}

fn bench_grid_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("HeightMap");

    for &size in &[128, 512] {
        group.bench_function(format!("smooth_all_{}", size), |b| {
            let mut map = noisy_map(size);
            b.iter(|| {
                map.smooth_all();
                black_box(map.get(0, 0));
            });
        });

        group.bench_function(format!("compute_normals_{}", size), |b| {
            let mut map = noisy_map(size);
            b.iter(|| {
                map.compute_normals();
                black_box(map.normals()[0]);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_run_all, bench_grid_passes);
criterion_main!(benches);
