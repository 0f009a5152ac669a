use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tenchi::terrain::{
    smooth, DisplacementGenerator, DisplacementParameters, ErosionKind, ErosionParameters,
    ErosionSimulator, Heightfield, NoiseParameters, NoiseSynthesizer, Progress, SplatClassifier,
    SplatLayer, TerrainRng, TerrainSize,
};

fn noisy_field(resolution: usize) -> Heightfield {
    let mut field = Heightfield::new(resolution, TerrainSize::default()).unwrap();
    NoiseSynthesizer::new(1)
        .apply(&mut field, &NoiseParameters::default())
        .unwrap();
    field
}

fn bench_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("Heightfield Synthesis");

    for &r in &[129, 257, 513] {
        group.bench_function(format!("fbm_{}", r), |b| {
            let synth = NoiseSynthesizer::new(7);
            let params = NoiseParameters::default();
            b.iter(|| {
                let mut field = Heightfield::new(r, TerrainSize::default()).unwrap();
                synth.apply(&mut field, &params).unwrap();
                black_box(field);
            });
        });

        group.bench_function(format!("diamond_square_{}", r), |b| {
            let params = DisplacementParameters::default();
            b.iter(|| {
                let mut field = Heightfield::new(r, TerrainSize::default()).unwrap();
                DisplacementGenerator::apply(&mut field, &params, &mut TerrainRng::seeded(3)).unwrap();
                black_box(field);
            });
        });
    }

    group.finish();
}

fn bench_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("Terrain Passes");

    for &r in &[129, 257] {
        let field = noisy_field(r);

        group.bench_function(format!("smooth_{}", r), |b| {
            b.iter(|| {
                let mut f = field.clone();
                black_box(smooth(&mut f, 1, &Progress::new()));
            });
        });

        for kind in [ErosionKind::Thermal, ErosionKind::River, ErosionKind::Wind] {
            let params = ErosionParameters {
                kind,
                iterations: 1,
                post_smooth_iterations: 0,
                ..Default::default()
            };
            group.bench_function(format!("erosion_{:?}_{}", kind, r), |b| {
                let simulator = ErosionSimulator::default();
                b.iter(|| {
                    let mut f = field.clone();
                    let mut rng = TerrainRng::seeded(5);
                    black_box(simulator.erode(&mut f, &params, &mut rng, &Progress::new()).unwrap());
                });
            });
        }

        group.bench_function(format!("splat_{}", r), |b| {
            let layers = [SplatLayer::default(), SplatLayer { max_slope: 45.0, ..Default::default() }];
            let classifier = SplatClassifier::default();
            b.iter(|| black_box(classifier.classify(&field, &layers, &Progress::new()).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_synthesis, bench_passes);
criterion_main!(benches);
