use criterion::{black_box, criterion_group, criterion_main, Criterion};
use grism::{
    DisperseConfig, DispersionEngine, EngineConfig, GrismParams, PixelResponseBuilder,
    ResponseTable,
};
use ndarray::{Array2, Array3};
use shared::image_size::{CubeShape, PixelShape};

fn make_config(nlam: usize) -> DisperseConfig {
    DisperseConfig::imaging(
        CubeShape::new(nlam, 64, 64),
        0.05,
        PixelShape::new(256, 128),
        0.1,
        240.0,
        600.0,
        1.0,
    )
    .with_grism(GrismParams::new(200.0, 0.1, -264.0))
}

fn make_tables(nlam: usize) -> (Array2<f64>, Array2<f64>) {
    let lambdas = Array2::from_shape_fn((nlam, 2), |(i, j)| 620.0 + 2.0 * (i + j) as f64);
    let bandpasses = Array2::from_elem((nlam, 2), 0.8);
    (lambdas, bandpasses)
}

fn make_table(nlam: usize) -> ResponseTable {
    let config = make_config(nlam);
    let (lambdas, bandpasses) = make_tables(nlam);
    PixelResponseBuilder::new(&config)
        .and_then(|b| b.build(lambdas.view(), bandpasses.view()))
        .unwrap()
}

fn bench_build_table(c: &mut Criterion) {
    let config = make_config(40);
    let (lambdas, bandpasses) = make_tables(40);

    c.bench_function("build_table_40x64x64", |b| {
        b.iter(|| {
            PixelResponseBuilder::new(black_box(&config))
                .and_then(|builder| builder.build(lambdas.view(), bandpasses.view()))
                .unwrap()
        })
    });
}

fn bench_disperse(c: &mut Criterion) {
    let table = make_table(40);
    let cube = Array3::from_shape_fn((40, 64, 64), |(l, y, x)| {
        1.0 + 0.01 * l as f64 + ((x + y) % 5) as f64
    });

    let mut group = c.benchmark_group("disperse");
    for threads in [1, 2, 4, 8] {
        let engine = DispersionEngine::new(EngineConfig::new(threads)).unwrap();
        let mut out = Array2::zeros(table.image_shape().dim());
        group.bench_function(format!("{threads}_threads_40x64x64"), |b| {
            b.iter(|| {
                engine
                    .disperse_into(black_box(&table), black_box(cube.view()), out.view_mut())
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_table, bench_disperse);
criterion_main!(benches);
