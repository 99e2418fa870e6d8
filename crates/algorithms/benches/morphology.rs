//! Benchmarks for morphology and the ground filter

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dsm2dtm_algorithms::morphology::{erode, opening, StructuringElement};
use dsm2dtm_algorithms::pipeline::{derive_terrain, ProcessingParameters};
use dsm2dtm_algorithms::terrain::ground_filter;
use dsm2dtm_core::{GeoTransform, Raster, CRS};

fn create_test_raster(size: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(440_000.0, 4_475_000.0, 1.0, -1.0));
    r.set_crs(Some(CRS::from_epsg(32630)));
    r.set_nodata(Some(-9999.0));
    // Varied surface with some structure
    for row in 0..size {
        for col in 0..size {
            let v = ((row * 7 + col * 13) % 256) as f64;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_erode(c: &mut Criterion) {
    let mut group = c.benchmark_group("morphology/erode");
    let se = StructuringElement::square(1);
    for size in [256, 512, 1024, 2048] {
        let raster = create_test_raster(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| erode(black_box(&raster), &se).unwrap())
        });
    }
    group.finish();
}

// Run time should stay flat as the window grows
fn bench_opening_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("morphology/opening_window");
    let raster = create_test_raster(1024);
    for window in [3usize, 11, 21, 51, 101] {
        let se = StructuringElement::from_window(window).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, _| {
            b.iter(|| opening(black_box(&raster), &se).unwrap())
        });
    }
    group.finish();
}

fn bench_ground_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain/ground_filter");
    for size in [512, 1024] {
        let mut raster = create_test_raster(size);
        for row in 0..size / 8 {
            raster.set(row, row, -9999.0).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| ground_filter(black_box(&raster), 21).unwrap())
        });
    }
    group.finish();
}

fn bench_downsampled_pipeline(c: &mut Criterion) {
    let raster = create_test_raster(2048);
    let params = ProcessingParameters {
        search_radius_meters: 10.0,
        max_pixels: 500_000,
    };
    c.bench_function("pipeline/derive_terrain_downsampled_2048", |b| {
        b.iter(|| derive_terrain(black_box(&raster), &params).unwrap())
    });
}

criterion_group!(
    benches,
    bench_erode,
    bench_opening_window,
    bench_ground_filter,
    bench_downsampled_pipeline,
);
criterion_main!(benches);
