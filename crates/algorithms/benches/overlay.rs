//! Benchmarks for reclassification and hotspot density

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use culexmap_algorithms::density::{kernel_density, KdeParams, SamplePoint};
use culexmap_algorithms::overlay::{reclassify, ReclassTable};
use culexmap_core::{GeoTransform, Raster, Window};

fn create_landcover(size: usize) -> Raster<f64> {
    let codes = [2.0, 42.0, 51.0, 111.0, 118.0, 125.0];
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    for row in 0..size {
        for col in 0..size {
            r.set(row, col, codes[(row * 7 + col * 13) % codes.len()]).unwrap();
        }
    }
    r
}

fn bench_reclassify(c: &mut Criterion) {
    let table = ReclassTable::new((0..130).map(|v| (v as f64, v as f64 + 1.0, (v % 10) as f64)));
    let mut group = c.benchmark_group("overlay/reclassify");
    for size in [256, 512, 1024] {
        let lc = create_landcover(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| reclassify(black_box(&lc), black_box(&table), -9999.0).unwrap())
        });
    }
    group.finish();
}

fn bench_kde(c: &mut Criterion) {
    let window = Window::new(0.0, 5000.0, 0.0, 5000.0, None).unwrap();
    let params = KdeParams::default();
    let mut group = c.benchmark_group("density/kde");
    group.sample_size(10);
    for n in [100, 1000, 5000] {
        let points: Vec<SamplePoint> = (0..n)
            .map(|i| SamplePoint::new(((i * 37) % 5000) as f64, ((i * 91) % 5000) as f64, 1.0))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| kernel_density(black_box(&points), &params, &window).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reclassify, bench_kde);
criterion_main!(benches);
