use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use arcv_ar::{MarkerObservation, PlanarCompositor};
use arcv_image::Image;

fn markers(width: f64, height: f64) -> Vec<MarkerObservation> {
    let square = |id, x: f64, y: f64| MarkerObservation {
        id,
        corners: [[x, y], [x + 20.0, y], [x + 20.0, y + 20.0], [x, y + 20.0]],
    };
    vec![
        square(12, 0.1 * width, 0.12 * height),
        square(22, 0.85 * width, 0.1 * height),
        square(32, 0.88 * width, 0.8 * height),
        square(42, 0.12 * width, 0.85 * height),
    ]
}

fn bench_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("PlanarComposite");
    let compositor = PlanarCompositor::default();
    let source = Image::<u8, 3>::from_size_val([320, 240].into(), 128).unwrap();

    for (width, height) in [(640, 480), (1280, 720)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let frame = Image::<u8, 3>::from_size_val([*width, *height].into(), 0).unwrap();
        let observations = markers(*width as f64, *height as f64);

        group.bench_with_input(
            BenchmarkId::new("composite", format!("{width}x{height}")),
            &(&frame, &observations),
            |b, i| {
                let (frame, observations) = *i;
                b.iter(|| {
                    compositor.composite(
                        black_box(frame),
                        black_box(&source),
                        black_box(observations.as_slice()),
                    )
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_composite);
criterion_main!(benches);
