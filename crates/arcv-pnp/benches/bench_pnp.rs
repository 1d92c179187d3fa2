use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use arcv_3d::projection::project_points;
use arcv_3d::{CameraIntrinsics, CameraModel, DistortionCoefficients, Pose};
use arcv_pnp::{solve_pnp, PnPMethod};
use rand::{rngs::StdRng, Rng, SeedableRng};

type PnpDataset = (Vec<[f64; 3]>, Vec<[f64; 2]>, CameraModel);

fn generate_cube_dataset_with_seed(num_points: usize, noise_px: f64, seed: u64) -> PnpDataset {
    let camera = CameraModel {
        intrinsics: CameraIntrinsics {
            fx: 800.0,
            fy: 800.0,
            cx: 640.0,
            cy: 480.0,
        },
        distortion: DistortionCoefficients::none(),
    };

    // points in a 1m cube around z in [3,6]
    let mut rng = StdRng::seed_from_u64(seed);
    let world: Vec<[f64; 3]> = (0..num_points)
        .map(|_| {
            [
                rng.random_range(-0.5..0.5),
                rng.random_range(-0.5..0.5),
                rng.random_range(3.0..6.0),
            ]
        })
        .collect();

    let pose = Pose::from_rvec_tvec(&[0.05, 0.26, 0.11], &[0.2, -0.1, 0.3]);
    let image = project_points(&world, &pose, &camera)
        .into_iter()
        .map(|[u, v]| {
            [
                u + rng.random_range(-noise_px..noise_px),
                v + rng.random_range(-noise_px..noise_px),
            ]
        })
        .collect();

    (world, image, camera)
}

fn bench_pnp(c: &mut Criterion) {
    let mut group = c.benchmark_group("pnp");
    for &n in &[8usize, 32, 128, 512] {
        let (world, image, camera) = generate_cube_dataset_with_seed(n, 0.5, 42);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("linear", n), &n, |b, _| {
            b.iter(|| {
                let res = solve_pnp(&world, &image, &camera, PnPMethod::Linear);
                std::hint::black_box(res)
            });
        });

        group.bench_with_input(BenchmarkId::new("refined", n), &n, |b, _| {
            b.iter(|| {
                let res = solve_pnp(&world, &image, &camera, PnPMethod::Auto);
                std::hint::black_box(res)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pnp);
criterion_main!(benches);
