use argh::FromArgs;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

use arcv::ar::{
    BoardTracker, LineRenderer, MarkerDetector, MarkerObservation, PlanarCompositor,
    SourceSequence,
};
use arcv::calib::{io, BoardSize, CalibrationAccumulator, CalibrationConfig};
use arcv::image::Image;
use arcv::imgproc::color::gray_from_rgb;
use arcv::imgproc::concat_horizontal;
use arcv::imgproc::features::{harris_corners, HarrisParams, DEFAULT_HARRIS_THRESHOLD};
use arcv::pnp::square_object_points;
use arcv::threed::projection::project_points;
use arcv::threed::{CameraIntrinsics, CameraModel, DistortionCoefficients, Pose};

#[derive(FromArgs)]
/// Calibrate a simulated camera, then composite and track on a synthetic frame
struct Args {
    /// number of simulated calibration views
    #[argh(option, default = "8")]
    views: usize,

    /// standard deviation of the corner noise in pixels
    #[argh(option, default = "0.1")]
    noise: f64,

    /// seed of the random generator
    #[argh(option, default = "0")]
    seed: u64,

    /// where to write the calibration file
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,
}

const IMAGE_SIZE: [usize; 2] = [640, 480];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let truth = CameraModel::new(
        CameraIntrinsics::new(810.0, 790.0, 318.0, 242.0)?,
        DistortionCoefficients::new(vec![-0.15, 0.05, 0.0008, -0.0004, 0.0])?,
    )?;

    // simulate a 9x6 board seen from random tilts
    let board = BoardSize::new(9, 6);
    let world = board.world_points(1.0);
    let mut accumulator = CalibrationAccumulator::new(board, Default::default())?;
    for _ in 0..args.views {
        let rvec = [
            rng.random_range(-0.4..0.4),
            rng.random_range(-0.4..0.4),
            rng.random_range(-0.2..0.2),
        ];
        let tvec = [-4.0, 2.5, rng.random_range(14.0..20.0)];
        let pose = Pose::from_rvec_tvec(&rvec, &tvec);
        let points: Vec<[f64; 2]> = project_points(&world, &pose, &truth)
            .into_iter()
            .map(|[u, v]| {
                [
                    u + args.noise * gaussian(&mut rng),
                    v + args.noise * gaussian(&mut rng),
                ]
            })
            .collect();
        if let Err(e) = accumulator.add_points(&points) {
            log::warn!("view rejected: {e}");
        }
    }

    let result = accumulator.calibrate(IMAGE_SIZE.into(), &CalibrationConfig::default())?;
    println!("{result}");
    if let Some(warning) = result.quality_warning {
        println!(
            "the error {:.3} px exceeds {:.3} px, recalibrate with better views",
            warning.rms, warning.threshold
        );
    }
    if let Some(path) = &args.output {
        io::write_calibration(path, &result.intrinsics, &result.distortion)?;
        println!("calibration written to {}", path.display());
    }
    let camera = result.camera_model();

    // four markers at the corners of a wall poster, seen by the true camera
    let wall = Pose::from_rvec_tvec(&[0.15, -0.25, 0.05], &[0.0, 0.0, 1.2]);
    let poster: Vec<MarkerObservation> = [
        (12, [-0.3, -0.2]),
        (22, [0.3, -0.2]),
        (32, [0.3, 0.2]),
        (42, [-0.3, 0.2]),
    ]
    .into_iter()
    .map(|(id, [cx, cy])| {
        let object = square_object_points(0.05).map(|p| [p[0] + cx, cy - p[1], 0.0]);
        let uv = project_points(&object, &wall, &truth);
        MarkerObservation {
            id,
            corners: [uv[0], uv[1], uv[2], uv[3]],
        }
    })
    .collect();

    let frame = Image::<u8, 3>::from_size_val(IMAGE_SIZE.into(), 40)?;
    let observations = KnownMarkers(poster).detect(&frame);
    let sources = [90u8, 160, 230]
        .into_iter()
        .map(|v| Image::<u8, 3>::from_size_val([160, 120].into(), v))
        .collect::<Result<Vec<_>, _>>()?;
    let mut sequence = SourceSequence::new(sources)?;

    let compositor = PlanarCompositor::default();
    let mut annotated = frame.clone();
    let mut renderer = LineRenderer::default();
    for obs in &observations {
        renderer.draw_quad(&mut annotated, &obs.corners, [0, 255, 0]);
    }
    for marker in arcv::ar::marker_poses(&observations, 0.05, &camera) {
        println!(
            "marker {}: t = {:?}, rmse {:.4} px",
            marker.id,
            marker.pose.tvec(),
            marker.reproj_rmse
        );
    }

    for i in 0..3 {
        let composited = compositor.apply(&frame, sequence.next_frame(), &observations);
        let side_by_side = concat_horizontal(&annotated, &composited)?;
        let changed = composited
            .as_slice()
            .iter()
            .zip(frame.as_slice())
            .filter(|(a, b)| a != b)
            .count()
            / 3;
        println!(
            "frame {i}: {changed} pixels composited, debug view {}",
            side_by_side.size()
        );
    }

    // track the board in a new view and draw the overlays
    let tracker = BoardTracker::new(camera, board);
    let pose = Pose::from_rvec_tvec(&[0.3, -0.2, 0.1], &[-4.0, 2.5, 17.0]);
    let corners = project_points(&world, &pose, &truth);
    let overlay = tracker.process(&corners)?;
    let mut ar_frame = frame.clone();
    overlay.draw(&mut ar_frame, &mut renderer);
    println!(
        "board pose: rvec {:?}, tvec {:?}, rmse {:.4} px",
        overlay.pose.rvec(),
        overlay.pose.tvec(),
        overlay.reproj_rmse
    );

    // strong corners of the rendered overlay
    let rgb = ar_frame.cast_and_scale::<f32>(1.0 / 255.0)?;
    let mut gray = Image::<f32, 1>::from_size_val(rgb.size(), 0.0)?;
    gray_from_rgb(&rgb, &mut gray)?;
    let corners = harris_corners(&gray, &HarrisParams::default(), DEFAULT_HARRIS_THRESHOLD)?;
    println!("{} harris corners on the overlay frame", corners.len());

    Ok(())
}

// stands in for a fiducial detector, reporting markers rendered offline
struct KnownMarkers(Vec<MarkerObservation>);

impl MarkerDetector for KnownMarkers {
    fn detect(&self, _frame: &Image<u8, 3>) -> Vec<MarkerObservation> {
        self.0.clone()
    }
}

// Box-Muller
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
