use approx::assert_relative_eq;
use arcv_3d::projection::project_points;
use arcv_3d::{CameraIntrinsics, CameraModel, DistortionCoefficients, ErrorKind, Pose};
use arcv_pnp::{solve_pnp, EPnPParams, PnPError, PnPMethod};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_camera(rng: &mut StdRng) -> Result<CameraModel, Box<dyn std::error::Error>> {
    let intrinsics = CameraIntrinsics::new(
        rng.random_range(400.0..1000.0),
        rng.random_range(400.0..1000.0),
        rng.random_range(280.0..360.0),
        rng.random_range(200.0..280.0),
    )?;
    let distortion = DistortionCoefficients::new(vec![
        rng.random_range(-0.15..0.15),
        rng.random_range(-0.03..0.03),
        rng.random_range(-1e-3..1e-3),
        rng.random_range(-1e-3..1e-3),
        rng.random_range(-5e-3..5e-3),
    ])?;
    Ok(CameraModel::new(intrinsics, distortion)?)
}

fn random_pose(rng: &mut StdRng) -> Pose {
    Pose::from_rvec_tvec(
        &[
            rng.random_range(-0.6..0.6),
            rng.random_range(-0.6..0.6),
            rng.random_range(-0.6..0.6),
        ],
        &[
            rng.random_range(-0.5..0.5),
            rng.random_range(-0.5..0.5),
            rng.random_range(5.0..8.0),
        ],
    )
}

fn assert_pose_close(estimated: &Pose, truth: &Pose) {
    let angle = estimated.rotation_angle_to(truth);
    assert!(angle < 1e-3, "rotation error {angle} rad");
    let rel = (estimated.translation - truth.translation).norm() / truth.translation.norm();
    assert!(rel < 1e-3, "relative translation error {rel}");
}

#[test]
fn pnp_recovers_random_poses() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..20 {
        let camera = random_camera(&mut rng)?;
        let truth = random_pose(&mut rng);

        let n = rng.random_range(6..20);
        let world: Vec<[f64; 3]> = (0..n)
            .map(|_| {
                [
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                ]
            })
            .collect();
        let image = project_points(&world, &truth, &camera);

        let result = solve_pnp(&world, &image, &camera, PnPMethod::Auto)?;
        assert_pose_close(&result.pose, &truth);
        assert!(result.reproj_rmse < 1e-6, "rmse {}", result.reproj_rmse);
        assert_eq!(result.rvec, result.pose.rvec());
    }
    Ok(())
}

#[test]
fn pnp_recovers_random_planar_poses() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..20 {
        let camera = random_camera(&mut rng)?;
        let truth = random_pose(&mut rng);

        let world: Vec<[f64; 3]> = (0..rng.random_range(6..20))
            .map(|_| [rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0), 0.0])
            .collect();
        let image = project_points(&world, &truth, &camera);

        let result = solve_pnp(&world, &image, &camera, PnPMethod::Auto)?;
        assert_pose_close(&result.pose, &truth);
    }
    Ok(())
}

#[test]
fn pnp_explicit_methods_agree() -> Result<(), Box<dyn std::error::Error>> {
    let camera = CameraModel::pinhole(CameraIntrinsics::new(800.0, 800.0, 640.0, 480.0)?);
    let truth = Pose::from_rvec_tvec(&[0.2, 0.1, -0.1], &[0.1, 0.0, 3.0]);
    let world = [
        [0.0, 0.0, 0.0],
        [0.5, 0.0, 0.1],
        [0.0, 0.5, -0.2],
        [0.5, 0.5, 0.3],
        [-0.3, 0.2, 0.0],
        [0.2, -0.4, -0.1],
        [-0.1, -0.1, 0.4],
    ];
    let image = project_points(&world, &truth, &camera);

    let epnp = solve_pnp(
        &world,
        &image,
        &camera,
        PnPMethod::EPnP(EPnPParams::default()),
    )?;
    let linear = solve_pnp(&world, &image, &camera, PnPMethod::Linear)?;

    assert_pose_close(&epnp.pose, &truth);
    assert_pose_close(&linear.pose, &truth);
    assert_eq!(linear.num_iterations, 0);
    assert!(linear.converged);
    Ok(())
}

#[test]
fn pnp_six_point_reference() -> Result<(), Box<dyn std::error::Error>> {
    // projections of the pose rvec (0.3, -0.2, 0.1), t (0.05, -0.04, 1.0)
    let world = [
        [0.0315, 0.03333, -0.10409],
        [-0.0315, 0.03333, -0.10409],
        [0.0, -0.00102, -0.12977],
        [0.02646, -0.03167, -0.1053],
        [-0.02646, -0.031667, -0.1053],
        [0.0, 0.04515, -0.11033],
    ];
    let image = [
        [722.96466, 502.0828],
        [669.88837, 498.61877],
        [707.0025, 478.48975],
        [728.05634, 447.56918],
        [682.6069, 443.91776],
        [696.4414, 511.96442],
    ];
    let camera = CameraModel::pinhole(CameraIntrinsics::from_matrix(&[
        [800.0, 0.0, 640.0],
        [0.0, 800.0, 480.0],
        [0.0, 0.0, 1.0],
    ])?);

    let result = solve_pnp(&world, &image, &camera, PnPMethod::default())?;
    assert!(result.reproj_rmse < 1e-3);
    let expected_rvec = [0.3, -0.2, 0.1];
    let expected_t = [0.05, -0.04, 1.0];
    for k in 0..3 {
        assert_relative_eq!(result.rvec[k], expected_rvec[k], epsilon = 1e-4);
        assert_relative_eq!(result.pose.translation[k], expected_t[k], epsilon = 1e-4);
    }
    Ok(())
}

#[test]
fn pnp_input_errors() -> Result<(), Box<dyn std::error::Error>> {
    let camera = CameraModel::pinhole(CameraIntrinsics::new(800.0, 800.0, 320.0, 240.0)?);

    let err = solve_pnp(&[[0.0; 3]; 3], &[[0.0; 2]; 3], &camera, PnPMethod::Auto).unwrap_err();
    assert_eq!(
        err,
        PnPError::InsufficientCorrespondences {
            required: 4,
            actual: 3
        }
    );
    assert_eq!(err.kind(), ErrorKind::InsufficientData);

    let err = solve_pnp(&[[0.0; 3]; 5], &[[0.0; 2]; 4], &camera, PnPMethod::Auto).unwrap_err();
    assert!(matches!(err, PnPError::MismatchedArrayLengths { .. }));
    assert_eq!(err.kind(), ErrorKind::Input);

    let mut world = [[0.0, 0.0, 1.0]; 4];
    world[2][1] = f64::NAN;
    let err = solve_pnp(&world, &[[0.0; 2]; 4], &camera, PnPMethod::Auto).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    Ok(())
}

#[test]
fn pnp_collinear_is_degenerate() -> Result<(), Box<dyn std::error::Error>> {
    let camera = CameraModel::pinhole(CameraIntrinsics::new(800.0, 800.0, 320.0, 240.0)?);
    let world: Vec<[f64; 3]> = (0..6).map(|i| [i as f64 * 0.1, 0.0, 0.0]).collect();
    let truth = Pose::from_rvec_tvec(&[0.1, 0.2, 0.0], &[0.0, 0.0, 2.0]);
    let image = project_points(&world, &truth, &camera);

    let err = solve_pnp(&world, &image, &camera, PnPMethod::Auto).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateGeometry);

    let duplicated = [[0.1, 0.2, 0.3]; 4];
    let err = solve_pnp(&duplicated, &[[320.0, 240.0]; 4], &camera, PnPMethod::Auto).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateGeometry);
    Ok(())
}
