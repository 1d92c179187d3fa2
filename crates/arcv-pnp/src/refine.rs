//! Levenberg–Marquardt pose refinement for PnP solutions.

use crate::types::PnPError;
use arcv_3d::projection::project_point;
use arcv_3d::{CameraModel, Pose};
use arcv_optim::{LeastSquaresProblem, LevenbergMarquardt, OptimizerResult, ProblemError};
use nalgebra::DVector;

/// Pixel reprojection residuals of a single pose, parameterized as
/// `x = [rx, ry, rz, tx, ty, tz]`.
struct PoseProblem<'a> {
    world: &'a [[f64; 3]],
    image: &'a [[f64; 2]],
    camera: &'a CameraModel,
}

impl LeastSquaresProblem for PoseProblem<'_> {
    fn num_residuals(&self) -> usize {
        2 * self.world.len()
    }

    fn residuals(&self, x: &DVector<f64>) -> Result<DVector<f64>, ProblemError> {
        if x.len() != 6 {
            return Err(ProblemError::DimensionMismatch {
                expected: 6,
                actual: x.len(),
            });
        }
        let pose = Pose::from_rvec_tvec(&[x[0], x[1], x[2]], &[x[3], x[4], x[5]]);

        let mut r = DVector::zeros(self.num_residuals());
        for (i, (pw, uv)) in self.world.iter().zip(self.image.iter()).enumerate() {
            let proj = project_point(pw, &pose, self.camera);
            r[2 * i] = proj[0] - uv[0];
            r[2 * i + 1] = proj[1] - uv[1];
        }
        Ok(r)
    }
}

/// Default optimizer settings for pose refinement.
pub fn default_pose_optimizer() -> LevenbergMarquardt {
    LevenbergMarquardt {
        max_iterations: 100,
        cost_tolerance: 1e-14,
        gradient_tolerance: 1e-14,
        step_tolerance: 1e-14,
        ..Default::default()
    }
}

/// Refine a pose with Levenberg–Marquardt to minimize the pixel reprojection
/// error under the full camera model, distortion included.
///
/// Returns the refined pose and the optimizer summary.
pub fn refine_pose(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    camera: &CameraModel,
    initial: &Pose,
    optimizer: &LevenbergMarquardt,
) -> Result<(Pose, OptimizerResult), PnPError> {
    if world.len() != image.len() {
        return Err(PnPError::MismatchedArrayLengths {
            left_name: "world points",
            left_len: world.len(),
            right_name: "image points",
            right_len: image.len(),
        });
    }
    if world.len() < 3 {
        return Err(PnPError::InsufficientCorrespondences {
            required: 3,
            actual: world.len(),
        });
    }

    let rvec = initial.rvec();
    let tvec = initial.tvec();
    let mut x = DVector::from_vec(vec![rvec[0], rvec[1], rvec[2], tvec[0], tvec[1], tvec[2]]);

    let problem = PoseProblem {
        world,
        image,
        camera,
    };
    let summary = optimizer.optimize(&problem, &mut x)?;

    let pose = Pose::from_rvec_tvec(&[x[0], x[1], x[2]], &[x[3], x[4], x[5]]);
    Ok((pose, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcv_3d::projection::{project_points, reprojection_rmse};
    use arcv_3d::{CameraIntrinsics, DistortionCoefficients};
    use approx::assert_relative_eq;

    #[test]
    fn test_refine_recovers_perturbed_pose() -> Result<(), Box<dyn std::error::Error>> {
        let camera = CameraModel::new(
            CameraIntrinsics::new(800.0, 800.0, 640.0, 480.0)?,
            DistortionCoefficients::new(vec![-0.2, 0.05, 0.001, -0.001])?,
        )?;
        let truth = Pose::from_rvec_tvec(&[0.1, -0.2, 0.05], &[0.05, -0.1, 2.0]);
        let world = [
            [0.0, 0.0, 0.0],
            [0.3, 0.0, 0.1],
            [0.0, 0.3, -0.1],
            [0.3, 0.3, 0.0],
            [-0.2, 0.1, 0.2],
            [0.1, -0.25, 0.05],
        ];
        let image = project_points(&world, &truth, &camera);

        let initial = Pose::from_rvec_tvec(&[0.12, -0.18, 0.04], &[0.0, -0.05, 2.2]);
        let rmse0 = reprojection_rmse(&world, &image, &initial, &camera)?;

        let (pose, summary) =
            refine_pose(&world, &image, &camera, &initial, &default_pose_optimizer())?;
        let rmse1 = reprojection_rmse(&world, &image, &pose, &camera)?;

        assert!(rmse1 < rmse0);
        assert!(rmse1 < 1e-6, "rmse {rmse1}");
        assert!(summary.final_cost <= summary.initial_cost);
        assert!(pose.rotation_angle_to(&truth) < 1e-6);
        assert_relative_eq!(pose.translation, truth.translation, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_refine_requires_points() -> Result<(), Box<dyn std::error::Error>> {
        let camera = CameraModel::pinhole(CameraIntrinsics::new(800.0, 800.0, 640.0, 480.0)?);
        let res = refine_pose(
            &[[0.0; 3]; 2],
            &[[0.0; 2]; 2],
            &camera,
            &Pose::identity(),
            &default_pose_optimizer(),
        );
        assert_eq!(
            res.unwrap_err(),
            PnPError::InsufficientCorrespondences {
                required: 3,
                actual: 2
            }
        );
        Ok(())
    }
}
