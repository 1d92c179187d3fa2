use thiserror::Error;

use crate::camera::CameraModel;
use crate::error::ErrorKind;
use crate::pose::Pose;

/// Errors raised when comparing projections against observations.
#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    /// World and image arrays have different lengths.
    #[error("Mismatched array lengths: world points ({world}) != image points ({image})")]
    MismatchedLengths {
        /// Number of world points
        world: usize,
        /// Number of image points
        image: usize,
    },

    /// No points were given.
    #[error("Cannot compute a reprojection error over zero points")]
    EmptyInput,
}

impl ProjectionError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Input
    }
}

/// Project a single world point to pixel coordinates.
///
/// The point is moved into the camera frame, perspective-divided, distorted
/// and finally mapped through the intrinsics. Points on the camera plane
/// (`z = 0`) produce non-finite coordinates.
pub fn project_point(world: &[f64; 3], pose: &Pose, camera: &CameraModel) -> [f64; 2] {
    let [xc, yc, zc] = pose.transform_point(world);
    let inv_z = 1.0 / zc;
    camera.normalized_to_pixel(&[xc * inv_z, yc * inv_z])
}

/// Project world points to pixel coordinates.
///
/// The output has the same length and order as the input.
///
/// # Example
///
/// ```
/// use arcv_3d::camera::{CameraIntrinsics, CameraModel};
/// use arcv_3d::projection::project_points;
/// use arcv_3d::Pose;
///
/// let camera = CameraModel::pinhole(CameraIntrinsics::new(1.0, 1.0, 0.0, 0.0)?);
/// let uv = project_points(&[[0.0, 0.0, 1.0]], &Pose::identity(), &camera);
/// assert_eq!(uv, vec![[0.0, 0.0]]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn project_points(world: &[[f64; 3]], pose: &Pose, camera: &CameraModel) -> Vec<[f64; 2]> {
    world
        .iter()
        .map(|p| project_point(p, pose, camera))
        .collect()
}

/// Per-point Euclidean reprojection error in pixels.
pub fn reprojection_errors(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    pose: &Pose,
    camera: &CameraModel,
) -> Result<Vec<f64>, ProjectionError> {
    if world.len() != image.len() {
        return Err(ProjectionError::MismatchedLengths {
            world: world.len(),
            image: image.len(),
        });
    }

    Ok(world
        .iter()
        .zip(image.iter())
        .map(|(pw, uv)| {
            let proj = project_point(pw, pose, camera);
            let du = proj[0] - uv[0];
            let dv = proj[1] - uv[1];
            du.hypot(dv)
        })
        .collect())
}

/// Root-mean-square reprojection error in pixels.
pub fn reprojection_rmse(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    pose: &Pose,
    camera: &CameraModel,
) -> Result<f64, ProjectionError> {
    let errors = reprojection_errors(world, image, pose, camera)?;
    if errors.is_empty() {
        return Err(ProjectionError::EmptyInput);
    }
    let sum_sq: f64 = errors.iter().map(|e| e * e).sum();
    Ok((sum_sq / errors.len() as f64).sqrt())
}
