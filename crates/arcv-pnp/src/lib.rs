#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # arcv PnP (Perspective-n-Point)
//!
//! Camera pose estimation from 2D-3D point correspondences under a full
//! pinhole plus distortion camera model.
//!
//! The pipeline undistorts the image points, picks a linear initialiser
//! (a plane homography for planar targets, EPnP otherwise) and refines the
//! result with Levenberg–Marquardt in pixel space.
//!
//! ## Example
//!
//! ```rust
//! use arcv_3d::{CameraIntrinsics, CameraModel, Pose};
//! use arcv_3d::projection::project_points;
//! use arcv_pnp::{solve_pnp, PnPMethod};
//!
//! let camera = CameraModel::pinhole(CameraIntrinsics::new(800.0, 800.0, 320.0, 240.0)?);
//! let truth = Pose::from_rvec_tvec(&[0.1, -0.1, 0.05], &[0.0, 0.0, 2.0]);
//!
//! let world = vec![
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//!     [0.0, 0.0, 1.0],
//!     [1.0, 1.0, 0.5],
//!     [0.5, -0.5, 0.2],
//! ];
//! let image = project_points(&world, &truth, &camera);
//!
//! let result = solve_pnp(&world, &image, &camera, PnPMethod::Auto)?;
//! assert!(result.reproj_rmse < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Efficient Perspective-n-Point (EPnP) solver implementation.
///
/// A fast and accurate method for computing camera pose from 2D-3D correspondences.
pub mod epnp;

/// Pose of square fiducial markers.
pub mod marker;

/// Homography-based solver for planar targets.
pub mod planar;

/// Levenberg–Marquardt refinement of a pose.
pub mod refine;

/// Common data types and traits for PnP solvers.
pub mod types;

mod ops;

pub use epnp::{EPnP, EPnPParams};
pub use marker::{solve_square_marker, square_object_points, DEFAULT_MARKER_LENGTH};
pub use planar::PlanarPnP;
pub use types::{NumericTol, PnPError, PnPResult, PnPSolver};

use arcv_3d::projection::reprojection_rmse;
use arcv_3d::{CameraModel, Pose};
use arcv_optim::TerminationReason;

/// Smallest-to-largest covariance eigenvalue ratio under which the world
/// points are treated as planar.
pub const PLANARITY_RATIO: f64 = 1e-10;

/// Enumeration of the Perspective-n-Point strategies available in this crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PnPMethod {
    /// Planar homography or EPnP picked from the point layout, then LM refinement.
    #[default]
    Auto,
    /// EPnP initialisation with user-supplied parameters, then LM refinement.
    EPnP(EPnPParams),
    /// Planar homography initialisation, then LM refinement.
    Planar,
    /// The automatically selected linear initialiser without refinement.
    Linear,
}

/// Solve for the pose mapping `world` points onto their `image` observations.
///
/// # Arguments
///
/// * `world` - 3D points in the world frame, at least 4.
/// * `image` - The matching pixel observations, distorted as seen by `camera`.
/// * `camera` - Intrinsics and distortion of the camera.
/// * `method` - Initialisation and refinement strategy.
///
/// # Errors
///
/// * [`PnPError::MismatchedArrayLengths`] and [`PnPError::InvalidInput`] for malformed input.
/// * [`PnPError::InsufficientCorrespondences`] for fewer than 4 points.
/// * [`PnPError::DegenerateGeometry`] or [`PnPError::Homography`] when the
///   points do not determine a pose, e.g. collinear or duplicated points.
pub fn solve_pnp(
    world: &[[f64; 3]],
    image: &[[f64; 2]],
    camera: &CameraModel,
    method: PnPMethod,
) -> Result<PnPResult, PnPError> {
    validate_correspondences(world, image)?;

    let normalized = camera.undistort_points(image);
    if normalized.iter().flatten().any(|v| !v.is_finite()) {
        return Err(PnPError::DegenerateGeometry(
            "image points cannot be undistorted".to_string(),
        ));
    }

    let (initial, refine) = match &method {
        PnPMethod::Auto => (solve_linear(world, &normalized)?, true),
        PnPMethod::EPnP(params) => (EPnP::solve(world, &normalized, params)?, true),
        PnPMethod::Planar => (PlanarPnP::solve(world, &normalized, &())?, true),
        PnPMethod::Linear => (solve_linear(world, &normalized)?, false),
    };

    let (pose, num_iterations, converged) = if refine {
        let (pose, summary) = refine::refine_pose(
            world,
            image,
            camera,
            &initial,
            &refine::default_pose_optimizer(),
        )?;
        // a step rejected at the damping limit means no further decrease is possible
        let converged = summary.termination_reason != TerminationReason::MaxIterations;
        (pose, summary.iterations, converged)
    } else {
        (initial, 0, true)
    };

    if pose.rotation.iter().chain(pose.translation.iter()).any(|v| !v.is_finite()) {
        return Err(PnPError::DegenerateGeometry(
            "pose is not finite".to_string(),
        ));
    }

    let reproj_rmse = reprojection_rmse(world, image, &pose, camera)
        .map_err(|e| PnPError::InvalidInput(e.to_string()))?;

    log::debug!(
        "PnP ({method:?}) solved {} points: rmse {reproj_rmse:.4} px after {num_iterations} iterations",
        world.len()
    );

    Ok(PnPResult {
        rvec: pose.rvec(),
        pose,
        reproj_rmse,
        num_iterations,
        converged,
    })
}

/// Linear initialiser chosen from the point layout.
fn solve_linear(world: &[[f64; 3]], normalized: &[[f64; 2]]) -> Result<Pose, PnPError> {
    if ops::principal_axes(world).is_planar(PLANARITY_RATIO) {
        PlanarPnP::solve(world, normalized, &())
    } else {
        EPnP::solve(world, normalized, &EPnPParams::default())
    }
}

fn validate_correspondences(world: &[[f64; 3]], image: &[[f64; 2]]) -> Result<(), PnPError> {
    if world.len() != image.len() {
        return Err(PnPError::MismatchedArrayLengths {
            left_name: "world points",
            left_len: world.len(),
            right_name: "image points",
            right_len: image.len(),
        });
    }
    if world.len() < 4 {
        return Err(PnPError::InsufficientCorrespondences {
            required: 4,
            actual: world.len(),
        });
    }
    if world.iter().flatten().chain(image.iter().flatten()).any(|v| !v.is_finite()) {
        return Err(PnPError::InvalidInput(
            "points must be finite".to_string(),
        ));
    }
    Ok(())
}
