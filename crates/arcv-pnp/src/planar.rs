//! Homography-based pose for planar targets.
//!
//! The world points are expressed in the 2D frame of their best-fit plane, a
//! plane-to-image homography is estimated with the normalized DLT, and the
//! homography is decomposed into a rotation and a translation.

use crate::ops::principal_axes;
use crate::types::{PnPError, PnPSolver};
use arcv_3d::homography::find_homography;
use arcv_3d::pose::orthonormalize;
use arcv_3d::Pose;
use nalgebra::{Matrix3, Vector3};

/// Marker type for the planar homography solver.
pub struct PlanarPnP;

impl PnPSolver for PlanarPnP {
    type Param = ();

    fn solve(world: &[[f64; 3]], normalized: &[[f64; 2]], _params: &()) -> Result<Pose, PnPError> {
        solve_planar(world, normalized)
    }
}

/// Estimate the pose of a planar point set from normalized image coordinates.
///
/// The points do not need to lie on `z = 0`; any plane works. Collinear or
/// duplicated points are rejected by the homography estimation.
pub fn solve_planar(world: &[[f64; 3]], normalized: &[[f64; 2]]) -> Result<Pose, PnPError> {
    if world.len() != normalized.len() {
        return Err(PnPError::MismatchedArrayLengths {
            left_name: "world points",
            left_len: world.len(),
            right_name: "image points",
            right_len: normalized.len(),
        });
    }
    if world.len() < 4 {
        return Err(PnPError::InsufficientCorrespondences {
            required: 4,
            actual: world.len(),
        });
    }

    let axes = principal_axes(world);
    if axes.eigenvalues[0] <= f64::EPSILON {
        return Err(PnPError::DegenerateGeometry(
            "world points coincide".to_string(),
        ));
    }

    // world -> plane frame: q = Bᵀ (p - c)
    let basis = axes.axes;
    let plane: Vec<[f64; 2]> = world
        .iter()
        .map(|p| {
            let q = basis.transpose() * (Vector3::from(*p) - axes.centroid);
            [q.x, q.y]
        })
        .collect();

    let h = find_homography(&plane, normalized)?;
    let (r_plane, t_plane) = decompose_h_normalized(&h)?;

    // p_cam = R_plane Bᵀ (p - c) + t_plane
    let rotation = r_plane * basis.transpose();
    let translation = t_plane - rotation * axes.centroid;

    Ok(Pose::new(rotation, translation))
}

/// Decompose a plane-to-normalized-image homography `H ∝ [r1 r2 t]`.
///
/// The scale is chosen from the mean norm of the first two columns and its
/// sign so that the plane origin lies in front of the camera. The rotation is
/// projected onto SO(3).
fn decompose_h_normalized(h: &Matrix3<f64>) -> Result<(Matrix3<f64>, Vector3<f64>), PnPError> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let norm = (h1.norm() * h2.norm()).sqrt();
    if norm <= f64::EPSILON {
        return Err(PnPError::DegenerateGeometry(
            "homography has a null column".to_string(),
        ));
    }

    let mut s = 1.0 / norm;
    if h3.z * s < 0.0 {
        s = -s;
    }

    let r1 = h1 * s;
    let r2 = h2 * s;
    let r3 = r1.cross(&r2);
    let t = h3 * s;

    let r = orthonormalize(&Matrix3::from_columns(&[r1, r2, r3]))
        .ok_or_else(|| PnPError::SvdFailed("rotation orthonormalization".to_string()))?;

    Ok((r, t))
}
