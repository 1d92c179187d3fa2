//! Closed-form intrinsic initialisation from plane homographies.
//!
//! With the principal point fixed at the image centre and zero skew, every
//! homography `H = K [r1 r2 t]` yields two linear constraints on
//! `(1 / fx², 1 / fy²)`: the images of two orthogonal directions in the
//! target plane stay orthogonal once `K` is removed. Using both the plane axes
//! and their diagonals makes each view contribute two equations.

use arcv_3d::{find_homography, CameraIntrinsics};
use arcv_image::ImageSize;
use nalgebra::{Matrix2, Vector2, Vector3};

use crate::accumulator::CalibrationView;
use crate::error::CalibError;

/// Relative determinant of the normal equations below which the focal lengths
/// are unobservable.
const RANK_TOLERANCE: f64 = 1e-9;

/// Estimate pinhole intrinsics from planar views, ignoring distortion.
///
/// The principal point is placed at `((w - 1) / 2, (h - 1) / 2)`.
///
/// # Errors
///
/// * [`CalibError::Homography`] if a view's homography cannot be estimated.
/// * [`CalibError::DegenerateGeometry`] if the views do not constrain the focal
///   lengths, e.g. when every view faces the camera squarely.
pub fn init_intrinsics(
    views: &[CalibrationView],
    image_size: ImageSize,
) -> Result<CameraIntrinsics, CalibError> {
    let cx = (image_size.width as f64 - 1.0) * 0.5;
    let cy = (image_size.height as f64 - 1.0) * 0.5;

    // normal equations of the stacked 2V x 2 system
    let mut ata = Matrix2::<f64>::zeros();
    let mut atb = Vector2::<f64>::zeros();

    for view in views {
        let plane: Vec<[f64; 2]> = view.world_points().iter().map(|p| [p[0], p[1]]).collect();
        let mut h = find_homography(&plane, view.image_points())?;

        // move the principal point to the origin
        for c in 0..3 {
            h[(0, c)] -= h[(2, c)] * cx;
            h[(1, c)] -= h[(2, c)] * cy;
        }

        let col0 = Vector3::new(h[(0, 0)], h[(1, 0)], h[(2, 0)]);
        let col1 = Vector3::new(h[(0, 1)], h[(1, 1)], h[(2, 1)]);
        let d1 = (col0 + col1) * 0.5;
        let d2 = (col0 - col1) * 0.5;

        let pairs = [(col0, col1), (d1, d2)];
        for (a, b) in pairs {
            let (na, nb) = (a.norm(), b.norm());
            if na < f64::EPSILON || nb < f64::EPSILON {
                return Err(CalibError::DegenerateGeometry(
                    "homography has a vanishing column".to_string(),
                ));
            }
            let (a, b) = (a / na, b / nb);
            let row = Vector2::new(a.x * b.x, a.y * b.y);
            let rhs = -a.z * b.z;
            ata += row * row.transpose();
            atb += row * rhs;
        }
    }

    // views that only rotate about the optical axis leave the system rank deficient
    let trace = ata.trace();
    if ata.determinant().abs() <= RANK_TOLERANCE * trace * trace {
        return Err(CalibError::DegenerateGeometry(
            "views do not constrain the focal lengths".to_string(),
        ));
    }
    let f = ata.try_inverse().map(|inv| inv * atb).ok_or_else(|| {
        CalibError::DegenerateGeometry("focal length system is singular".to_string())
    })?;

    if !(f.x.is_finite() && f.y.is_finite() && f.x > 0.0 && f.y > 0.0) {
        return Err(CalibError::DegenerateGeometry(format!(
            "no positive focal length solution ({:e}, {:e})",
            f.x, f.y
        )));
    }

    let intrinsics = CameraIntrinsics::new((1.0 / f.x).sqrt(), (1.0 / f.y).sqrt(), cx, cy)?;
    log::debug!(
        "Initial intrinsics: fx {:.2}, fy {:.2}, cx {:.2}, cy {:.2}",
        intrinsics.fx,
        intrinsics.fy,
        intrinsics.cx,
        intrinsics.cy
    );
    Ok(intrinsics)
}
