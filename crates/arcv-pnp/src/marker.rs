//! Pose of a single square fiducial marker from its four corners.

use crate::types::{PnPError, PnPResult};
use crate::{solve_pnp, PnPMethod};
use arcv_3d::CameraModel;

/// Side length used when none is configured, in world units.
pub const DEFAULT_MARKER_LENGTH: f64 = 0.05;

/// The 3D corners of a square marker of side `length`, centred on the origin
/// in the `z = 0` plane.
///
/// The order follows the detector's winding: top-left, top-right,
/// bottom-right, bottom-left.
pub fn square_object_points(length: f64) -> [[f64; 3]; 4] {
    let h = length / 2.0;
    [
        [-h, h, 0.0],
        [h, h, 0.0],
        [h, -h, 0.0],
        [-h, -h, 0.0],
    ]
}

/// Estimate the pose of a square marker from its four image corners.
///
/// The corners are pixel coordinates in the order top-left, top-right,
/// bottom-right, bottom-left.
pub fn solve_square_marker(
    corners: &[[f64; 2]; 4],
    marker_length: f64,
    camera: &CameraModel,
) -> Result<PnPResult, PnPError> {
    if !(marker_length.is_finite() && marker_length > 0.0) {
        return Err(PnPError::InvalidInput(format!(
            "marker length must be positive, got {marker_length}"
        )));
    }

    let object = square_object_points(marker_length);
    solve_pnp(&object, corners, camera, PnPMethod::Planar)
}
