use arcv_3d::{CameraModel, Pose};
use arcv_image::Image;
use arcv_pnp::solve_square_marker;

/// A square fiducial marker found in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerObservation {
    /// The decoded identity.
    pub id: u32,
    /// Pixel corners in the order top-left, top-right, bottom-right, bottom-left.
    pub corners: [[f64; 2]; 4],
}

/// Contract of an external fiducial marker detector.
pub trait MarkerDetector {
    /// Detect every marker in a frame.
    fn detect(&self, frame: &Image<u8, 3>) -> Vec<MarkerObservation>;
}

/// Pose of one observed marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPose {
    /// Identity of the marker.
    pub id: u32,
    /// Marker frame to camera frame.
    pub pose: Pose,
    /// RMS reprojection error of the corners, in pixels.
    pub reproj_rmse: f64,
}

/// Solve the pose of every observed marker.
///
/// Markers whose pose cannot be solved are skipped with a debug log.
///
/// # Arguments
///
/// * `observations` - The detected markers.
/// * `marker_length` - Side of a marker in world units.
/// * `camera` - The calibrated camera.
pub fn marker_poses(
    observations: &[MarkerObservation],
    marker_length: f64,
    camera: &CameraModel,
) -> Vec<MarkerPose> {
    observations
        .iter()
        .filter_map(
            |obs| match solve_square_marker(&obs.corners, marker_length, camera) {
                Ok(res) => Some(MarkerPose {
                    id: obs.id,
                    pose: res.pose,
                    reproj_rmse: res.reproj_rmse,
                }),
                Err(e) => {
                    log::debug!("Skipping pose of marker {}: {e}", obs.id);
                    None
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcv_3d::projection::project_points;
    use arcv_3d::CameraIntrinsics;
    use arcv_pnp::{square_object_points, DEFAULT_MARKER_LENGTH};

    #[test]
    fn test_marker_poses_skips_degenerate() -> Result<(), Box<dyn std::error::Error>> {
        let camera = CameraModel::pinhole(CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0)?);
        let truth = Pose::from_rvec_tvec(&[0.2, 0.1, -0.1], &[0.05, 0.02, 0.5]);
        let uv = project_points(&square_object_points(DEFAULT_MARKER_LENGTH), &truth, &camera);

        let observations = [
            MarkerObservation {
                id: 7,
                corners: [uv[0], uv[1], uv[2], uv[3]],
            },
            // collapsed to a line
            MarkerObservation {
                id: 9,
                corners: [[10.0, 10.0], [20.0, 10.0], [30.0, 10.0], [40.0, 10.0]],
            },
        ];

        let poses = marker_poses(&observations, DEFAULT_MARKER_LENGTH, &camera);
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].id, 7);
        assert!(poses[0].pose.rotation_angle_to(&truth) < 1e-6);
        assert!(poses[0].reproj_rmse < 1e-6);
        Ok(())
    }
}
