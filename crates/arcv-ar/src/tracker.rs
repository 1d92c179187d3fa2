use arcv_3d::projection::project_points;
use arcv_3d::{CameraModel, Pose};
use arcv_calib::{BoardSize, ChessboardDetector};
use arcv_image::Image;
use arcv_pnp::{solve_pnp, PnPMethod};

use crate::error::ArError;
use crate::overlay::{axes_points, solid_points, OverlayRenderer};

/// Pose and projected overlays of the board in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOverlay {
    /// Board frame to camera frame.
    pub pose: Pose,
    /// RMS reprojection error of the board corners, in pixels.
    pub reproj_rmse: f64,
    /// Projected [`axes_points`].
    pub axes: [[f64; 2]; 4],
    /// Projected [`solid_points`] at the tracker's anchor.
    pub solid: [[f64; 2]; 9],
}

impl FrameOverlay {
    /// Draw the axes and the solid onto `frame`.
    pub fn draw<R: OverlayRenderer + ?Sized>(&self, frame: &mut Image<u8, 3>, renderer: &mut R) {
        renderer.draw_solid(frame, &self.solid);
        renderer.draw_axes(frame, &self.axes);
    }
}

/// Tracks a chessboard frame by frame and projects virtual objects onto it.
///
/// Every call solves the pose from scratch, nothing is carried between frames.
#[derive(Debug, Clone)]
pub struct BoardTracker {
    camera: CameraModel,
    board: BoardSize,
    world_points: Vec<[f64; 3]>,
    solid_anchor: [f64; 2],
    axes_length: f64,
    method: PnPMethod,
}

impl BoardTracker {
    /// Track `board` with unit squares through a calibrated camera.
    pub fn new(camera: CameraModel, board: BoardSize) -> Self {
        Self {
            camera,
            board,
            world_points: board.world_points(1.0),
            solid_anchor: [3.0, -2.0],
            axes_length: 1.0,
            method: PnPMethod::default(),
        }
    }

    /// Place the solid's base corner at `(x, y)` in board units.
    pub fn with_solid_anchor(mut self, x: f64, y: f64) -> Self {
        self.solid_anchor = [x, y];
        self
    }

    /// Length of the drawn axes in board units.
    pub fn with_axes_length(mut self, length: f64) -> Self {
        self.axes_length = length;
        self
    }

    /// Pose solver used on each frame.
    pub fn with_method(mut self, method: PnPMethod) -> Self {
        self.method = method;
        self
    }

    /// The camera the tracker projects through.
    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    /// Solve the board pose from its detected corners and project the overlays.
    ///
    /// # Errors
    ///
    /// [`ArError::Pose`] when the corners do not match the board or do not
    /// determine a pose.
    pub fn process(&self, image_points: &[[f64; 2]]) -> Result<FrameOverlay, ArError> {
        let res = solve_pnp(
            &self.world_points,
            image_points,
            &self.camera,
            self.method.clone(),
        )?;

        let axes = project_points(&axes_points(self.axes_length), &res.pose, &self.camera);
        let [x, y] = self.solid_anchor;
        let solid = project_points(&solid_points(x, y), &res.pose, &self.camera);

        let mut overlay = FrameOverlay {
            pose: res.pose,
            reproj_rmse: res.reproj_rmse,
            axes: [[0.0; 2]; 4],
            solid: [[0.0; 2]; 9],
        };
        overlay.axes.copy_from_slice(&axes);
        overlay.solid.copy_from_slice(&solid);
        Ok(overlay)
    }

    /// Detect the board in `gray` and [`process`](Self::process) it.
    ///
    /// # Errors
    ///
    /// [`ArError::BoardNotFound`] if the detector misses any corner.
    pub fn process_frame<D: ChessboardDetector + ?Sized>(
        &self,
        gray: &Image<f32, 1>,
        detector: &D,
    ) -> Result<FrameOverlay, ArError> {
        let detection = detector.detect(gray, self.board);
        let expected = self.board.num_corners();
        if !detection.found || detection.points.len() != expected {
            return Err(ArError::BoardNotFound {
                expected,
                found: detection.points.len(),
            });
        }
        self.process(&detection.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcv_3d::{CameraIntrinsics, DistortionCoefficients, ErrorKind};
    use arcv_calib::ChessboardDetection;

    struct Projector {
        camera: CameraModel,
        pose: Pose,
        drop: usize,
    }

    impl ChessboardDetector for Projector {
        fn detect(&self, _image: &Image<f32, 1>, board: BoardSize) -> ChessboardDetection {
            let mut points = project_points(&board.world_points(1.0), &self.pose, &self.camera);
            points.truncate(points.len() - self.drop);
            ChessboardDetection {
                found: self.drop == 0,
                points,
            }
        }
    }

    fn camera() -> Result<CameraModel, Box<dyn std::error::Error>> {
        Ok(CameraModel::new(
            CameraIntrinsics::new(700.0, 700.0, 320.0, 240.0)?,
            DistortionCoefficients::new(vec![-0.1, 0.02, 0.0, 0.0, 0.0])?,
        )?)
    }

    #[test]
    fn test_process_frame_projects_overlays() -> Result<(), Box<dyn std::error::Error>> {
        let board = BoardSize::new(9, 6);
        let pose = Pose::from_rvec_tvec(&[0.3, -0.2, 0.1], &[-4.0, 2.5, 20.0]);
        let detector = Projector {
            camera: camera()?,
            pose,
            drop: 0,
        };
        let tracker = BoardTracker::new(camera()?, board).with_solid_anchor(2.0, -1.0);
        let gray = Image::<f32, 1>::from_size_val([640, 480].into(), 0.0)?;

        let overlay = tracker.process_frame(&gray, &detector)?;
        assert!(overlay.pose.rotation_angle_to(&pose) < 1e-6);
        assert!(overlay.reproj_rmse < 1e-6);

        // the axes origin and the solid base sit on board corners
        let corners = project_points(&board.world_points(1.0), &pose, tracker.camera());
        approx::assert_relative_eq!(overlay.axes[0][0], corners[0][0], epsilon = 1e-6);
        approx::assert_relative_eq!(overlay.axes[0][1], corners[0][1], epsilon = 1e-6);
        // corner (row 1, col 2) is world point (2, -1, 0)
        approx::assert_relative_eq!(overlay.solid[0][0], corners[11][0], epsilon = 1e-6);
        approx::assert_relative_eq!(overlay.solid[0][1], corners[11][1], epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_process_planar_with_longer_axes() -> Result<(), Box<dyn std::error::Error>> {
        let board = BoardSize::new(9, 6);
        let pose = Pose::from_rvec_tvec(&[-0.2, 0.25, 0.0], &[-3.0, 2.0, 18.0]);
        let corners = project_points(&board.world_points(1.0), &pose, &camera()?);
        let tracker = BoardTracker::new(camera()?, board)
            .with_axes_length(3.0)
            .with_method(PnPMethod::Planar);

        let overlay = tracker.process(&corners)?;
        assert!(overlay.reproj_rmse < 1e-6);
        // the x axis ends on corner (row 0, col 3)
        approx::assert_relative_eq!(overlay.axes[1][0], corners[3][0], epsilon = 1e-6);
        approx::assert_relative_eq!(overlay.axes[1][1], corners[3][1], epsilon = 1e-6);
        // the -y axis ends on corner (row 3, col 0)
        approx::assert_relative_eq!(overlay.axes[2][0], corners[27][0], epsilon = 1e-6);
        approx::assert_relative_eq!(overlay.axes[2][1], corners[27][1], epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_process_frame_board_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let board = BoardSize::new(9, 6);
        let detector = Projector {
            camera: camera()?,
            pose: Pose::from_rvec_tvec(&[0.0, 0.0, 0.0], &[-4.0, 2.5, 20.0]),
            drop: 5,
        };
        let tracker = BoardTracker::new(camera()?, board);
        let gray = Image::<f32, 1>::from_size_val([640, 480].into(), 0.0)?;

        let err = tracker
            .process_frame(&gray, &detector)
            .err()
            .ok_or("board should not be found")?;
        assert_eq!(
            err,
            ArError::BoardNotFound {
                expected: 54,
                found: 49
            }
        );
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        Ok(())
    }

    #[test]
    fn test_process_rejects_wrong_count() -> Result<(), Box<dyn std::error::Error>> {
        let tracker = BoardTracker::new(camera()?, BoardSize::new(4, 3));
        let err = tracker.process(&[[1.0, 2.0]; 5]).err();
        assert!(matches!(err, Some(ArError::Pose(_))));
        Ok(())
    }
}
