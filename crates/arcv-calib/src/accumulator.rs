use arcv_image::{Image, ImageSize};
use arcv_imgproc::corners::{corner_subpix, TermCriteria, DEFAULT_HALF_WINDOW};
use serde::{Deserialize, Serialize};

use crate::board::BoardSize;
use crate::detector::ChessboardDetector;
use crate::error::CalibError;
use crate::solver::{calibrate_camera, CalibrationConfig, CalibrationResult};

/// One observation of the calibration target.
///
/// Views are immutable once built. The accumulator only ever appends them.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationView {
    image_points: Vec<[f64; 2]>,
    world_points: Vec<[f64; 3]>,
}

impl CalibrationView {
    /// Pair pixel observations with the world points they image.
    ///
    /// The pairing is checked when the views are solved.
    pub fn new(image_points: Vec<[f64; 2]>, world_points: Vec<[f64; 3]>) -> Self {
        Self {
            image_points,
            world_points,
        }
    }

    /// The observed corners in pixels.
    pub fn image_points(&self) -> &[[f64; 2]] {
        &self.image_points
    }

    /// The target points in world units, on the plane `z = 0`.
    pub fn world_points(&self) -> &[[f64; 3]] {
        &self.world_points
    }

    /// Number of image points.
    pub fn len(&self) -> usize {
        self.image_points.len()
    }

    /// Whether the view holds no points.
    pub fn is_empty(&self) -> bool {
        self.image_points.is_empty()
    }
}

/// Settings of the view accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    /// When to stop refining a corner.
    pub criteria: TermCriteria,
    /// Half side of the sub-pixel search window.
    pub half_window: usize,
    /// Side of one board square in world units.
    pub square_size: f64,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            criteria: TermCriteria::default(),
            half_window: DEFAULT_HALF_WINDOW,
            square_size: 1.0,
        }
    }
}

/// Collects chessboard views for a calibration run.
///
/// # Example
///
/// ```
/// use arcv_calib::{AccumulatorConfig, BoardSize, CalibrationAccumulator, CalibError};
///
/// let mut acc = CalibrationAccumulator::new(BoardSize::new(3, 2), AccumulatorConfig::default())?;
/// let partial = [[10.0, 10.0], [20.0, 10.0]];
/// assert!(matches!(
///     acc.add_points(&partial),
///     Err(CalibError::IncompleteView { expected: 6, found: 2 })
/// ));
/// assert!(acc.is_empty());
/// # Ok::<(), CalibError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CalibrationAccumulator {
    board: BoardSize,
    config: AccumulatorConfig,
    world_points: Vec<[f64; 3]>,
    views: Vec<CalibrationView>,
}

impl CalibrationAccumulator {
    /// Create an empty accumulator for a board.
    ///
    /// # Errors
    ///
    /// [`CalibError::BoardTooSmall`] unless the board has at least two corners
    /// along each axis, the fewest that give a non-collinear view.
    pub fn new(board: BoardSize, config: AccumulatorConfig) -> Result<Self, CalibError> {
        if board.cols < 2 || board.rows < 2 {
            return Err(CalibError::BoardTooSmall {
                cols: board.cols,
                rows: board.rows,
            });
        }
        Ok(Self {
            board,
            config,
            world_points: board.world_points(config.square_size),
            views: Vec::new(),
        })
    }

    /// The board being observed.
    pub fn board(&self) -> BoardSize {
        self.board
    }

    /// Detect the board in `image`, refine the corners and append the view.
    ///
    /// # Errors
    ///
    /// [`CalibError::IncompleteView`] when the detector misses any corner. The
    /// accumulator is left unchanged.
    pub fn add_view<D: ChessboardDetector + ?Sized>(
        &mut self,
        image: &Image<f32, 1>,
        detector: &D,
    ) -> Result<&CalibrationView, CalibError> {
        let detection = detector.detect(image, self.board);
        let expected = self.board.num_corners();
        if !detection.found || detection.points.len() != expected {
            log::warn!(
                "Rejected view: found {} of {expected} corners",
                detection.points.len()
            );
            return Err(CalibError::IncompleteView {
                expected,
                found: detection.points.len(),
            });
        }

        let mut points = detection.points;
        corner_subpix(
            image,
            &mut points,
            self.config.half_window,
            &self.config.criteria,
        );

        self.add_points(&points)
    }

    /// Append a view from corners detected elsewhere, in detector order.
    ///
    /// # Errors
    ///
    /// * [`CalibError::IncompleteView`] if the count differs from the board's corner count.
    /// * [`CalibError::InvalidInput`] if a coordinate is not finite.
    pub fn add_points(&mut self, points: &[[f64; 2]]) -> Result<&CalibrationView, CalibError> {
        let expected = self.board.num_corners();
        if points.len() != expected {
            log::warn!("Rejected view: found {} of {expected} corners", points.len());
            return Err(CalibError::IncompleteView {
                expected,
                found: points.len(),
            });
        }
        if points.iter().flatten().any(|v| !v.is_finite()) {
            log::warn!("Rejected view: corners must be finite");
            return Err(CalibError::InvalidInput(
                "corners must be finite".to_string(),
            ));
        }

        self.views.push(CalibrationView::new(
            points.to_vec(),
            self.world_points.clone(),
        ));
        log::debug!("Accepted view {}", self.views.len());

        Ok(&self.views[self.views.len() - 1])
    }

    /// The accepted views in insertion order.
    pub fn views(&self) -> &[CalibrationView] {
        &self.views
    }

    /// Number of accepted views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether no view has been accepted.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Drop every view.
    pub fn clear(&mut self) {
        self.views.clear();
    }

    /// Copy of the views, for solving on another thread.
    pub fn snapshot(&self) -> Vec<CalibrationView> {
        self.views.clone()
    }

    /// Calibrate the camera from the accepted views.
    pub fn calibrate(
        &self,
        image_size: ImageSize,
        config: &CalibrationConfig,
    ) -> Result<CalibrationResult, CalibError> {
        calibrate_camera(&self.views, image_size, config)
    }
}
