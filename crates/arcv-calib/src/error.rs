use arcv_3d::{CameraError, ErrorKind, HomographyError};
use arcv_image::ImageError;
use arcv_optim::OptimizerError;
use arcv_pnp::PnPError;
use thiserror::Error;

/// Errors raised while accumulating views or calibrating a camera.
#[derive(Debug, Error, PartialEq)]
pub enum CalibError {
    /// Too few views to calibrate.
    #[error("Calibration requires at least {required} views, got {actual}")]
    InsufficientViews {
        /// Minimum number of views
        required: usize,
        /// Number of views provided
        actual: usize,
    },

    /// A view has fewer points than the solver needs.
    #[error("View {view} has {actual} points, at least {required} are required")]
    InsufficientPoints {
        /// Index of the view
        view: usize,
        /// Minimum number of points
        required: usize,
        /// Number of points in the view
        actual: usize,
    },

    /// The detector did not find every corner of the board.
    #[error("Incomplete view: expected {expected} corners, found {found}")]
    IncompleteView {
        /// Number of inner corners of the board
        expected: usize,
        /// Number of corners found
        found: usize,
    },

    /// The board has too few corners to constrain a view.
    #[error("Board of {cols}x{rows} corners is too small, at least 2x2 is required")]
    BoardTooSmall {
        /// Inner corners per row
        cols: usize,
        /// Inner corners per column
        rows: usize,
    },

    /// The image and world points of a view differ in length.
    #[error("View {view}: {image} image points but {world} world points")]
    MismatchedLengths {
        /// Index of the view
        view: usize,
        /// Number of image points
        image: usize,
        /// Number of world points
        world: usize,
    },

    /// The world points of a view do not lie on the plane `z = 0`.
    #[error("View {view}: calibration target must lie on the plane z = 0")]
    NonPlanarTarget {
        /// Index of the view
        view: usize,
    },

    /// Malformed input, e.g. an empty image size or non-finite points.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The views do not determine the camera.
    #[error("Degenerate calibration geometry: {0}")]
    DegenerateGeometry(String),

    /// Invalid camera parameters.
    #[error(transparent)]
    Camera(#[from] CameraError),

    /// Homography estimation failed.
    #[error(transparent)]
    Homography(#[from] HomographyError),

    /// Pose initialisation failed.
    #[error(transparent)]
    Pose(#[from] PnPError),

    /// The joint refinement failed.
    #[error("Calibration refinement failed: {0}")]
    Optimizer(#[from] OptimizerError),

    /// Image error.
    #[error(transparent)]
    Image(#[from] ImageError),
}

impl CalibError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalibError::InsufficientViews { .. }
            | CalibError::InsufficientPoints { .. }
            | CalibError::IncompleteView { .. } => ErrorKind::InsufficientData,
            CalibError::MismatchedLengths { .. }
            | CalibError::NonPlanarTarget { .. }
            | CalibError::BoardTooSmall { .. }
            | CalibError::InvalidInput(_)
            | CalibError::Image(_) => ErrorKind::Input,
            CalibError::DegenerateGeometry(_) | CalibError::Optimizer(_) => {
                ErrorKind::DegenerateGeometry
            }
            CalibError::Camera(e) => e.kind(),
            CalibError::Homography(e) => e.kind(),
            CalibError::Pose(e) => e.kind(),
        }
    }
}
