use arcv_3d::{ErrorKind, HomographyError};
use arcv_image::ImageError;
use arcv_imgproc::morphology::MorphologyError;
use arcv_pnp::PnPError;
use thiserror::Error;

/// Reasons the compositor leaves a frame untouched.
#[derive(Debug, Error, PartialEq)]
pub enum CompositeError {
    /// An expected marker was not observed.
    #[error("Marker {id} was not observed")]
    MissingMarker {
        /// Identity of the missing marker
        id: u32,
    },

    /// A marker corner is NaN or infinite.
    #[error("Marker {id} has a non-finite corner")]
    InvalidObservation {
        /// Identity of the marker
        id: u32,
    },

    /// The destination quadrilateral is degenerate.
    #[error(transparent)]
    Homography(#[from] HomographyError),

    /// Image error.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The mask erosion is misconfigured.
    #[error(transparent)]
    Morphology(#[from] MorphologyError),
}

impl CompositeError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompositeError::MissingMarker { .. } => ErrorKind::InsufficientData,
            CompositeError::Homography(e) => e.kind(),
            CompositeError::InvalidObservation { .. }
            | CompositeError::Image(_)
            | CompositeError::Morphology(_) => ErrorKind::Input,
        }
    }
}

/// Errors of the per-frame pose pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum ArError {
    /// The board was not fully detected in the frame.
    #[error("Board not found: {found} of {expected} corners detected")]
    BoardNotFound {
        /// Number of inner corners of the board
        expected: usize,
        /// Number of corners detected
        found: usize,
    },

    /// A source sequence needs at least one frame.
    #[error("Source sequence is empty")]
    EmptySequence,

    /// Pose estimation failed.
    #[error(transparent)]
    Pose(#[from] PnPError),

    /// Compositing failed.
    #[error(transparent)]
    Composite(#[from] CompositeError),
}

impl ArError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArError::BoardNotFound { .. } => ErrorKind::InsufficientData,
            ArError::EmptySequence => ErrorKind::Input,
            ArError::Pose(e) => e.kind(),
            ArError::Composite(e) => e.kind(),
        }
    }
}
