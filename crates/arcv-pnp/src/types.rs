//! Errors, tolerances and results of the pose solvers.

use arcv_3d::homography::HomographyError;
use arcv_3d::{ErrorKind, Pose};
use arcv_optim::OptimizerError;
use thiserror::Error;

/// Failure of a pose solve.
#[derive(Debug, Error, PartialEq)]
pub enum PnPError {
    /// Fewer correspondences than the solver needs.
    #[error("pose solve needs at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Solver minimum.
        required: usize,
        /// Number given.
        actual: usize,
    },

    /// The two point lists differ in length.
    #[error("{left_name} has {left_len} points but {right_name} has {right_len}")]
    MismatchedArrayLengths {
        /// First list.
        left_name: &'static str,
        /// Its length.
        left_len: usize,
        /// Second list.
        right_name: &'static str,
        /// Its length.
        right_len: usize,
    },

    /// A non-finite coordinate or an unusable parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A decomposition produced no usable solution.
    #[error("decomposition failed: {0}")]
    SvdFailed(String),

    /// The correspondences do not determine a unique pose.
    #[error("degenerate point configuration: {0}")]
    DegenerateGeometry(String),

    /// Planar initialisation failed.
    #[error(transparent)]
    Homography(#[from] HomographyError),

    /// Pose refinement failed.
    #[error("pose refinement failed: {0}")]
    Refinement(#[from] OptimizerError),
}

impl PnPError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PnPError::InsufficientCorrespondences { .. } => ErrorKind::InsufficientData,
            PnPError::MismatchedArrayLengths { .. } | PnPError::InvalidInput(_) => ErrorKind::Input,
            PnPError::SvdFailed(_) | PnPError::DegenerateGeometry(_) | PnPError::Refinement(_) => {
                ErrorKind::DegenerateGeometry
            }
            PnPError::Homography(e) => e.kind(),
        }
    }
}

/// Thresholds of the linear algebra in the EPnP initialiser.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTol {
    /// Singular values below this are treated as zero in least squares solves.
    pub svd: f64,
    /// Below this determinant the control point system uses a pseudo-inverse.
    pub eps: f64,
}

impl Default for NumericTol {
    fn default() -> Self {
        Self {
            svd: 1e-12,
            eps: 1e-12,
        }
    }
}

/// Outcome of [`crate::solve_pnp`]. The pose maps world to camera coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PnPResult {
    /// The solved pose.
    pub pose: Pose,
    /// Axis-angle vector of the rotation.
    pub rvec: [f64; 3],
    /// RMS reprojection error in pixels.
    pub reproj_rmse: f64,
    /// Number of refinement iterations, zero for a linear-only solve.
    pub num_iterations: usize,
    /// Whether the refinement stopped on a convergence criterion.
    pub converged: bool,
}

/// A closed-form pose initialiser working on undistorted normalized points.
pub trait PnPSolver {
    /// Solver settings.
    type Param;

    /// Estimate the pose.
    fn solve(
        world: &[[f64; 3]],
        normalized: &[[f64; 2]],
        params: &Self::Param,
    ) -> Result<Pose, PnPError>;
}
