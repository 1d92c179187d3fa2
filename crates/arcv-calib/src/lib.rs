#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Views of a chessboard are accumulated one by one and solved jointly for
//! the intrinsics, the lens distortion and the pose of every view.

mod accumulator;
mod board;
mod detector;
mod error;
mod init;
mod solver;

/// Reading and writing calibration files.
pub mod io;

pub use accumulator::{AccumulatorConfig, CalibrationAccumulator, CalibrationView};
pub use board::BoardSize;
pub use detector::{ChessboardDetection, ChessboardDetector};
pub use error::CalibError;
pub use init::init_intrinsics;
pub use solver::{
    calibrate_camera, CalibrationConfig, CalibrationResult, DistortionModel, QualityWarning,
};
