#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera intrinsics and lens distortion.
pub mod camera;

/// Error classification shared by the geometric crates.
pub mod error;

/// Planar homography estimation.
pub mod homography;

/// Rigid body poses and axis-angle conversions.
pub mod pose;

/// Projection of world points into the image.
pub mod projection;

pub use camera::{CameraError, CameraIntrinsics, CameraModel, DistortionCoefficients};
pub use error::ErrorKind;
pub use homography::{find_homography, HomographyError};
pub use pose::Pose;
pub use projection::ProjectionError;
