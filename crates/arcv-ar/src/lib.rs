#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Two per-frame pipelines built on the calibrated camera:
//!
//! * [`PlanarCompositor`] warps a source image onto the area framed by four
//!   fiducial markers.
//! * [`BoardTracker`] solves the pose of a chessboard and projects virtual
//!   objects onto it.

mod error;
mod marker;
mod sequence;
mod tracker;

/// Marker-framed planar compositing.
pub mod compositor;

/// Virtual object geometry and rendering.
pub mod overlay;

pub use compositor::{
    AnchorTable, CompositorConfig, MarkerAnchor, MarkerCorner, PlanarCompositor,
};
pub use error::{ArError, CompositeError};
pub use marker::{marker_poses, MarkerDetector, MarkerObservation, MarkerPose};
pub use overlay::{LineRenderer, OverlayRenderer};
pub use sequence::SourceSequence;
pub use tracker::{BoardTracker, FrameOverlay};
