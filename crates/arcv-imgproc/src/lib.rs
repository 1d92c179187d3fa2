#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// color transformations module.
pub mod color;

/// masked copy and image concatenation.
pub mod composite;

/// sub-pixel corner refinement.
pub mod corners;

/// utilities to draw on images.
pub mod draw;

/// feature response module.
pub mod features;

/// utilities for interpolation.
pub mod interpolation;

/// morphological operations module.
pub mod morphology;

/// operations to normalize images.
pub mod normalize;

/// module containing parallization utilities.
pub mod parallel;

/// image geometric transformations module.
pub mod warp;

pub use composite::{concat_horizontal, copy_with_mask};
