mod erosion;
mod kernel;

pub use erosion::erode;
pub use kernel::{Kernel, MorphShape};

use arcv_image::ImageError;

/// Errors related to morphological operations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MorphologyError {
    /// The kernel has zero width or height.
    #[error("Kernel must not be empty, got {0}x{1}")]
    EmptyKernel(usize, usize),

    /// Image error.
    #[error(transparent)]
    Image(#[from] ImageError),
}
