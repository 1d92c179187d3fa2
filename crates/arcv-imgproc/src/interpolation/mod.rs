//! Pixel interpolation methods for image transformations.
//!
//! - **Nearest**: uses the nearest pixel value.
//! - **Bilinear**: linear blend of the four neighbouring pixels.
//! - **Bicubic**: cubic convolution over a 4x4 neighbourhood with `A = -0.75`,
//!   the kernel used by OpenCV.

mod bicubic;
mod bilinear;
mod interpolate;
mod nearest;

pub use bicubic::cubic_weights;
pub use interpolate::{interpolate_pixel, InterpolationMode};
