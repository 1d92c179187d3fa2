use crate::parallel;
use arcv_image::{Image, ImageError};

// ITU-R BT.601 luma weights
const LUMA: [f64; 3] = [0.299, 0.587, 0.114];

/// Convert an RGB image to grayscale, `Y = 0.299 R + 0.587 G + 0.114 B`.
///
/// Feeds the corner detectors, which work on a single floating point channel.
///
/// # Errors
///
/// [`ImageError::InvalidImageSize`] if `src` and `dst` differ in size.
///
/// # Example
///
/// ```
/// use arcv_image::Image;
/// use arcv_imgproc::color::gray_from_rgb;
///
/// let rgb = Image::<f32, 3>::new([1, 1].into(), vec![1.0, 1.0, 1.0])?;
/// let mut gray = Image::<f32, 1>::from_size_val(rgb.size(), 0.0)?;
/// gray_from_rgb(&rgb, &mut gray)?;
/// assert!((gray.as_slice()[0] - 1.0).abs() < 1e-6);
/// # Ok::<(), arcv_image::ImageError>(())
/// ```
pub fn gray_from_rgb<T>(src: &Image<T, 3>, dst: &mut Image<T, 1>) -> Result<(), ImageError>
where
    T: Send + Sync + num_traits::Float,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let mut weights = [T::zero(); 3];
    for (w, &l) in weights.iter_mut().zip(LUMA.iter()) {
        *w = T::from(l).ok_or(ImageError::CastError)?;
    }

    parallel::par_iter_rows(src, dst, |rgb, gray| {
        gray[0] = weights[0] * rgb[0] + weights[1] * rgb[1] + weights[2] * rgb[2];
    });

    Ok(())
}
