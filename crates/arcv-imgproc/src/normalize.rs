use num_traits::Float;

use arcv_image::{Image, ImageError};

use crate::parallel;

/// Find the minimum and maximum values over all channels of an image.
///
/// Returns `None` for an empty image.
pub fn find_min_max<T, const C: usize>(image: &Image<T, C>) -> Option<(T, T)>
where
    T: Copy + PartialOrd,
{
    let mut iter = image.as_slice().iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| {
        (
            if v < lo { v } else { lo },
            if v > hi { v } else { hi },
        )
    }))
}

/// Linearly rescale an image so that its values span `[min, max]`.
///
/// A constant image maps to `min`.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `dst` - The output image, same size as `src`.
/// * `min` - The value the smallest input maps to.
/// * `max` - The value the largest input maps to.
pub fn normalize_min_max<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    min: T,
    max: T,
) -> Result<(), ImageError>
where
    T: Send + Sync + Float,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let Some((min_val, max_val)) = find_min_max(src) else {
        return Ok(());
    };
    let range = max_val - min_val;

    parallel::par_iter_rows(src, dst, |src_pixel, dst_pixel| {
        src_pixel
            .iter()
            .zip(dst_pixel.iter_mut())
            .for_each(|(&src_val, dst_val)| {
                *dst_val = if range > T::zero() {
                    (src_val - min_val) * (max - min) / range + min
                } else {
                    min
                };
            });
    });

    Ok(())
}
