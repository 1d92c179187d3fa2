use arcv_image::{Image, ImageError, ImageSize};

use crate::parallel;

/// Copy the pixels of `src` into `dst` wherever `mask` is non-zero.
///
/// Pixels of `dst` under a zero mask are left untouched.
///
/// # Errors
///
/// [`ImageError::InvalidImageSize`] if the three images differ in size.
pub fn copy_with_mask<T, const C: usize>(
    src: &Image<T, C>,
    mask: &Image<u8, 1>,
    dst: &mut Image<T, C>,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    for other in [mask.size(), dst.size()] {
        if src.size() != other {
            return Err(ImageError::InvalidImageSize(
                src.cols(),
                src.rows(),
                other.width,
                other.height,
            ));
        }
    }

    parallel::par_iter_rows_masked(src, mask, dst, |src_pixel, m, dst_pixel| {
        if m != 0 {
            dst_pixel.copy_from_slice(src_pixel);
        }
    });

    Ok(())
}

/// Concatenate two images of the same height side by side.
///
/// # Errors
///
/// [`ImageError::InvalidImageSize`] if the heights differ.
///
/// # Example
///
/// ```
/// use arcv_image::Image;
/// use arcv_imgproc::concat_horizontal;
///
/// let left = Image::<u8, 1>::new([1, 2].into(), vec![1, 2]).unwrap();
/// let right = Image::<u8, 1>::new([2, 2].into(), vec![3, 4, 5, 6]).unwrap();
/// let both = concat_horizontal(&left, &right).unwrap();
/// assert_eq!(both.as_slice(), &[1, 3, 4, 2, 5, 6]);
/// ```
pub fn concat_horizontal<T, const C: usize>(
    left: &Image<T, C>,
    right: &Image<T, C>,
) -> Result<Image<T, C>, ImageError>
where
    T: Copy,
{
    if left.rows() != right.rows() {
        return Err(ImageError::InvalidImageSize(
            left.cols(),
            left.rows(),
            right.cols(),
            right.rows(),
        ));
    }

    let size = ImageSize {
        width: left.cols() + right.cols(),
        height: left.rows(),
    };

    let (lstride, rstride) = (left.cols() * C, right.cols() * C);
    let mut data = Vec::with_capacity(size.width * size.height * C);
    for y in 0..size.height {
        data.extend_from_slice(&left.as_slice()[y * lstride..(y + 1) * lstride]);
        data.extend_from_slice(&right.as_slice()[y * rstride..(y + 1) * rstride]);
    }

    Image::new(size, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_with_mask() -> Result<(), ImageError> {
        let src = Image::<u8, 3>::from_size_val([2, 2].into(), 200)?;
        let mask = Image::<u8, 1>::new([2, 2].into(), vec![0, 255, 1, 0])?;
        let mut dst = Image::<u8, 3>::from_size_val([2, 2].into(), 10)?;

        copy_with_mask(&src, &mask, &mut dst)?;

        assert_eq!(
            dst.as_slice(),
            &[10, 10, 10, 200, 200, 200, 200, 200, 200, 10, 10, 10]
        );
        Ok(())
    }

    #[test]
    fn test_copy_with_mask_size_mismatch() -> Result<(), ImageError> {
        let src = Image::<u8, 1>::from_size_val([2, 2].into(), 0)?;
        let mask = Image::<u8, 1>::from_size_val([3, 2].into(), 0)?;
        let mut dst = Image::<u8, 1>::from_size_val([2, 2].into(), 0)?;
        assert_eq!(
            copy_with_mask(&src, &mask, &mut dst),
            Err(ImageError::InvalidImageSize(2, 2, 3, 2))
        );
        Ok(())
    }

    #[test]
    fn test_concat_horizontal() -> Result<(), ImageError> {
        let left = Image::<u8, 3>::from_size_val([2, 3].into(), 1)?;
        let right = Image::<u8, 3>::from_size_val([4, 3].into(), 2)?;
        let both = concat_horizontal(&left, &right)?;
        assert_eq!(
            both.size(),
            ImageSize {
                width: 6,
                height: 3
            }
        );
        assert_eq!(both.pixel(1, 2), Some(&[1u8, 1, 1][..]));
        assert_eq!(both.pixel(2, 0), Some(&[2u8, 2, 2][..]));

        let short = Image::<u8, 3>::from_size_val([4, 2].into(), 2)?;
        assert_eq!(
            concat_horizontal(&left, &short),
            Err(ImageError::InvalidImageSize(2, 3, 4, 2))
        );
        Ok(())
    }
}
