use arcv_image::{Image, ImageError};

use super::{Kernel, MorphologyError};
use crate::parallel;

/// Erode an image with a binary structuring element.
///
/// Each output channel is the minimum of the input channel over the active
/// kernel elements. Elements falling outside the image are ignored, so the
/// image border does not erode.
///
/// # Arguments
///
/// * `src` - The input image.
/// * `dst` - The output image, same size as `src`.
/// * `kernel` - The structuring element, anchored at its centre.
pub fn erode<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError>
where
    T: Copy + PartialOrd + Send + Sync,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        )
        .into());
    }

    let offsets = kernel.offsets();
    let (cols, rows) = (src.cols() as isize, src.rows() as isize);
    let data = src.as_slice();

    parallel::par_iter_rows_indexed(dst, |x, y, dst_pixel| {
        let base = (y * src.cols() + x) * C;
        dst_pixel.copy_from_slice(&data[base..base + C]);

        for &(dx, dy) in offsets.iter() {
            let (nx, ny) = (x as isize + dx, y as isize + dy);
            if nx < 0 || ny < 0 || nx >= cols || ny >= rows {
                continue;
            }
            let nbase = (ny as usize * src.cols() + nx as usize) * C;
            for (d, &s) in dst_pixel.iter_mut().zip(data[nbase..nbase + C].iter()) {
                if s < *d {
                    *d = s;
                }
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::MorphShape;

    #[test]
    fn test_erode_square() -> Result<(), MorphologyError> {
        // 5x5 block of ones in a 7x7 image
        let mut data = vec![0u8; 49];
        for y in 1..6 {
            for x in 1..6 {
                data[y * 7 + x] = 255;
            }
        }
        let src = Image::<u8, 1>::new([7, 7].into(), data)?;
        let mut dst = Image::<u8, 1>::from_size_val(src.size(), 0)?;

        erode(&src, &mut dst, &Kernel::rect(3)?)?;

        for y in 0..7 {
            for x in 0..7 {
                let inside = (2..5).contains(&x) && (2..5).contains(&y);
                let expected = if inside { 255 } else { 0 };
                assert_eq!(dst.get_pixel(x, y, 0)?, expected, "({x}, {y})");
            }
        }
        Ok(())
    }

    #[test]
    fn test_erode_border_is_ignored() -> Result<(), MorphologyError> {
        let src = Image::<u8, 1>::from_size_val([4, 3].into(), 9)?;
        let mut dst = Image::<u8, 1>::from_size_val(src.size(), 0)?;
        erode(&src, &mut dst, &Kernel::rect(5)?)?;
        assert!(dst.as_slice().iter().all(|&v| v == 9));
        Ok(())
    }

    #[test]
    fn test_erode_cross_multichannel() -> Result<(), MorphologyError> {
        let mut src = Image::<f32, 2>::from_size_val([3, 3].into(), 1.0)?;
        src.set_pixel(0, 0, 0, 0.0)?;
        src.set_pixel(1, 0, 1, -1.0)?;
        let mut dst = Image::<f32, 2>::from_size_val(src.size(), 0.0)?;

        erode(&src, &mut dst, &Kernel::new(MorphShape::Cross, 3, 3)?)?;

        // the corner is not in the cross of the centre
        assert_eq!(dst.pixel(1, 1), Some(&[1.0f32, -1.0][..]));
        assert_eq!(dst.pixel(0, 1), Some(&[0.0f32, 1.0][..]));
        assert_eq!(dst.pixel(2, 2), Some(&[1.0f32, 1.0][..]));
        Ok(())
    }

    #[test]
    fn test_erode_size_mismatch() -> Result<(), MorphologyError> {
        let src = Image::<u8, 1>::from_size_val([4, 3].into(), 0)?;
        let mut dst = Image::<u8, 1>::from_size_val([3, 3].into(), 0)?;
        assert_eq!(
            erode(&src, &mut dst, &Kernel::rect(3)?),
            Err(MorphologyError::Image(ImageError::InvalidImageSize(
                4, 3, 3, 3
            )))
        );
        Ok(())
    }
}
