use crate::{
    interpolation::{interpolate_pixel, InterpolationMode},
    parallel,
};

use arcv_image::{Image, ImageDtype, ImageError};

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Invert a row-major 3x3 perspective matrix.
///
/// The columns of the adjugate are the cross products of the row pairs.
///
/// # Errors
///
/// [`ImageError::CannotComputeDeterminant`] when the matrix is singular or
/// contains non-finite values.
pub fn inverse_perspective_matrix(m: &[f64; 9]) -> Result<[f64; 9], ImageError> {
    let rows = [[m[0], m[1], m[2]], [m[3], m[4], m[5]], [m[6], m[7], m[8]]];
    let cols = [
        cross(rows[1], rows[2]),
        cross(rows[2], rows[0]),
        cross(rows[0], rows[1]),
    ];

    let det: f64 = rows[0].iter().zip(cols[0]).map(|(a, b)| a * b).sum();
    if det == 0.0 || !det.is_finite() {
        return Err(ImageError::CannotComputeDeterminant);
    }

    let mut inv = [0.0; 9];
    for (i, value) in inv.iter_mut().enumerate() {
        *value = cols[i % 3][i / 3] / det;
    }
    Ok(inv)
}

fn transform_point(x: f64, y: f64, m: &[f64; 9]) -> (f64, f64) {
    let w = m[6] * x + m[7] * y + m[8];
    (
        (m[0] * x + m[1] * y + m[2]) / w,
        (m[3] * x + m[4] * y + m[5]) / w,
    )
}

/// Warp `src` into `dst` through the perspective matrix `m`.
///
/// Each destination pixel is pulled back through the inverse of `m` and
/// sampled from `src`. Pixels that land outside `src` keep their current
/// value, so `dst` acts as a canvas of any size.
///
/// * `src` - The image to warp.
/// * `dst` - The canvas, written in place.
/// * `m` - Row-major 3x3 matrix mapping `src` pixels to `dst` pixels.
/// * `interpolation` - How `src` is sampled.
///
/// # Example
///
/// ```
/// use arcv_image::Image;
/// use arcv_imgproc::interpolation::InterpolationMode;
/// use arcv_imgproc::warp::warp_perspective;
///
/// let src = Image::<u8, 1>::from_size_val([2, 2].into(), 9)?;
/// let mut canvas = Image::<u8, 1>::from_size_val([4, 4].into(), 0)?;
///
/// // move the source to (2, 2)
/// let m = [1.0, 0.0, 2.0, 0.0, 1.0, 2.0, 0.0, 0.0, 1.0];
/// warp_perspective(&src, &mut canvas, &m, InterpolationMode::Nearest)?;
///
/// assert_eq!(canvas.get_pixel(3, 3, 0)?, 9);
/// assert_eq!(canvas.get_pixel(1, 1, 0)?, 0);
/// # Ok::<(), arcv_image::ImageError>(())
/// ```
pub fn warp_perspective<T: ImageDtype, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    m: &[f64; 9],
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    let inv = inverse_perspective_matrix(m)?;
    let (width, height) = (src.cols() as f64, src.rows() as f64);

    parallel::par_iter_rows_indexed(dst, |x, y, pixel| {
        let (u, v) = transform_point(x as f64, y as f64, &inv);
        if !(0.0..width).contains(&u) || !(0.0..height).contains(&v) {
            return;
        }
        let sample = interpolate_pixel(src, u as f32, v as f32, interpolation);
        for (out, value) in pixel.iter_mut().zip(sample) {
            *out = T::from_f32(value);
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_perspective_matrix() -> Result<(), ImageError> {
        let m = [1.0, 0.0, -1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0];
        assert_eq!(
            inverse_perspective_matrix(&m)?,
            [1.0, 0.0, 1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0]
        );

        // a general homography times its inverse is the identity
        let h = [1.2, 0.1, 5.0, -0.05, 0.9, 3.0, 0.001, 0.002, 1.0];
        let inv = inverse_perspective_matrix(&h)?;
        for r in 0..3 {
            for c in 0..3 {
                let v: f64 = (0..3).map(|k| h[r * 3 + k] * inv[k * 3 + c]).sum();
                assert_relative_eq!(v, if r == c { 1.0 } else { 0.0 }, epsilon = 1e-12);
            }
        }

        let singular = [1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0];
        assert_eq!(
            inverse_perspective_matrix(&singular),
            Err(ImageError::CannotComputeDeterminant)
        );
        Ok(())
    }

    #[test]
    fn test_transform_point_divides() {
        let m = [2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0];
        assert_eq!(transform_point(3.0, 4.0, &m), (3.0, 4.0));
    }

    #[test]
    fn test_warp_identity_all_modes() -> Result<(), ImageError> {
        let data: Vec<u8> = (0..4 * 5 * 3).map(|i| i as u8).collect();
        let image = Image::<u8, 3>::new([4, 5].into(), data)?;
        let m = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

        for mode in [
            InterpolationMode::Nearest,
            InterpolationMode::Bilinear,
            InterpolationMode::Bicubic,
        ] {
            let mut out = Image::from_size_val(image.size(), 0u8)?;
            warp_perspective(&image, &mut out, &m, mode)?;
            assert_eq!(out.as_slice(), image.as_slice(), "{mode:?}");
        }
        Ok(())
    }

    #[test]
    fn test_warp_mirror_and_shift() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new([2, 3].into(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])?;
        let mut mirrored = Image::<f32, 1>::from_size_val(image.size(), 0.0)?;
        let flip = [-1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        warp_perspective(&image, &mut mirrored, &flip, InterpolationMode::Bilinear)?;
        assert_eq!(mirrored.as_slice(), &[1.0, 0.0, 3.0, 2.0, 5.0, 4.0]);

        // one pixel to the left, the vacated column keeps the canvas value
        let mut shifted = Image::<f32, 1>::from_size_val(image.size(), -1.0)?;
        let left = [1.0, 0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        warp_perspective(&image, &mut shifted, &left, InterpolationMode::Bicubic)?;
        assert_eq!(shifted.as_slice(), &[1.0, -1.0, 3.0, -1.0, 5.0, -1.0]);
        Ok(())
    }

    #[test]
    fn test_warp_into_larger_canvas() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([2, 2].into(), 200)?;
        let mut canvas = Image::<u8, 1>::from_size_val([6, 6].into(), 0)?;

        // scale by two then move to (1, 1)
        let m = [2.0, 0.0, 1.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0];
        warp_perspective(&image, &mut canvas, &m, InterpolationMode::Bicubic)?;

        assert_eq!(canvas.get_pixel(0, 0, 0)?, 0);
        assert_eq!(canvas.get_pixel(2, 2, 0)?, 200);
        assert_eq!(canvas.get_pixel(4, 4, 0)?, 200);
        assert_eq!(canvas.get_pixel(5, 5, 0)?, 0);
        Ok(())
    }
}
