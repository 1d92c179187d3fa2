use arcv_image::{Image, ImageError};

use crate::{normalize::normalize_min_max, parallel};

/// Parameters of the Harris corner response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarrisParams {
    /// Side of the window over which the structure tensor is summed.
    pub block_size: usize,
    /// Harris free parameter in `det - k * trace^2`.
    pub k: f32,
}

impl Default for HarrisParams {
    fn default() -> Self {
        Self {
            block_size: 2,
            k: 0.04,
        }
    }
}

/// Default threshold on the 0-255 normalized response used by [`harris_corners`].
pub const DEFAULT_HARRIS_THRESHOLD: f32 = 202.0;

// mirror an index into [0, len) without repeating the border pixel
fn reflect101(idx: isize, len: usize) -> usize {
    let n = len as isize;
    if n == 1 {
        return 0;
    }
    let mut i = idx;
    while i < 0 || i >= n {
        i = if i < 0 { -i } else { 2 * n - i - 2 };
    }
    i as usize
}

/// Compute the Harris corner response of a grayscale image.
///
/// Gradients come from 3x3 Sobel filters. Their products are summed over a
/// `block_size` window anchored at `block_size / 2` and the response is
/// `det(M) - k * trace(M)^2`. Borders are mirrored without repeating the edge
/// pixel.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W).
/// * `dst` - The destination image with shape (H, W).
/// * `params` - The block size and the Harris `k`.
pub fn harris_response(
    src: &Image<f32, 1>,
    dst: &mut Image<f32, 1>,
    params: &HarrisParams,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (cols, rows) = (src.cols(), src.rows());
    let data = src.as_slice();
    let at = |x: isize, y: isize| data[reflect101(y, rows) * cols + reflect101(x, cols)];

    // per pixel (Ix^2, Iy^2, Ix*Iy)
    let mut products = Image::<f32, 3>::from_size_val(src.size(), 0.0)?;
    parallel::par_iter_rows_indexed(&mut products, |x, y, pixel| {
        let (x, y) = (x as isize, y as isize);
        let dx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
            - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
        let dy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
            - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
        pixel[0] = dx * dx;
        pixel[1] = dy * dy;
        pixel[2] = dx * dy;
    });

    let block = params.block_size.max(1) as isize;
    let anchor = block / 2;
    let k = params.k;
    let prod = products.as_slice();

    parallel::par_iter_rows_indexed(dst, |x, y, pixel| {
        let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
        for j in -anchor..block - anchor {
            let yy = reflect101(y as isize + j, rows);
            for i in -anchor..block - anchor {
                let xx = reflect101(x as isize + i, cols);
                let base = (yy * cols + xx) * 3;
                sxx += prod[base];
                syy += prod[base + 1];
                sxy += prod[base + 2];
            }
        }
        let det = sxx * syy - sxy * sxy;
        let trace = sxx + syy;
        pixel[0] = det - k * trace * trace;
    });

    Ok(())
}

/// Detect Harris corners.
///
/// The response is rescaled to `[0, 255]` and every pixel strictly above
/// `threshold` is returned as `[x, y]`, in row-major order.
pub fn harris_corners(
    src: &Image<f32, 1>,
    params: &HarrisParams,
    threshold: f32,
) -> Result<Vec<[usize; 2]>, ImageError> {
    let mut response = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    harris_response(src, &mut response, params)?;

    let mut normalized = Image::<f32, 1>::from_size_val(src.size(), 0.0)?;
    normalize_min_max(&response, &mut normalized, 0.0, 255.0)?;

    let cols = src.cols();
    Ok(normalized
        .as_slice()
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > threshold)
        .map(|(i, _)| [i % cols, i / cols])
        .collect())
}
